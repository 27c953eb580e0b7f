use super::error::TriageError;
use super::layout::{is_image_file, move_into, TriageLayout};
use super::report::TriageReport;
use crate::core::oracle::{FailPolicy, FrameClassifier, Verdict};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct TriageOptions {
    pub layout: TriageLayout,
    /// Record intended moves without touching the filesystem.
    pub dry_run: bool,
    pub fail_policy: FailPolicy,
}

pub struct TriageEngine {
    options: TriageOptions,
}

impl TriageEngine {
    pub fn new(layout: TriageLayout) -> Self {
        Self::with_options(TriageOptions {
            layout,
            ..Default::default()
        })
    }

    pub fn with_options(options: TriageOptions) -> Self {
        Self { options }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    pub fn options(&self) -> &TriageOptions {
        &self.options
    }

    pub fn layout(&self) -> &TriageLayout {
        &self.options.layout
    }

    /// Classify every frame directly inside `frame_dir` and move rejects
    /// into the quarantine folder.
    ///
    /// Frames already in the quarantine (or any reserved folder) are not
    /// listed, so running this twice never touches them again. Per-frame
    /// failures are counted in the report; only an unreadable `frame_dir`
    /// is an `Err`.
    pub fn triage(
        &self,
        frame_dir: &Path,
        classifier: &mut dyn FrameClassifier,
    ) -> Result<TriageReport, TriageError> {
        let frames = self.options.layout.list_frames(frame_dir)?;
        let mut report = TriageReport {
            total: frames.len(),
            ..Default::default()
        };

        if frames.is_empty() {
            info!("No frames to triage in {}", frame_dir.display());
            return Ok(report);
        }

        let batch_size = classifier.batch_size().max(1);
        let batch_count = frames.len().div_ceil(batch_size);
        info!(
            "🔍 Triage {} frames in {} ({} batches of {}){}",
            frames.len(),
            frame_dir.display(),
            batch_count,
            batch_size,
            if self.options.dry_run { " [dry run]" } else { "" }
        );
        let started = Instant::now();
        let quarantine_dir = self.options.layout.quarantine_dir(frame_dir);

        for (i, batch) in frames.chunks(batch_size).enumerate() {
            debug!("Batch {}/{}", i + 1, batch_count);
            let verdicts = classifier.classify_batch(batch);
            report.batches += 1;

            for (pos, frame) in batch.iter().enumerate() {
                let name = file_name(frame);
                let Some(verdict) = find_verdict(&verdicts, pos, frame) else {
                    warn!("⚠️ No verdict for {}", name);
                    report.record_failure(name, "no verdict");
                    continue;
                };

                if verdict.is_unclassifiable() {
                    report.unclassifiable += 1;
                }
                if verdict.accepts(self.options.fail_policy) {
                    debug!("  ✓ {} kept", name);
                    report.accepted += 1;
                    continue;
                }

                if self.options.dry_run {
                    debug!("  ✗ {} would move", name);
                    report.rejected += 1;
                    report.planned.push(name);
                    continue;
                }

                match self.quarantine(frame, &quarantine_dir) {
                    Ok(_) => {
                        debug!("  ✗ {} quarantined", name);
                        report.rejected += 1;
                        report.moved.push(name);
                    }
                    Err(e) => {
                        error!("❌ Failed to move {}: {}", name, e);
                        report.record_failure(name, e.to_string());
                    }
                }
            }
        }

        info!(
            "✅ Triage done in {:.1?}: {}",
            started.elapsed(),
            report
        );
        Ok(report)
    }

    /// Move every image in the quarantine folder back. A missing folder
    /// restores nothing.
    pub fn restore(&self, frame_dir: &Path) -> Result<usize, TriageError> {
        restore_from(frame_dir, self.options.layout.quarantine())
    }

    /// Restore from the quarantine and every reserved folder.
    pub fn restore_all(&self, frame_dir: &Path) -> Result<usize, TriageError> {
        let layout = &self.options.layout;
        let mut restored = restore_from(frame_dir, layout.quarantine())?;
        for name in layout.reserved() {
            restored += restore_from(frame_dir, name)?;
        }
        Ok(restored)
    }

    fn quarantine(&self, frame: &Path, quarantine_dir: &Path) -> Result<PathBuf, TriageError> {
        if !quarantine_dir.is_dir() {
            fs::create_dir_all(quarantine_dir)?;
        }
        move_into(frame, quarantine_dir)
    }
}

/// Verdicts come back in input order; fall back to a lookup by path if the
/// positions do not line up.
fn find_verdict<'v>(verdicts: &'v [Verdict], pos: usize, frame: &Path) -> Option<&'v Verdict> {
    match verdicts.get(pos) {
        Some(v) if v.image == frame => Some(v),
        _ => verdicts.iter().find(|v| v.image == frame),
    }
}

fn restore_from(frame_dir: &Path, folder: &str) -> Result<usize, TriageError> {
    let source = frame_dir.join(folder);
    if !source.is_dir() {
        info!("No '{}' folder in {}", folder, frame_dir.display());
        return Ok(0);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&source)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    files.sort();

    let mut restored = 0;
    for file in &files {
        match move_into(file, frame_dir) {
            Ok(_) => restored += 1,
            Err(e) => warn!("⚠️ Cannot restore {}: {}", file.display(), e),
        }
    }
    info!("♻️ Restored {} of {} files from '{}'", restored, files.len(), folder);
    Ok(restored)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::{OracleAdapter, ScriptedTransport};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    /// Rejects every frame whose index is in `rejects`.
    struct ByIndex {
        rejects: Vec<usize>,
        calls: Vec<usize>,
    }

    impl ByIndex {
        fn rejecting(rejects: &[usize]) -> Self {
            Self {
                rejects: rejects.to_vec(),
                calls: Vec::new(),
            }
        }
    }

    impl FrameClassifier for ByIndex {
        fn batch_size(&self) -> usize {
            5
        }

        fn classify_batch(&mut self, images: &[PathBuf]) -> Vec<Verdict> {
            self.calls.push(images.len());
            images
                .iter()
                .map(|img| {
                    let index: usize = img
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(|s| s.rsplit('_').next())
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(usize::MAX);
                    if self.rejects.contains(&index) {
                        Verdict::rejected(img)
                    } else {
                        Verdict::accepted(img)
                    }
                })
                .collect()
        }
    }

    fn make_frames(dir: &Path, n: usize) {
        for i in 0..n {
            fs::write(dir.join(format!("frame_{:05}.jpg", i)), b"jpeg").unwrap();
        }
    }

    fn names_in(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn engine() -> TriageEngine {
        TriageEngine::new(TriageLayout::new("not-suitable").unwrap())
    }

    #[test]
    fn test_triage_partitions_and_counts() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 12);
        let mut classifier = ByIndex::rejecting(&[1, 6, 11]);

        let report = engine().triage(dir.path(), &mut classifier).unwrap();

        assert_eq!(classifier.calls, vec![5, 5, 2]);
        assert_eq!(report.total, 12);
        assert_eq!(report.accepted, 9);
        assert_eq!(report.rejected, 3);
        assert_eq!(report.errors, 0);
        assert_eq!(report.batches, 3);
        assert!(report.is_consistent());
        assert_eq!(
            report.moved,
            vec!["frame_00001.jpg", "frame_00006.jpg", "frame_00011.jpg"]
        );
        assert!(dir.path().join("not-suitable/frame_00006.jpg").is_file());
        assert!(!dir.path().join("frame_00006.jpg").exists());
    }

    #[test]
    fn test_triage_is_idempotent() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 7);
        let engine = engine();

        engine
            .triage(dir.path(), &mut ByIndex::rejecting(&[0, 3]))
            .unwrap();
        let mut second = ByIndex::rejecting(&[0, 3]);
        let report = engine.triage(dir.path(), &mut second).unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.accepted, 5);
        assert_eq!(second.calls, vec![5]);
        assert_eq!(names_in(&dir.path().join("not-suitable")).len(), 2);
    }

    #[test]
    fn test_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 8);
        let before = names_in(dir.path());
        let engine = engine();

        let first = engine
            .triage(dir.path(), &mut ByIndex::rejecting(&[2, 5, 7]))
            .unwrap();
        assert_eq!(engine.restore(dir.path()).unwrap(), 3);
        assert_eq!(names_in(dir.path()), before);

        let again = engine
            .triage(dir.path(), &mut ByIndex::rejecting(&[2, 5, 7]))
            .unwrap();
        assert_eq!(again.moved, first.moved);
    }

    #[test]
    fn test_restore_without_quarantine() {
        let dir = TempDir::new().unwrap();
        assert_eq!(engine().restore(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_restore_skips_existing_root_file() {
        let dir = TempDir::new().unwrap();
        let q = dir.path().join("not-suitable");
        fs::create_dir(&q).unwrap();
        fs::write(q.join("a.jpg"), b"quarantined").unwrap();
        fs::write(q.join("b.jpg"), b"quarantined").unwrap();
        fs::write(dir.path().join("a.jpg"), b"root").unwrap();

        assert_eq!(engine().restore(dir.path()).unwrap(), 1);
        assert_eq!(fs::read(dir.path().join("a.jpg")).unwrap(), b"root");
        assert!(q.join("a.jpg").exists());
    }

    #[test]
    fn test_restore_all_includes_reserved() {
        let dir = TempDir::new().unwrap();
        for folder in ["not-suitable", "no-human"] {
            fs::create_dir(dir.path().join(folder)).unwrap();
            fs::write(dir.path().join(folder).join(format!("{}.jpg", folder)), b"x").unwrap();
        }
        let layout = TriageLayout::new("not-suitable")
            .unwrap()
            .with_reserved("no-human")
            .unwrap();
        let engine = TriageEngine::new(layout);

        assert_eq!(engine.restore_all(dir.path()).unwrap(), 2);
        assert_eq!(names_in(dir.path()).len(), 2);
    }

    #[test]
    fn test_always_failing_oracle_keeps_everything() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 7);
        let mut adapter = OracleAdapter::new(
            ScriptedTransport::always_failing("connection refused"),
            vec!["m".to_string()],
            Default::default(),
        )
        .unwrap();

        let report = engine().triage(dir.path(), &mut adapter).unwrap();
        assert_eq!(report.accepted, 7);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.unclassifiable, 7);
        assert!(!dir.path().join("not-suitable").exists());
    }

    #[test]
    fn test_fail_closed_quarantines_unclassifiable() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 3);
        let mut adapter = OracleAdapter::new(
            ScriptedTransport::always_failing("timeout"),
            vec!["m".to_string()],
            Default::default(),
        )
        .unwrap();
        let engine = TriageEngine::with_options(TriageOptions {
            layout: TriageLayout::default(),
            dry_run: false,
            fail_policy: FailPolicy::Closed,
        });

        let report = engine.triage(dir.path(), &mut adapter).unwrap();
        assert_eq!(report.rejected, 3);
        assert_eq!(report.unclassifiable, 3);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_dry_run_moves_nothing() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 4);
        let before = names_in(dir.path());

        let report = engine()
            .dry_run(true)
            .triage(dir.path(), &mut ByIndex::rejecting(&[1, 2]))
            .unwrap();

        assert_eq!(report.rejected, 2);
        assert_eq!(report.planned, vec!["frame_00001.jpg", "frame_00002.jpg"]);
        assert!(report.moved.is_empty());
        assert_eq!(names_in(dir.path()), before);
        assert!(!dir.path().join("not-suitable").exists());
    }

    #[test]
    fn test_move_failure_is_an_error_not_a_reject() {
        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 3);
        let q = dir.path().join("not-suitable");
        fs::create_dir(&q).unwrap();
        fs::write(q.join("frame_00001.jpg"), b"already here").unwrap();

        let report = engine()
            .triage(dir.path(), &mut ByIndex::rejecting(&[1, 2]))
            .unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.accepted, 1);
        assert!(report.is_consistent());
        assert_eq!(report.failures[0].file, "frame_00001.jpg");
        assert!(dir.path().join("frame_00001.jpg").exists());
    }

    #[test]
    fn test_missing_verdict_counts_as_error() {
        struct Silent;
        impl FrameClassifier for Silent {
            fn batch_size(&self) -> usize {
                2
            }
            fn classify_batch(&mut self, images: &[PathBuf]) -> Vec<Verdict> {
                vec![Verdict::accepted(&images[0])]
            }
        }

        let dir = TempDir::new().unwrap();
        make_frames(dir.path(), 3);
        let report = engine().triage(dir.path(), &mut Silent).unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.failures[0].reason, "no verdict");
    }
}
