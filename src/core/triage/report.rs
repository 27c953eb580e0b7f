use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFailure {
    pub file: String,
    pub reason: String,
}

/// Outcome of one triage run. `accepted + rejected + errors == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriageReport {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub errors: usize,
    /// File names actually moved to quarantine.
    pub moved: Vec<String>,
    /// File names that would have moved (dry run).
    pub planned: Vec<String>,
    /// Verdicts the classifier could not decide. Already counted in
    /// `accepted` (fail-open) or `rejected` (fail-closed).
    pub unclassifiable: usize,
    pub batches: usize,
    pub failures: Vec<FrameFailure>,
}

impl TriageReport {
    pub fn is_consistent(&self) -> bool {
        self.accepted + self.rejected + self.errors == self.total
    }

    pub(crate) fn record_failure(&mut self, file: String, reason: impl Into<String>) {
        self.errors += 1;
        self.failures.push(FrameFailure {
            file,
            reason: reason.into(),
        });
    }

    /// Share of frames kept, in percent.
    pub fn keep_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.accepted as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for TriageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {}, accepted {} ({:.1}%), rejected {}, errors {}",
            self.total,
            self.accepted,
            self.keep_rate(),
            self.rejected,
            self.errors
        )?;
        if self.unclassifiable > 0 {
            write!(f, ", unclassifiable {}", self.unclassifiable)?;
        }
        Ok(())
    }
}
