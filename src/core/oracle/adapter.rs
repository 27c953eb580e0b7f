use super::decode::decode_verdicts;
use super::error::OracleError;
use super::policy::ClassificationPolicy;
use super::transport::{EncodedImage, OracleRequest, VisionTransport};
use super::verdict::Verdict;
use log::{debug, info, warn};
use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Anything that can turn a batch of image paths into verdicts.
///
/// Implementations never fail a batch as a whole: every input image gets a
/// verdict, in input order.
pub trait FrameClassifier {
    fn batch_size(&self) -> usize;
    fn classify_batch(&mut self, images: &[PathBuf]) -> Vec<Verdict>;
}

/// Round-robin over the configured models, one step per logical call.
#[derive(Debug, Clone)]
pub struct ModelRotation {
    models: Vec<String>,
    cursor: usize,
}

impl ModelRotation {
    pub fn new(models: Vec<String>) -> Result<Self, OracleError> {
        if models.is_empty() {
            return Err(OracleError::NoModels);
        }
        Ok(Self { models, cursor: 0 })
    }

    /// Model for the current call; moves the cursor on.
    pub fn advance(&mut self) -> &str {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.models.len();
        &self.models[index]
    }

    pub fn peek(&self) -> &str {
        &self.models[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleStats {
    pub requests: usize,
    pub failed_requests: usize,
    /// Model the next call will use.
    pub current_model: String,
}

/// 视觉分类适配器 - batches images into one request per call and decodes
/// the answer positionally.
pub struct OracleAdapter<T: VisionTransport> {
    transport: T,
    rotation: ModelRotation,
    policy: ClassificationPolicy,
    batch_size: usize,
    requests: usize,
    failed_requests: usize,
}

impl<T: VisionTransport> OracleAdapter<T> {
    pub fn new(
        transport: T,
        models: Vec<String>,
        policy: ClassificationPolicy,
    ) -> Result<Self, OracleError> {
        Ok(Self {
            transport,
            rotation: ModelRotation::new(models)?,
            policy,
            batch_size: DEFAULT_BATCH_SIZE,
            requests: 0,
            failed_requests: 0,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    pub fn rotation(&self) -> &ModelRotation {
        &self.rotation
    }

    pub fn stats(&self) -> OracleStats {
        OracleStats {
            requests: self.requests,
            failed_requests: self.failed_requests,
            current_model: self.rotation.peek().to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn encode_all(images: &[PathBuf]) -> Result<Vec<EncodedImage>, OracleError> {
        images.iter().map(|p| EncodedImage::from_path(p)).collect()
    }

    fn fail_all(images: &[PathBuf], model: &str, reason: &str) -> Vec<Verdict> {
        images
            .iter()
            .map(|img| Verdict::unclassifiable(img, reason).with_model(model))
            .collect()
    }
}

impl<T: VisionTransport> FrameClassifier for OracleAdapter<T> {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn classify_batch(&mut self, images: &[PathBuf]) -> Vec<Verdict> {
        if images.is_empty() {
            return Vec::new();
        }
        let images = if images.len() > self.batch_size {
            debug!(
                "Batch of {} exceeds size {}, truncating",
                images.len(),
                self.batch_size
            );
            &images[..self.batch_size]
        } else {
            images
        };

        let model = self.rotation.advance().to_string();
        self.requests += 1;

        let encoded = match Self::encode_all(images) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("⚠️ {}", e);
                self.failed_requests += 1;
                return Self::fail_all(images, &model, &e.to_string());
            }
        };

        let prompt = self.policy.batch_prompt(images.len());
        let request = OracleRequest {
            model: &model,
            prompt: &prompt,
            images: &encoded,
        };

        match self.transport.complete(&request) {
            Ok(raw) => {
                let verdicts = decode_verdicts(&raw, images, self.policy, &model);
                let unknown = verdicts.iter().filter(|v| v.is_unclassifiable()).count();
                if unknown > 0 {
                    warn!("⚠️ {}: {} of {} images unclassifiable", model, unknown, images.len());
                } else {
                    info!("🤖 {}: classified {} images", model, images.len());
                }
                verdicts
            }
            Err(e) => {
                warn!("⚠️ {} request failed: {}", model, e);
                self.failed_requests += 1;
                Self::fail_all(images, &model, &e.to_string())
            }
        }
    }
}

impl<C: FrameClassifier + ?Sized> FrameClassifier for Box<C> {
    fn batch_size(&self) -> usize {
        (**self).batch_size()
    }

    fn classify_batch(&mut self, images: &[PathBuf]) -> Vec<Verdict> {
        (**self).classify_batch(images)
    }
}
