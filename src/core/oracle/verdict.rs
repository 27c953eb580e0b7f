use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted,
    Rejected,
    /// The oracle could not be asked or its answer could not be read.
    Unclassifiable(String),
}

/// How `Unclassifiable` collapses when a decision has to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPolicy {
    /// Keep the frame. Losing data on uncertainty is worse than keeping noise.
    #[default]
    Open,
    /// Quarantine the frame.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub image: PathBuf,
    pub outcome: Outcome,
    pub confidence: Option<f32>,
    pub model: Option<String>,
}

impl Verdict {
    pub fn accepted(image: impl Into<PathBuf>) -> Self {
        Self::with_outcome(image, Outcome::Accepted)
    }

    pub fn rejected(image: impl Into<PathBuf>) -> Self {
        Self::with_outcome(image, Outcome::Rejected)
    }

    /// Fail-open default: unclassifiable, confidence 0.0, reason kept.
    pub fn unclassifiable(image: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            outcome: Outcome::Unclassifiable(reason.into()),
            confidence: Some(0.0),
            model: None,
        }
    }

    fn with_outcome(image: impl Into<PathBuf>, outcome: Outcome) -> Self {
        Self {
            image: image.into(),
            outcome,
            confidence: None,
            model: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn accepts(&self, policy: FailPolicy) -> bool {
        match &self.outcome {
            Outcome::Accepted => true,
            Outcome::Rejected => false,
            Outcome::Unclassifiable(_) => policy == FailPolicy::Open,
        }
    }

    pub fn is_unclassifiable(&self) -> bool {
        matches!(self.outcome, Outcome::Unclassifiable(_))
    }

    pub fn error_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Unclassifiable(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_policy_collapse() {
        let unknown = Verdict::unclassifiable("a.jpg", "timeout");
        assert!(unknown.accepts(FailPolicy::Open));
        assert!(!unknown.accepts(FailPolicy::Closed));
        assert_eq!(unknown.confidence, Some(0.0));
        assert_eq!(unknown.error_reason(), Some("timeout"));

        assert!(Verdict::accepted("a.jpg").accepts(FailPolicy::Closed));
        assert!(!Verdict::rejected("a.jpg").accepts(FailPolicy::Open));
        assert_eq!(Verdict::rejected("a.jpg").error_reason(), None);
    }
}
