use super::error::OracleError;
use std::fmt;
use std::str::FromStr;

/// The question asked of every image. Both variants share one batching and
/// decoding path; only the prompt and the acceptability field differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationPolicy {
    /// Keep frames with at least one person in them.
    HumanPresence,
    /// Keep frames usable for training a PPE detector: person and PPE
    /// visible, sharp, well exposed, large enough to annotate.
    #[default]
    DatasetSuitability,
}

impl ClassificationPolicy {
    pub fn acceptability_field(&self) -> &'static str {
        match self {
            ClassificationPolicy::HumanPresence => "has_human",
            ClassificationPolicy::DatasetSuitability => "is_suitable",
        }
    }

    pub fn requests_confidence(&self) -> bool {
        matches!(self, ClassificationPolicy::HumanPresence)
    }

    /// Folder rejected frames land in unless configured otherwise.
    pub fn default_quarantine(&self) -> &'static str {
        match self {
            ClassificationPolicy::HumanPresence => "no-human",
            ClassificationPolicy::DatasetSuitability => "not-suitable",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationPolicy::HumanPresence => "human-presence",
            ClassificationPolicy::DatasetSuitability => "dataset-suitability",
        }
    }

    /// Prompt for a batch of `count` images sent in order.
    pub fn batch_prompt(&self, count: usize) -> String {
        let field = self.acceptability_field();
        match self {
            ClassificationPolicy::HumanPresence => format!(
                "Analyze these {count} images. For EACH image, determine if it contains any human beings.\n\
                 \n\
                 Respond with a JSON object containing an \"images\" array with exactly one entry per image, in the order the images were given:\n\
                 {{\"images\": [{{\"index\": 0, \"{field}\": true, \"confidence\": 0.95}}, {{\"index\": 1, \"{field}\": false, \"confidence\": 0.90}}]}}\n\
                 \n\
                 Rules:\n\
                 - {field}: true if any human, person, or body part is visible\n\
                 - confidence: your confidence from 0.0 to 1.0\n\
                 - keep the exact order of the images"
            ),
            ClassificationPolicy::DatasetSuitability => format!(
                "Analyze these {count} images to determine if each is SUITABLE for training a PPE (personal protective equipment) object detection model.\n\
                 \n\
                 An image is SUITABLE only if ALL of these hold:\n\
                 1. At least one person is clearly visible\n\
                 2. At least one PPE item is visible (helmet, safety vest, gloves, safety glasses, safety shoes, face shield, mask, harness)\n\
                 3. The image is not blurry or motion-blurred\n\
                 4. Exposure is good (not too dark, not overexposed)\n\
                 5. The person and PPE are large enough to annotate\n\
                 \n\
                 Respond with a JSON object containing an \"images\" array with exactly one entry per image, in the order the images were given:\n\
                 {{\"images\": [{{\"index\": 0, \"{field}\": true}}, {{\"index\": 1, \"{field}\": false}}]}}"
            ),
        }
    }
}

impl fmt::Display for ClassificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationPolicy {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "human-presence" | "human" | "no-human" => Ok(ClassificationPolicy::HumanPresence),
            "dataset-suitability" | "suitability" | "ppe" => {
                Ok(ClassificationPolicy::DatasetSuitability)
            }
            _ => Err(OracleError::UnknownPolicy(s.to_string())),
        }
    }
}
