//! Response decoding. Entries are matched to images by position only.

use super::policy::ClassificationPolicy;
use super::verdict::Verdict;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One verdict per image, in input order. Short responses are padded with
/// `Unclassifiable`; an unreadable response makes every image unclassifiable.
pub fn decode_verdicts(
    raw: &str,
    images: &[PathBuf],
    policy: ClassificationPolicy,
    model: &str,
) -> Vec<Verdict> {
    let entries = match parse_entries(raw, images.len(), policy) {
        Ok(entries) => entries,
        Err(reason) => {
            return images
                .iter()
                .map(|img| Verdict::unclassifiable(img, reason.clone()).with_model(model))
                .collect();
        }
    };

    let field = policy.acceptability_field();
    images
        .iter()
        .enumerate()
        .map(|(i, img)| match entries.get(i) {
            Some(entry) => decode_entry(entry, img, field).with_model(model),
            None => Verdict::unclassifiable(img, "missing in response").with_model(model),
        })
        .collect()
}

fn parse_entries(
    raw: &str,
    expected: usize,
    policy: ClassificationPolicy,
) -> Result<Vec<Value>, String> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("JSON parse error: {}", e))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("images") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err("\"images\" is not an array".to_string()),
            None if expected == 1 && map.contains_key(policy.acceptability_field()) => {
                Ok(vec![Value::Object(map)])
            }
            None => Err("response has no \"images\" array".to_string()),
        },
        _ => Err("response is not a JSON object".to_string()),
    }
}

fn decode_entry(entry: &Value, image: &Path, field: &str) -> Verdict {
    let confidence = entry
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0) as f32);

    let mut verdict = match entry.get(field).and_then(Value::as_bool) {
        Some(true) => Verdict::accepted(image),
        Some(false) => Verdict::rejected(image),
        None => Verdict::unclassifiable(image, format!("missing {}", field)),
    };

    if !verdict.is_unclassifiable() {
        verdict.confidence = confidence;
    }
    verdict
}

/// Models sometimes wrap JSON in a ```json fence despite being told not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::Outcome;

    fn images(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("frame_{:05}.jpg", i))).collect()
    }

    const HUMAN: ClassificationPolicy = ClassificationPolicy::HumanPresence;
    const SUITABLE: ClassificationPolicy = ClassificationPolicy::DatasetSuitability;

    #[test]
    fn test_positional_decode() {
        let raw = r#"{"images":[{"index":0,"has_human":true,"confidence":0.9},{"index":1,"has_human":false,"confidence":0.8}]}"#;
        let verdicts = decode_verdicts(raw, &images(2), HUMAN, "scout");

        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].outcome, Outcome::Accepted);
        assert_eq!(verdicts[0].confidence, Some(0.9));
        assert_eq!(verdicts[1].outcome, Outcome::Rejected);
        assert_eq!(verdicts[1].image, PathBuf::from("frame_00001.jpg"));
        assert_eq!(verdicts[1].model.as_deref(), Some("scout"));
    }

    #[test]
    fn test_short_response_pads_tail() {
        let raw = r#"{"images":[{"is_suitable":false}]}"#;
        let verdicts = decode_verdicts(raw, &images(3), SUITABLE, "m");

        assert_eq!(verdicts[0].outcome, Outcome::Rejected);
        for v in &verdicts[1..] {
            assert_eq!(v.error_reason(), Some("missing in response"));
            assert_eq!(v.confidence, Some(0.0));
        }
    }

    #[test]
    fn test_long_response_is_truncated_to_input() {
        let raw = r#"[{"is_suitable":true},{"is_suitable":false},{"is_suitable":false}]"#;
        let verdicts = decode_verdicts(raw, &images(2), SUITABLE, "m");
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[1].outcome, Outcome::Rejected);
    }

    #[test]
    fn test_unparsable_response_fails_every_image() {
        let verdicts = decode_verdicts("I think there is a person", &images(4), HUMAN, "m");
        assert_eq!(verdicts.len(), 4);
        assert!(verdicts
            .iter()
            .all(|v| v.error_reason().unwrap().starts_with("JSON parse error")));
    }

    #[test]
    fn test_object_without_images_array() {
        let verdicts = decode_verdicts(r#"{"result":"ok"}"#, &images(2), HUMAN, "m");
        assert!(verdicts.iter().all(Verdict::is_unclassifiable));
    }

    #[test]
    fn test_single_object_for_single_image() {
        let verdicts = decode_verdicts(r#"{"is_suitable": false}"#, &images(1), SUITABLE, "m");
        assert_eq!(verdicts[0].outcome, Outcome::Rejected);
    }

    #[test]
    fn test_missing_or_wrong_type_field() {
        let raw = r#"{"images":[{"has_human":"yes"},{"confidence":0.5}]}"#;
        let verdicts = decode_verdicts(raw, &images(2), HUMAN, "m");
        assert_eq!(verdicts[0].error_reason(), Some("missing has_human"));
        assert_eq!(verdicts[1].confidence, Some(0.0));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let raw = r#"{"images":[{"has_human":true,"confidence":1.7},{"has_human":true,"confidence":"high"}]}"#;
        let verdicts = decode_verdicts(raw, &images(2), HUMAN, "m");
        assert_eq!(verdicts[0].confidence, Some(1.0));
        assert_eq!(verdicts[1].confidence, None);
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let raw = "```json\n{\"images\":[{\"is_suitable\":true}]}\n```";
        let verdicts = decode_verdicts(raw, &images(1), SUITABLE, "m");
        assert_eq!(verdicts[0].outcome, Outcome::Accepted);
        assert_eq!(strip_code_fence("  {} "), "{}");
    }
}
