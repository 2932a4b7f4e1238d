use std::collections::BTreeSet;

use crate::detect::result::Detection;

pub const DEFAULT_TARGET_LABEL: &str = "person";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Confidence and allow-list gate applied to raw detector output.
///
/// A detection passes when its label is on the allow-list (case-insensitive)
/// and its confidence is strictly above the threshold.
#[derive(Clone, Debug)]
pub struct LabelFilter {
    labels: BTreeSet<String>,
    threshold: f32,
}

impl LabelFilter {
    pub fn new<I, S>(labels: I, threshold: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|label| label.as_ref().trim().to_lowercase())
                .filter(|label| !label.is_empty())
                .collect(),
            threshold,
        }
    }

    /// Lower-cased labels of interest.
    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.confidence > self.threshold
            && self.labels.contains(&detection.label.to_lowercase())
    }

    /// Keep only accepted detections; labels come back lower-cased.
    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|d| self.accepts(d))
            .map(|mut d| {
                d.label = d.label.to_lowercase();
                d
            })
            .collect()
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self::new([DEFAULT_TARGET_LABEL], DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BBox;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BBox::new(0, 0, 1, 1))
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let filter = LabelFilter::default();
        assert!(filter.accepts(&det("Person", 0.9)));
        assert!(filter.accepts(&det("PERSON", 0.51)));
        assert!(!filter.accepts(&det("car", 0.99)));
    }

    #[test]
    fn threshold_is_exclusive() {
        let filter = LabelFilter::default();
        assert!(!filter.accepts(&det("person", 0.5)));
        assert!(!filter.accepts(&det("person", 0.2)));
    }

    #[test]
    fn apply_lowercases_accepted_labels() {
        let filter = LabelFilter::new(["Person", " Dog "], 0.3);
        let kept = filter.apply(vec![det("PERSON", 0.4), det("dog", 0.2), det("Dog", 0.8)]);
        let labels: Vec<_> = kept.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["person", "dog"]);
        assert!(filter.labels().contains("dog"));
    }
}
