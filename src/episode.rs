//! Appearance episodes: rising-edge filter over per-frame label sets.
//!
//! An episode is a maximal run of consecutive frames in which a label of
//! interest is present. Only its first frame produces an event.

use std::collections::BTreeSet;

/// Labels of interest present in `current` and absent from `prior`.
pub fn reduce(
    current: &BTreeSet<String>,
    prior: &BTreeSet<String>,
    labels_of_interest: &BTreeSet<String>,
) -> BTreeSet<String> {
    labels_of_interest
        .iter()
        .filter(|label| current.contains(*label) && !prior.contains(*label))
        .cloned()
        .collect()
}

/// Holds the previous frame's label set.
#[derive(Clone, Debug)]
pub struct EpisodeDetector {
    labels_of_interest: BTreeSet<String>,
    last_labels: BTreeSet<String>,
}

impl EpisodeDetector {
    pub fn new(labels_of_interest: BTreeSet<String>) -> Self {
        Self {
            labels_of_interest,
            last_labels: BTreeSet::new(),
        }
    }

    /// Feed one frame's filtered label set; returns the labels that just
    /// started an episode. `current` always replaces the stored set.
    pub fn observe(&mut self, current: BTreeSet<String>) -> BTreeSet<String> {
        let started = reduce(&current, &self.last_labels, &self.labels_of_interest);
        self.last_labels = current;
        started
    }

    /// Forget every open episode.
    pub fn reset(&mut self) {
        self.last_labels.clear();
    }

    pub fn last_labels(&self) -> &BTreeSet<String> {
        &self.last_labels
    }
}
