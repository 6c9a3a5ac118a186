//! Normalized tag labels.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A tag applied to a table element.
///
/// Labels are normalized on construction: trimmed, lower-cased, with
/// internal runs of whitespace collapsed to a single space. Two tags are
/// equal exactly when their normalized labels are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    label: String,
}

impl Tag {
    /// Build a tag from a raw label. Labels that normalize to the empty
    /// string yield no tag.
    pub fn new(label: &str) -> Option<Tag> {
        Tag::normalize_label(label).map(|label| Tag { label })
    }

    /// Normalize a raw label without constructing a tag.
    pub fn normalize_label(label: &str) -> Option<String> {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Build the set of tags for a batch of raw labels, dropping blanks.
    pub fn as_tags<'a>(labels: impl IntoIterator<Item = &'a str>) -> HashSet<Tag> {
        labels.into_iter().filter_map(Tag::new).collect()
    }

    /// Sorted labels of a tag set.
    pub fn as_labels(tags: &HashSet<Tag>) -> Vec<String> {
        let mut labels: Vec<String> = tags.iter().map(|t| t.label.clone()).collect();
        labels.sort();
        labels
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag: '{}'", self.label)
    }
}
