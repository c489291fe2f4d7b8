use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A contiguous range of speech order under review for one set of agenda items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based, sequential in start order
    pub deliberation_order: u32,
    /// Order of the trigger speech; first order of the segment
    pub start_order: u32,
    /// Last order of the segment (inclusive)
    pub end_order: u32,
    /// Sorted, deduplicated agenda item indices
    pub agenda_items: Vec<u32>,
    /// Agenda lines for the items found in the bill pool
    pub bill_review: Vec<String>,
    pub agenda_range_label: String,
    pub trigger_speech_id: Option<String>,
    pub trigger_speaker_name: Option<String>,
}

impl Segment {
    pub fn contains(&self, order: u32) -> bool {
        self.start_order <= order && order <= self.end_order
    }

    /// Number of speech orders covered
    pub fn order_count(&self) -> u32 {
        self.end_order - self.start_order + 1
    }
}

/// Canonical digest of one run's segments, used only for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Digest the deliberation order → (agenda items, range label) mapping
    pub fn of_segments(segments: &[Segment]) -> Self {
        let canonical: BTreeMap<u32, SignatureEntry<'_>> = segments
            .iter()
            .map(|s| {
                (
                    s.deliberation_order,
                    SignatureEntry {
                        agenda_items: &s.agenda_items,
                        agenda_range_label: &s.agenda_range_label,
                    },
                )
            })
            .collect();

        let bytes = serde_json::to_vec(&canonical)
            .unwrap_or_else(|_| format!("{:?}", canonical).into_bytes());
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs and summaries
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(10)]
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

#[derive(Debug, Serialize)]
struct SignatureEntry<'a> {
    agenda_items: &'a [u32],
    agenda_range_label: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(order: u32, start: u32, end: u32, items: Vec<u32>, label: &str) -> Segment {
        Segment {
            deliberation_order: order,
            start_order: start,
            end_order: end,
            agenda_items: items,
            bill_review: vec![],
            agenda_range_label: label.to_string(),
            trigger_speech_id: None,
            trigger_speaker_name: None,
        }
    }

    #[test]
    fn test_signature_ignores_boundaries_and_bill_review() {
        let a = vec![segment(1, 5, 20, vec![1, 2], "items 1 through 2")];
        let mut b = a.clone();
        b[0].start_order = 7;
        b[0].bill_review = vec!["1. something".to_string()];

        assert_eq!(Signature::of_segments(&a), Signature::of_segments(&b));
    }

    #[test]
    fn test_signature_distinguishes_items() {
        let a = vec![segment(1, 5, 20, vec![1, 2], "items 1 through 2")];
        let b = vec![segment(1, 5, 20, vec![1, 3], "item 1, item 3")];
        assert_ne!(Signature::of_segments(&a), Signature::of_segments(&b));
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = Signature::of_segments(&[segment(1, 1, 1, vec![4], "item 4")]);
        assert_eq!(sig.as_str().len(), 64);
        assert_eq!(sig.short().len(), 10);
        assert!(sig.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_segment_contains() {
        let seg = segment(1, 5, 9, vec![1], "item 1");
        assert!(seg.contains(5));
        assert!(seg.contains(9));
        assert!(!seg.contains(10));
        assert_eq!(seg.order_count(), 5);
    }
}
