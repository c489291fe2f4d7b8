use serde::{Deserialize, Serialize};

/// Oracle judgment for a single candidate speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Speech order of the judged speech
    pub order: u32,
    /// Whether the speech opens or advances deliberation
    pub trigger: bool,
    /// Agenda item indices referenced by the speech, as returned
    #[serde(default)]
    pub agenda_items: Vec<u32>,
}

impl ClassificationResult {
    /// Default judgment for a candidate the oracle left out
    pub fn not_trigger(order: u32) -> Self {
        Self {
            order,
            trigger: false,
            agenda_items: Vec::new(),
        }
    }

    /// A trigger with at least one item opens a segment
    pub fn opens_segment(&self) -> bool {
        self.trigger && !self.agenda_items.is_empty()
    }
}

/// Normalized oracle output: exactly one result per candidate, sorted by order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSet {
    pub results: Vec<ClassificationResult>,
    /// Candidates the oracle omitted and that were defaulted
    pub defaulted_orders: Vec<u32>,
}

impl ClassificationSet {
    /// Results that open a segment, ascending by order
    pub fn boundaries(&self) -> Vec<&ClassificationResult> {
        let mut boundaries: Vec<&ClassificationResult> =
            self.results.iter().filter(|r| r.opens_segment()).collect();
        boundaries.sort_by_key(|r| r.order);
        boundaries
    }

    pub fn trigger_count(&self) -> usize {
        self.results.iter().filter(|r| r.trigger).count()
    }
}
