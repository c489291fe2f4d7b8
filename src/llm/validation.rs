use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Result, SegmentationError};
use crate::models::{ClassificationResult, ClassificationSet, Speech};
use crate::parsing::{parse_entry, parse_oracle_array};

/// Validate raw oracle output and make it total over the candidates
///
/// Entries for candidates use the oracle's values (the last entry wins when
/// an order repeats). Candidates the oracle left out default to "not a
/// trigger". Entries for speeches that were not candidates are ignored.
pub fn normalize_response(raw: &str, candidates: &[&Speech]) -> Result<ClassificationSet> {
    let values = parse_oracle_array(raw)
        .map_err(|e| SegmentationError::MalformedOracleResponse {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;
    if values.is_empty() {
        return Err(SegmentationError::MalformedOracleResponse {
            reason: "result array is empty".to_string(),
            raw: raw.to_string(),
        });
    }

    let mut by_order: HashMap<u32, ClassificationResult> = HashMap::new();
    let mut skipped = 0usize;
    for value in &values {
        match parse_entry(value) {
            Some(entry) => {
                by_order.insert(
                    entry.order,
                    ClassificationResult {
                        order: entry.order,
                        trigger: entry.trigger,
                        agenda_items: entry.agenda_items,
                    },
                );
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} oracle entries without a usable order", skipped);
    }

    let mut results = Vec::with_capacity(candidates.len());
    let mut defaulted_orders = Vec::new();
    for candidate in candidates {
        match by_order.remove(&candidate.order) {
            Some(result) => results.push(result),
            None => {
                debug!(
                    "Oracle omitted candidate {}; treating it as not a trigger",
                    candidate.order
                );
                defaulted_orders.push(candidate.order);
                results.push(ClassificationResult::not_trigger(candidate.order));
            }
        }
    }
    if !by_order.is_empty() {
        let mut extra: Vec<u32> = by_order.into_keys().collect();
        extra.sort_unstable();
        debug!("Ignored oracle entries for non-candidate orders {:?}", extra);
    }

    results.sort_by_key(|r| r.order);
    defaulted_orders.sort_unstable();

    Ok(ClassificationSet {
        results,
        defaulted_orders,
    })
}
