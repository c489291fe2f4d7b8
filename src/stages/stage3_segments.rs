use tracing::{debug, info, warn};

use crate::error::{Result, SegmentationError};
use crate::models::{BillPool, ClassificationSet, Meeting, Segment};

/// Execute Stage 3: turn trigger judgments into deliberation segments
///
/// Every result with `trigger = true` and at least one item starts a segment.
/// A segment runs until the speech before the next trigger; the last one runs
/// to the meeting's highest order. Segments are numbered from 1 in start order.
pub fn build_segments(
    meeting: &Meeting,
    classifications: &ClassificationSet,
    pool: &BillPool,
) -> Result<Vec<Segment>> {
    let boundaries = classifications.boundaries();
    if boundaries.is_empty() {
        return Err(SegmentationError::NoTriggerFound);
    }

    let max_order = meeting.max_order();
    let mut segments = Vec::with_capacity(boundaries.len());

    for (i, boundary) in boundaries.iter().enumerate() {
        let start_order = boundary.order;
        let mut end_order = match boundaries.get(i + 1) {
            Some(next) => next.order.saturating_sub(1),
            None => max_order,
        };
        if end_order < start_order {
            warn!(
                "Segment starting at {} would end at {}; clamping",
                start_order, end_order
            );
            end_order = start_order;
        }

        let mut agenda_items = boundary.agenda_items.clone();
        agenda_items.sort_unstable();
        agenda_items.dedup();

        let bill_review: Vec<String> = agenda_items
            .iter()
            .filter_map(|&index| match pool.get(index) {
                Some(item) => Some(item.line()),
                None => {
                    warn!(
                        "Meeting {}: agenda item {} is not in the bill pool",
                        meeting.meeting_id, index
                    );
                    None
                }
            })
            .collect();

        let trigger_speech = meeting.get_by_order(start_order);

        segments.push(Segment {
            deliberation_order: i as u32 + 1,
            start_order,
            end_order,
            agenda_range_label: format_agenda_range(&agenda_items),
            agenda_items,
            bill_review,
            trigger_speech_id: trigger_speech.map(|s| s.speech_id.clone()),
            trigger_speaker_name: trigger_speech.map(|s| s.speaker_name.clone()),
        });
    }

    info!(
        "Stage 3: {} segments over orders {}..={}",
        segments.len(),
        segments.first().map(|s| s.start_order).unwrap_or(0),
        max_order
    );
    for segment in &segments {
        debug!(
            "  [delib {}] {}..={} {}",
            segment.deliberation_order,
            segment.start_order,
            segment.end_order,
            segment.agenda_range_label
        );
    }

    Ok(segments)
}

/// Human-readable label for a set of agenda items
///
/// One item: "item 4". A contiguous ascending run: "items 4 through 7".
/// Anything else: each item listed, "item 1, item 3".
pub fn format_agenda_range(items: &[u32]) -> String {
    let mut sorted = items.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    match sorted.as_slice() {
        [] => String::new(),
        [single] => format!("item {}", single),
        [first, .., last] if sorted.windows(2).all(|w| w[1] == w[0] + 1) => {
            format!("items {} through {}", first, last)
        }
        _ => sorted
            .iter()
            .map(|i| format!("item {}", i))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgendaItem, ClassificationResult, Speech};

    fn meeting(max_order: u32) -> Meeting {
        let speeches = (1..=max_order)
            .map(|order| Speech {
                speech_id: format!("s{}", order),
                meeting_id: "m1".to_string(),
                speaker_name: "위원".to_string(),
                speaker_role: String::new(),
                order,
                text: String::new(),
                raw_agenda_reference_text: String::new(),
                extra: Default::default(),
            })
            .collect();
        Meeting::new("m1", speeches)
    }

    fn pool(indices: &[u32]) -> BillPool {
        let mut pool = BillPool::new();
        for &index in indices {
            pool.insert_first(AgendaItem {
                index,
                description: format!("법률안 {}", index),
                reference_number: None,
            });
        }
        pool
    }

    fn set(results: Vec<(u32, bool, Vec<u32>)>) -> ClassificationSet {
        ClassificationSet {
            results: results
                .into_iter()
                .map(|(order, trigger, agenda_items)| ClassificationResult {
                    order,
                    trigger,
                    agenda_items,
                })
                .collect(),
            defaulted_orders: vec![],
        }
    }

    #[test]
    fn test_format_agenda_range() {
        assert_eq!(format_agenda_range(&[4]), "item 4");
        assert_eq!(format_agenda_range(&[4, 5, 6, 7]), "items 4 through 7");
        assert_eq!(format_agenda_range(&[7, 5, 6, 4, 5]), "items 4 through 7");

        let label = format_agenda_range(&[1, 2, 3, 4, 5, 6, 7, 35]);
        assert!(label.contains("item 35"));
        assert!(label.starts_with("item 1, item 2"));
        assert!(!label.contains("through"));

        assert_eq!(format_agenda_range(&[]), "");
    }

    #[test]
    fn test_single_segment_runs_to_max_order() {
        let segments = build_segments(
            &meeting(20),
            &set(vec![(5, true, vec![3, 1, 2, 2])]),
            &pool(&[1, 2, 3]),
        )
        .unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].deliberation_order, 1);
        assert_eq!(segments[0].start_order, 5);
        assert_eq!(segments[0].end_order, 20);
        assert_eq!(segments[0].agenda_items, vec![1, 2, 3]);
        assert_eq!(segments[0].bill_review.len(), 3);
        assert_eq!(segments[0].trigger_speech_id.as_deref(), Some("s5"));
    }

    #[test]
    fn test_segments_are_contiguous_and_ordered() {
        let segments = build_segments(
            &meeting(30),
            &set(vec![
                (18, true, vec![4]),
                (3, true, vec![1, 2]),
                (9, false, vec![3]),
                (11, true, vec![]),
                (25, true, vec![5, 6]),
            ]),
            &pool(&[1, 2, 3, 4, 5, 6]),
        )
        .unwrap();

        let bounds: Vec<(u32, u32, u32)> = segments
            .iter()
            .map(|s| (s.deliberation_order, s.start_order, s.end_order))
            .collect();
        assert_eq!(bounds, vec![(1, 3, 17), (2, 18, 24), (3, 25, 30)]);

        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_order + 1, pair[1].start_order);
        }
    }

    #[test]
    fn test_unknown_items_are_left_out_of_bill_review() {
        let segments =
            build_segments(&meeting(10), &set(vec![(2, true, vec![1, 99])]), &pool(&[1])).unwrap();

        assert_eq!(segments[0].agenda_items, vec![1, 99]);
        assert_eq!(segments[0].bill_review, vec!["1. 법률안 1".to_string()]);
    }

    #[test]
    fn test_trigger_after_max_order_is_clamped() {
        let segments =
            build_segments(&meeting(10), &set(vec![(12, true, vec![1])]), &pool(&[1])).unwrap();

        assert_eq!(segments[0].start_order, 12);
        assert_eq!(segments[0].end_order, 12);
    }

    #[test]
    fn test_no_trigger_found() {
        let err = build_segments(
            &meeting(10),
            &set(vec![(2, false, vec![1]), (4, true, vec![])]),
            &pool(&[1]),
        )
        .unwrap_err();

        assert!(matches!(err, SegmentationError::NoTriggerFound));
    }
}
