use tracing::info;

use crate::models::{AnnotatedSpeech, Meeting, Segment};

/// Execute Stage 4: stamp every speech with its covering segment
///
/// Speeches outside every segment keep a null deliberation order and empty
/// agenda fields. Only the chair speech that opens a segment is marked as
/// the trigger. Input order is preserved.
pub fn annotate_speeches(
    meeting: &Meeting,
    segments: &[Segment],
    chair_marker: &str,
) -> Vec<AnnotatedSpeech> {
    let annotated: Vec<AnnotatedSpeech> = meeting
        .speeches
        .iter()
        .map(|speech| {
            let segment = find_segment(segments, speech.order);
            AnnotatedSpeech {
                speech: speech.clone(),
                deliberation_order: segment.map(|s| s.deliberation_order),
                is_trigger: segment.is_some_and(|s| {
                    s.start_order == speech.order && speech.is_chair(chair_marker)
                }),
                agenda_items: segment.map(|s| s.agenda_items.clone()).unwrap_or_default(),
                bill_review: segment.map(|s| s.bill_review.clone()).unwrap_or_default(),
                agenda_range_label: segment.map(|s| s.agenda_range_label.clone()),
            }
        })
        .collect();

    let covered = annotated
        .iter()
        .filter(|a| a.deliberation_order.is_some())
        .count();
    info!(
        "Stage 4: {} of {} speeches fall inside a segment",
        covered,
        annotated.len()
    );

    annotated
}

/// Segments are sorted by start and do not overlap
fn find_segment(segments: &[Segment], order: u32) -> Option<&Segment> {
    let idx = segments.partition_point(|s| s.start_order <= order);
    idx.checked_sub(1)
        .map(|i| &segments[i])
        .filter(|s| s.contains(order))
}
