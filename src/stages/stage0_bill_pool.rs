use tracing::{debug, info};

use crate::error::{Result, SegmentationError};
use crate::models::{BillPool, Meeting};
use crate::parsing::parse_agenda_block;

/// Build the bill pool for a meeting
///
/// Every speech's agenda blob is scanned line by line; each numbered line
/// contributes an agenda item and the first occurrence of an index wins.
/// A meeting without any numbered line cannot be segmented.
pub fn build_bill_pool(meeting: &Meeting) -> Result<BillPool> {
    let mut pool = BillPool::new();
    let mut duplicates = 0usize;

    for speech in &meeting.speeches {
        for item in parse_agenda_block(&speech.raw_agenda_reference_text) {
            if !pool.insert_first(item) {
                duplicates += 1;
            }
        }
    }

    if pool.is_empty() {
        return Err(SegmentationError::EmptyBillPool {
            meeting_id: meeting.meeting_id.clone(),
        });
    }

    debug!(
        "Meeting {}: {} repeated agenda lines ignored",
        meeting.meeting_id, duplicates
    );
    info!(
        "Meeting {}: bill pool has {} agenda items",
        meeting.meeting_id,
        pool.len()
    );

    Ok(pool)
}
