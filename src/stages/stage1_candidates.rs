use tracing::{debug, info};

use crate::error::{Result, SegmentationError};
use crate::models::{Meeting, Speech};

/// Configuration for trigger candidate selection
#[derive(Debug, Clone)]
pub struct CandidateConfig {
    /// Substring identifying the chair in the speaker role (or name)
    pub chair_marker: String,
    /// A candidate must contain at least one of these
    pub trigger_phrases: Vec<String>,
    /// A speech containing any of these is never a candidate
    pub exclusion_phrases: Vec<String>,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        let owned = |phrases: &[&str]| -> Vec<String> {
            phrases.iter().map(|p| p.to_string()).collect()
        };
        Self {
            chair_marker: "소위원장".to_string(),
            trigger_phrases: owned(&[
                // agenda reference
                "의사일정",
                // review declarations
                "심사를 하겠습니다",
                "심사하겠습니다",
                "심사하도록",
                "심사합니다",
                "심의합니다",
                "심의하기로",
                "심의하도록",
                // tabling, joint and repeated review
                "상정합니다",
                "일괄하여 심사",
                "일괄 심사",
                "함께 심사",
                "병합하여 심사",
                "재심사",
                // requests to report or explain
                "보고해 주시기 바랍니다",
                "보고하여 주시기 바랍니다",
                "보고해 주십시오",
                "보고해 주시기",
                "설명 바랍니다",
                "설명해 주시기 바랍니다",
                "설명하여 주시기 바랍니다",
                "설명해 주십시오",
                "설명하여 주십시오",
                "주요 내용을 설명",
                "주요 사항을 설명",
                // moving on
                "다음으로",
                "다음 안건",
                "이어서",
            ]),
            exclusion_phrases: owned(&[
                // adjournment
                "산회",
                // recess
                "정회를 선포합니다",
                "정회하겠습니다",
                "정회하도록 하겠습니다",
                "정회를 하겠습니다",
            ]),
        }
    }
}

impl CandidateConfig {
    /// Whether a speech text passes the phrase filter
    pub fn is_candidate_text(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.exclusion_phrases.iter().any(|p| text.contains(p.as_str())) {
            return false;
        }
        self.trigger_phrases.iter().any(|p| text.contains(p.as_str()))
    }
}

/// Narrow the chair's speeches to those worth sending to the oracle
///
/// Order of the input is preserved.
pub fn select_trigger_candidates<'a>(
    meeting: &'a Meeting,
    config: &CandidateConfig,
) -> Result<Vec<&'a Speech>> {
    let chair_speeches = meeting.chair_speeches(&config.chair_marker);
    if chair_speeches.is_empty() {
        return Err(SegmentationError::NoChairSpeeches {
            meeting_id: meeting.meeting_id.clone(),
        });
    }

    let chair_count = chair_speeches.len();
    let candidates: Vec<&Speech> = chair_speeches
        .into_iter()
        .filter(|s| config.is_candidate_text(&s.text))
        .collect();

    info!(
        "Meeting {}: {} of {} chair speeches are trigger candidates",
        meeting.meeting_id,
        candidates.len(),
        chair_count
    );
    for candidate in &candidates {
        debug!("  candidate [{}] {}", candidate.order, candidate.excerpt(80));
    }

    if candidates.is_empty() {
        return Err(SegmentationError::NoTriggerCandidates {
            meeting_id: meeting.meeting_id.clone(),
            chair_speeches: chair_count,
        });
    }

    Ok(candidates)
}
