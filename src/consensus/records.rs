use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SegmentationError;
use crate::models::{AnnotatedSpeech, ClassificationSet, Segment, Signature};

/// Consensus state of one meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    /// Primary attempts in progress
    Running,
    /// A signature reached the threshold within the primary budget
    Stabilized,
    /// Primary budget exhausted; escalation attempts in progress
    Escalating,
    /// A signature reached the threshold within the escalation budget
    RetryStabilized,
    /// No usable result
    Failed,
}

impl ConsensusStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Stabilized | Self::RetryStabilized)
    }
}

impl fmt::Display for ConsensusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "RUNNING",
            Self::Stabilized => "STABILIZED",
            Self::Escalating => "ESCALATING",
            Self::RetryStabilized => "RETRY_STABILIZED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Attempt batch a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Primary,
    Escalation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.pad("primary"),
            Self::Escalation => f.pad("escalation"),
        }
    }
}

/// What a single attempt produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Signature { signature: Signature },
    Failed {
        kind: String,
        message: String,
        /// Full oracle text, kept for malformed responses
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

/// One pipeline attempt for a meeting
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// 1-based, counted across both phases
    pub attempt: usize,
    pub phase: Phase,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

impl RunRecord {
    pub fn failed(attempt: usize, phase: Phase, error: &SegmentationError, elapsed_ms: u64) -> Self {
        Self {
            attempt,
            phase,
            outcome: AttemptOutcome::Failed {
                kind: error.kind().to_string(),
                message: error.to_string(),
                raw_response: error.raw_response().map(str::to_string),
            },
            elapsed_ms,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.outcome {
            AttemptOutcome::Signature { signature } => Some(signature),
            AttemptOutcome::Failed { .. } => None,
        }
    }
}

/// Occurrence count of one signature within a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureTally {
    pub signature: Signature,
    pub count: usize,
    /// Attempt that first produced this signature
    pub first_attempt: usize,
}

/// Signature counters for one phase, in first-seen order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tally {
    entries: Vec<SignatureTally>,
}

impl Tally {
    /// Count one occurrence and return the new count
    pub fn record(&mut self, signature: &Signature, attempt: usize) -> usize {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.signature == signature) {
            entry.count += 1;
            return entry.count;
        }
        self.entries.push(SignatureTally {
            signature: signature.clone(),
            count: 1,
            first_attempt: attempt,
        });
        1
    }

    pub fn entries(&self) -> &[SignatureTally] {
        &self.entries
    }

    /// Highest count so far (0 when nothing succeeded)
    pub fn leading_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).max().unwrap_or(0)
    }
}

/// Counters and attempt usage of one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub budget: usize,
    pub attempts_run: usize,
    pub failed_attempts: usize,
    pub tally: Tally,
}

/// Output of one successful attempt
#[derive(Debug, Clone)]
pub struct AttemptOutput {
    pub classifications: ClassificationSet,
    pub segments: Vec<Segment>,
    pub speeches: Vec<AnnotatedSpeech>,
    pub signature: Signature,
}

/// The attempt whose signature reached the threshold
#[derive(Debug, Clone)]
pub struct SelectedRun {
    pub attempt: usize,
    pub phase: Phase,
    pub output: AttemptOutput,
}

/// Everything the controller learned while stabilizing one meeting
#[derive(Debug, Clone)]
pub struct MeetingOutcome {
    pub meeting_id: String,
    pub status: ConsensusStatus,
    pub records: Vec<RunRecord>,
    pub phases: Vec<PhaseReport>,
    pub selected: Option<SelectedRun>,
    /// Why the meeting failed, when it did
    pub failure: Option<SegmentationError>,
    pub majority_threshold: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MeetingOutcome {
    pub fn attempts_run(&self) -> usize {
        self.records.len()
    }

    pub fn escalated(&self) -> bool {
        self.phases.iter().any(|p| p.phase == Phase::Escalation)
    }

    pub fn selected_signature(&self) -> Option<&Signature> {
        self.selected.as_ref().map(|s| &s.output.signature)
    }
}
