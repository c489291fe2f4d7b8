use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::consensus::{ConsensusStatus, MeetingOutcome};
use crate::models::Signature;

/// Result of one meeting within a batch
#[derive(Debug, Clone, Serialize)]
pub struct MeetingResult {
    pub meeting_id: String,
    pub status: ConsensusStatus,
    pub attempts: usize,
    pub escalated: bool,
    pub selected_signature: Option<Signature>,
    pub segment_count: usize,
    /// Error kind when the meeting failed
    pub failure_kind: Option<String>,
    pub failure: Option<String>,
    /// Annotated output, present only for meetings that were written
    pub output_path: Option<PathBuf>,
}

impl MeetingResult {
    pub fn from_outcome(outcome: &MeetingOutcome) -> Self {
        Self {
            meeting_id: outcome.meeting_id.clone(),
            status: outcome.status,
            attempts: outcome.attempts_run(),
            escalated: outcome.escalated(),
            selected_signature: outcome.selected_signature().cloned(),
            segment_count: outcome
                .selected
                .as_ref()
                .map(|s| s.output.segments.len())
                .unwrap_or(0),
            failure_kind: outcome.failure.as_ref().map(|e| e.kind().to_string()),
            failure: outcome.failure.as_ref().map(|e| e.to_string()),
            output_path: None,
        }
    }

    /// A meeting that failed outside the consensus loop (unreadable input,
    /// unwritable output)
    pub fn io_failure(meeting_id: impl Into<String>, kind: &str, message: String) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            status: ConsensusStatus::Failed,
            attempts: 0,
            escalated: false,
            selected_signature: None,
            segment_count: 0,
            failure_kind: Some(kind.to_string()),
            failure: Some(message),
            output_path: None,
        }
    }

    /// Error when the meeting has no written result
    pub fn ensure_success(&self) -> anyhow::Result<()> {
        if self.status.is_success() {
            return Ok(());
        }
        anyhow::bail!(
            "Meeting {} {}: {}",
            self.meeting_id,
            self.status,
            self.failure.as_deref().unwrap_or("unknown failure")
        )
    }

    /// Downgrade a stabilized meeting whose output could not be persisted
    pub fn mark_failed(&mut self, kind: &str, message: String) {
        self.status = ConsensusStatus::Failed;
        self.failure_kind = Some(kind.to_string());
        self.failure = Some(message);
        self.output_path = None;
    }
}

/// Aggregate outcome of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub stabilized: usize,
    pub retry_stabilized: usize,
    pub failed: usize,
    /// Percentage of meetings with a written result
    pub success_rate: f64,
    pub failed_meetings: Vec<String>,
    pub meetings: Vec<MeetingResult>,
}

impl BatchSummary {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        meetings: Vec<MeetingResult>,
    ) -> Self {
        let count = |status: ConsensusStatus| meetings.iter().filter(|m| m.status == status).count();
        let stabilized = count(ConsensusStatus::Stabilized);
        let retry_stabilized = count(ConsensusStatus::RetryStabilized);
        let failed_meetings: Vec<String> = meetings
            .iter()
            .filter(|m| !m.status.is_success())
            .map(|m| m.meeting_id.clone())
            .collect();
        let total = meetings.len();
        let success_rate = if total > 0 {
            (stabilized + retry_stabilized) as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            run_id,
            started_at,
            finished_at,
            total,
            stabilized,
            retry_stabilized,
            failed: failed_meetings.len(),
            success_rate,
            failed_meetings,
            meetings,
        }
    }

    /// Plain-text rendering for `overall_run_summary.txt`
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str("Overall Run Summary\n");
        out.push_str("===================\n");
        out.push_str(&format!("Run ID: {}\n", self.run_id));
        out.push_str(&format!("Started: {}\n", self.started_at.to_rfc3339()));
        out.push_str(&format!("Finished: {}\n", self.finished_at.to_rfc3339()));
        out.push('\n');
        out.push_str(&format!("Total meetings: {}\n", self.total));
        out.push_str(&format!("Stabilized: {}\n", self.stabilized));
        out.push_str(&format!(
            "Stabilized after escalation: {}\n",
            self.retry_stabilized
        ));
        out.push_str(&format!("Failed: {}\n", self.failed));
        out.push_str(&format!("Success rate: {:.1}%\n", self.success_rate));

        if !self.failed_meetings.is_empty() {
            out.push('\n');
            out.push_str("Failed meetings\n");
            out.push_str("---------------\n");
            for meeting in self.meetings.iter().filter(|m| !m.status.is_success()) {
                out.push_str(&format!(
                    "{}: {}\n",
                    meeting.meeting_id,
                    meeting.failure.as_deref().unwrap_or("unknown failure")
                ));
            }
        }

        out.push('\n');
        out.push_str("Meetings\n");
        out.push_str("--------\n");
        for meeting in &self.meetings {
            out.push_str(&format!(
                "{}: {} after {} attempts",
                meeting.meeting_id, meeting.status, meeting.attempts
            ));
            if let Some(signature) = &meeting.selected_signature {
                out.push_str(&format!(
                    ", signature {}, {} segments",
                    signature, meeting.segment_count
                ));
            }
            out.push('\n');
        }

        out
    }
}
