use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Result, SegmentationError};
use crate::llm::{build_trigger_request, ClassificationOracle, OracleRequest};
use crate::models::{BillPool, Meeting, Signature, Speech};
use crate::stages::{
    annotate_speeches, build_bill_pool, build_segments, classify_candidates,
    select_trigger_candidates, CandidateConfig,
};

use super::records::{
    AttemptOutcome, AttemptOutput, ConsensusStatus, MeetingOutcome, Phase, PhaseReport,
    RunRecord, SelectedRun, Tally,
};

/// Configuration for multi-run stabilization
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Occurrences a signature needs before its run is accepted
    pub majority_threshold: usize,
    /// Attempt budget of the primary phase
    pub max_attempts: usize,
    /// Attempt budget of the escalation phase (0 disables escalation)
    pub escalation_attempts: usize,
    /// Hard bound on a single oracle call
    pub oracle_timeout: Duration,
    /// Chair detection and phrase filter
    pub candidates: CandidateConfig,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            majority_threshold: 3,
            max_attempts: 10,
            escalation_attempts: 15,
            oracle_timeout: Duration::from_secs(1500),
            candidates: CandidateConfig::default(),
        }
    }
}

/// Deterministic per-meeting inputs shared by every attempt
#[derive(Debug)]
pub struct PreparedMeeting<'a> {
    pub meeting: &'a Meeting,
    pub pool: BillPool,
    pub candidates: Vec<&'a Speech>,
    pub request: OracleRequest,
}

/// Build the bill pool, select candidates and render the oracle request
///
/// Errors here are fatal for the meeting: no attempt could do better.
pub fn prepare_meeting<'a>(
    meeting: &'a Meeting,
    config: &CandidateConfig,
) -> Result<PreparedMeeting<'a>> {
    let duplicates = meeting.duplicate_orders();
    if !duplicates.is_empty() {
        warn!(
            "Meeting {}: speech orders {:?} occur more than once",
            meeting.meeting_id, duplicates
        );
    }

    let pool = build_bill_pool(meeting)?;
    let candidates = select_trigger_candidates(meeting, config)?;
    let request = build_trigger_request(&candidates, &pool);

    Ok(PreparedMeeting {
        meeting,
        pool,
        candidates,
        request,
    })
}

/// Runs the segmentation pipeline until one outcome recurs often enough
pub struct ConsensusController {
    config: ConsensusConfig,
}

impl ConsensusController {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Stabilize one meeting
    ///
    /// Never returns an error: meeting-level failures are reported in the
    /// outcome's `status` and `failure`.
    pub async fn stabilize(
        &self,
        oracle: &dyn ClassificationOracle,
        meeting: &Meeting,
    ) -> MeetingOutcome {
        let threshold = self.config.majority_threshold.max(1);
        let started_at = Utc::now();
        let mut outcome = MeetingOutcome {
            meeting_id: meeting.meeting_id.clone(),
            status: ConsensusStatus::Running,
            records: Vec::new(),
            phases: Vec::new(),
            selected: None,
            failure: None,
            majority_threshold: threshold,
            started_at,
            finished_at: started_at,
        };

        let prepared = match prepare_meeting(meeting, &self.config.candidates) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("Meeting {} cannot be segmented: {}", meeting.meeting_id, e);
                outcome.status = ConsensusStatus::Failed;
                outcome.failure = Some(e);
                outcome.finished_at = Utc::now();
                return outcome;
            }
        };

        info!(
            "Meeting {}: {}, up to {} attempts, threshold {}",
            meeting.meeting_id,
            outcome.status,
            self.config.max_attempts,
            threshold
        );
        let (report, selected) = self
            .run_phase(
                oracle,
                &prepared,
                Phase::Primary,
                self.config.max_attempts,
                threshold,
                &mut outcome.records,
            )
            .await;
        outcome.phases.push(report);

        if let Some(selected) = selected {
            outcome.status = ConsensusStatus::Stabilized;
            outcome.selected = Some(selected);
        } else if self.config.escalation_attempts > 0 {
            outcome.status = ConsensusStatus::Escalating;
            info!(
                "Meeting {}: {}, {} more attempts with fresh counters",
                meeting.meeting_id, outcome.status, self.config.escalation_attempts
            );
            let (report, selected) = self
                .run_phase(
                    oracle,
                    &prepared,
                    Phase::Escalation,
                    self.config.escalation_attempts,
                    threshold,
                    &mut outcome.records,
                )
                .await;
            outcome.phases.push(report);

            if let Some(selected) = selected {
                outcome.status = ConsensusStatus::RetryStabilized;
                outcome.selected = Some(selected);
            }
        }

        if outcome.selected.is_none() {
            outcome.status = ConsensusStatus::Failed;
            outcome.failure = Some(SegmentationError::ConsensusNotReached {
                attempts: outcome.records.len(),
                threshold,
            });
        }

        outcome.finished_at = Utc::now();
        info!(
            "Meeting {}: {} after {} attempts",
            meeting.meeting_id,
            outcome.status,
            outcome.records.len()
        );
        outcome
    }

    /// Run one end-to-end attempt: oracle, normalization, segments, annotation
    pub async fn run_attempt(
        &self,
        oracle: &dyn ClassificationOracle,
        prepared: &PreparedMeeting<'_>,
    ) -> Result<AttemptOutput> {
        let classifications = classify_candidates(
            oracle,
            &prepared.request,
            &prepared.candidates,
            self.config.oracle_timeout,
        )
        .await?;
        let segments = build_segments(prepared.meeting, &classifications, &prepared.pool)?;
        let speeches = annotate_speeches(
            prepared.meeting,
            &segments,
            &self.config.candidates.chair_marker,
        );
        let signature = Signature::of_segments(&segments);

        Ok(AttemptOutput {
            classifications,
            segments,
            speeches,
            signature,
        })
    }

    /// Run attempts until a signature reaches `threshold` or the budget ends
    async fn run_phase(
        &self,
        oracle: &dyn ClassificationOracle,
        prepared: &PreparedMeeting<'_>,
        phase: Phase,
        budget: usize,
        threshold: usize,
        records: &mut Vec<RunRecord>,
    ) -> (PhaseReport, Option<SelectedRun>) {
        let meeting_id = &prepared.meeting.meeting_id;
        let mut tally = Tally::default();
        let mut attempts_run = 0;
        let mut failed_attempts = 0;
        let mut selected = None;

        for step in 1..=budget {
            let attempt = records.len() + 1;
            attempts_run += 1;
            let started = Instant::now();
            let result = self.run_attempt(oracle, prepared).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(output) => {
                    let count = tally.record(&output.signature, attempt);
                    info!(
                        "Meeting {}: {} attempt {}/{} signature={} ({}/{})",
                        meeting_id, phase, step, budget, output.signature, count, threshold
                    );
                    records.push(RunRecord {
                        attempt,
                        phase,
                        outcome: AttemptOutcome::Signature {
                            signature: output.signature.clone(),
                        },
                        elapsed_ms,
                    });
                    if count >= threshold {
                        info!(
                            "Meeting {}: signature {} reached {} at attempt {}",
                            meeting_id, output.signature, threshold, attempt
                        );
                        selected = Some(SelectedRun {
                            attempt,
                            phase,
                            output,
                        });
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        "Meeting {}: {} attempt {}/{} failed: {}",
                        meeting_id, phase, step, budget, e
                    );
                    failed_attempts += 1;
                    records.push(RunRecord::failed(attempt, phase, &e, elapsed_ms));
                }
            }
        }

        let report = PhaseReport {
            phase,
            budget,
            attempts_run,
            failed_attempts,
            tally,
        };
        (report, selected)
    }
}
