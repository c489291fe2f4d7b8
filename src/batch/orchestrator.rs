use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::consensus::{ConsensusConfig, ConsensusController};
use crate::io::{
    discover_meeting_files, load_meeting_file, normalize_meeting_id, write_annotated_atomic,
    write_run_summary, MeetingFile, MeetingSummary,
};
use crate::llm::ClassificationOracle;
use crate::models::Meeting;

use super::summary::{BatchSummary, MeetingResult};

/// Paths and naming for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Scanned recursively for meeting files
    pub input_root: PathBuf,
    /// Annotated outputs
    pub results_dir: PathBuf,
    /// Per-meeting and aggregate summaries
    pub summary_dir: PathBuf,
    pub input_prefix: String,
    pub output_prefix: String,
    pub summary_prefix: String,
    /// Restrict the run to these meeting IDs (reprocessing failures);
    /// leading zeros are ignored when matching
    pub only: Option<BTreeSet<String>>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("."),
            results_dir: PathBuf::from("results"),
            summary_dir: PathBuf::from("results").join("summary"),
            input_prefix: "speeches_meeting_".to_string(),
            output_prefix: "speeches_triggerdeliber_".to_string(),
            summary_prefix: "allrun_summary_".to_string(),
            only: None,
        }
    }
}

impl BatchConfig {
    /// Results go to `output_dir`, summaries to `output_dir/summary`
    pub fn new(input_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            input_root: input_root.into(),
            summary_dir: output_dir.join("summary"),
            results_dir: output_dir,
            ..Default::default()
        }
    }

    pub fn output_path(&self, meeting_id: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{}.json", self.output_prefix, meeting_id))
    }

    pub fn summary_path(&self, meeting_id: &str) -> PathBuf {
        self.summary_dir
            .join(format!("{}{}.txt", self.summary_prefix, meeting_id))
    }
}

/// Stabilizes every discovered meeting in turn and records the outcome
pub struct BatchOrchestrator {
    config: BatchConfig,
    controller: ConsensusController,
}

impl BatchOrchestrator {
    pub fn new(config: BatchConfig, consensus: ConsensusConfig) -> Self {
        Self {
            config,
            controller: ConsensusController::new(consensus),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process all meetings sequentially and write the aggregate summary
    ///
    /// Per-meeting failures never abort the run; only a missing input root or
    /// an unwritable summary directory does.
    pub async fn run(&self, oracle: &dyn ClassificationOracle) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let files = discover_meeting_files(&self.config.input_root, &self.config.input_prefix)
            .context("Failed to discover meeting files")?;
        let files = self.select(files);
        info!(
            "Batch {}: {} meetings under {:?} (oracle {})",
            run_id,
            files.len(),
            self.config.input_root,
            oracle.name()
        );

        let mut results = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            info!(
                "[{}/{}] Meeting {} ({:?})",
                i + 1,
                files.len(),
                file.meeting_id,
                file.path
            );
            results.push(self.process_file(oracle, file).await);
        }

        let summary = BatchSummary::new(run_id, started_at, Utc::now(), results);
        let (txt_path, _) = write_run_summary(&self.config.summary_dir, &summary)
            .context("Failed to write run summary")?;

        info!(
            "Batch {} complete: {} stabilized, {} after escalation, {} failed ({:.1}% success)",
            run_id, summary.stabilized, summary.retry_stabilized, summary.failed, summary.success_rate
        );
        if !summary.failed_meetings.is_empty() {
            warn!("Failed meetings: {}", summary.failed_meetings.join(", "));
        }
        info!("Run summary written to {:?}", txt_path);

        Ok(summary)
    }

    fn select(&self, files: Vec<MeetingFile>) -> Vec<MeetingFile> {
        let Some(only) = &self.config.only else {
            return files;
        };
        let wanted: BTreeSet<&str> = only.iter().map(|id| normalize_meeting_id(id)).collect();
        let selected: Vec<MeetingFile> = files
            .into_iter()
            .filter(|f| wanted.contains(normalize_meeting_id(&f.meeting_id)))
            .collect();
        for id in wanted {
            if !selected
                .iter()
                .any(|f| normalize_meeting_id(&f.meeting_id) == id)
            {
                warn!("Requested meeting {} has no input file", id);
            }
        }
        selected
    }

    async fn process_file(
        &self,
        oracle: &dyn ClassificationOracle,
        file: &MeetingFile,
    ) -> MeetingResult {
        let meeting = match load_meeting_file(&file.path, &file.meeting_id) {
            Ok(meeting) => meeting,
            Err(e) => {
                warn!("Meeting {}: {:#}", file.meeting_id, e);
                return MeetingResult::io_failure(&file.meeting_id, "InputError", format!("{:#}", e));
            }
        };

        process_meeting(
            &self.controller,
            oracle,
            &meeting,
            &self.config.output_path(&file.meeting_id),
            &self.config.summary_path(&file.meeting_id),
        )
        .await
    }
}

/// Stabilize one loaded meeting, then persist its output and summary
///
/// The annotated output is written only for a stabilized meeting; the
/// summary is written either way.
pub async fn process_meeting(
    controller: &ConsensusController,
    oracle: &dyn ClassificationOracle,
    meeting: &Meeting,
    output_path: &Path,
    summary_path: &Path,
) -> MeetingResult {
    let outcome = controller.stabilize(oracle, meeting).await;
    let mut result = MeetingResult::from_outcome(&outcome);

    if let Some(selected) = &outcome.selected {
        match write_annotated_atomic(output_path, &selected.output.speeches) {
            Ok(()) => {
                info!(
                    "Meeting {}: {} segments written to {:?}",
                    meeting.meeting_id,
                    selected.output.segments.len(),
                    output_path
                );
                result.output_path = Some(output_path.to_path_buf());
            }
            Err(e) => {
                warn!("Meeting {}: {:#}", meeting.meeting_id, e);
                result.mark_failed("OutputError", format!("{:#}", e));
            }
        }
    }

    if let Err(e) = MeetingSummary::new(&outcome).write_file(summary_path) {
        warn!(
            "Meeting {}: failed to write summary: {:#}",
            meeting.meeting_id, e
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::consensus::ConsensusStatus;
    use crate::llm::OracleRequest;
    use crate::models::AnnotatedSpeech;
    use crate::stages::CandidateConfig;

    /// Always answers that order 5 opens items 1 and 2
    struct FixedOracle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ClassificationOracle for FixedOracle {
        async fn classify(&self, _request: &OracleRequest) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"[{"order": 5, "trigger": true, "agenda_items": [1, 2]}]"#.to_string())
        }
    }

    fn meeting_json(meeting_id: &str, with_agenda: bool) -> String {
        let speeches: Vec<serde_json::Value> = (1..=10)
            .map(|order| {
                let chair = order == 5;
                serde_json::json!({
                    "speech_id": format!("{}-{}", meeting_id, order),
                    "meeting_id": meeting_id,
                    "speaker_name": "홍길동",
                    "speaker_role": if chair { "소위원장" } else { "위원" },
                    "order": order,
                    "text": if chair { "의사일정 제1항과 제2항을 일괄 심사하겠습니다." } else { "질의합니다." },
                    "raw_agenda_reference_text": if with_agenda && order == 1 {
                        "1. 도로교통법 일부개정법률안\n2. 자동차관리법 일부개정법률안"
                    } else {
                        ""
                    },
                })
            })
            .collect();
        serde_json::to_string(&speeches).unwrap()
    }

    fn consensus() -> ConsensusConfig {
        ConsensusConfig {
            majority_threshold: 2,
            max_attempts: 3,
            escalation_attempts: 0,
            oracle_timeout: Duration::from_secs(5),
            candidates: CandidateConfig::default(),
        }
    }

    fn write_input(root: &Path, meeting_id: &str, contents: &str) {
        std::fs::write(
            root.join(format!("speeches_meeting_{}.json", meeting_id)),
            contents,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_batch_continues_past_failed_meetings() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_input(input.path(), "100", &meeting_json("100", true));
        write_input(input.path(), "7", &meeting_json("7", false));
        write_input(input.path(), "20", &meeting_json("20", true));
        write_input(input.path(), "33", "not json");

        let config = BatchConfig::new(input.path(), output.path());
        let orchestrator = BatchOrchestrator::new(config.clone(), consensus());
        let oracle = FixedOracle {
            calls: AtomicUsize::new(0),
        };

        let summary = orchestrator.run(&oracle).await.unwrap();

        let ids: Vec<&str> = summary.meetings.iter().map(|m| m.meeting_id.as_str()).collect();
        assert_eq!(ids, vec!["7", "20", "33", "100"]);
        assert_eq!(summary.stabilized, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failed_meetings, vec!["7".to_string(), "33".to_string()]);
        // Two attempts for each good meeting, none for the empty pool
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 4);

        assert_eq!(summary.meetings[0].failure_kind.as_deref(), Some("EmptyBillPool"));
        assert_eq!(summary.meetings[2].failure_kind.as_deref(), Some("InputError"));

        assert!(!config.output_path("7").exists());
        assert!(!config.output_path("33").exists());
        let written: Vec<AnnotatedSpeech> = serde_json::from_str(
            &std::fs::read_to_string(config.output_path("20")).unwrap(),
        )
        .unwrap();
        assert_eq!(written.len(), 10);
        assert_eq!(written[4].deliberation_order, Some(1));
        assert_eq!(written[4].agenda_range_label.as_deref(), Some("items 1 through 2"));
        assert_eq!(written[3].deliberation_order, None);

        assert!(config.summary_path("7").exists());
        assert!(config.summary_path("100").exists());
        let overall =
            std::fs::read_to_string(config.summary_dir.join("overall_run_summary.txt")).unwrap();
        assert!(overall.contains("Failed: 2"));
        assert!(overall.contains("7: "));
        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(config.summary_dir.join("overall_run_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["total"], 4);
        assert_eq!(json["failed_meetings"], serde_json::json!(["7", "33"]));
    }

    #[tokio::test]
    async fn test_only_restricts_meetings() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_input(input.path(), "1", &meeting_json("1", true));
        write_input(input.path(), "2", &meeting_json("2", true));

        let mut config = BatchConfig::new(input.path(), output.path());
        config.only = Some(["002".to_string(), "99".to_string()].into_iter().collect());
        let orchestrator = BatchOrchestrator::new(config.clone(), consensus());
        let oracle = FixedOracle {
            calls: AtomicUsize::new(0),
        };

        let summary = orchestrator.run(&oracle).await.unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.meetings[0].meeting_id, "2");
        assert_eq!(summary.meetings[0].status, ConsensusStatus::Stabilized);
        assert!(!config.output_path("1").exists());
    }

    #[tokio::test]
    async fn test_missing_input_root_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        let config = BatchConfig::new(output.path().join("missing"), output.path());
        let orchestrator = BatchOrchestrator::new(config, consensus());
        let oracle = FixedOracle {
            calls: AtomicUsize::new(0),
        };

        assert!(orchestrator.run(&oracle).await.is_err());
    }
}
