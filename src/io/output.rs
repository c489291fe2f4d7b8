use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch::BatchSummary;
use crate::consensus::{AttemptOutcome, MeetingOutcome};
use crate::models::AnnotatedSpeech;

pub const RUN_SUMMARY_TXT: &str = "overall_run_summary.txt";
pub const RUN_SUMMARY_JSON: &str = "overall_run_summary.json";

/// Write annotated speeches to `path` through a temporary file in the same
/// directory, then rename it over the final path
///
/// Readers see either the previous file or the complete new one. The
/// temporary file is removed if any step fails.
pub fn write_annotated_atomic(path: &Path, speeches: &[AnnotatedSpeech]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output.json");
    let temp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    let result = write_json_file(&temp_path, speeches).and_then(|()| {
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move {:?} into place at {:?}", temp_path, path))
    });

    if result.is_err() && temp_path.exists() {
        if let Err(e) = std::fs::remove_file(&temp_path) {
            warn!("Failed to remove temporary file {:?}: {}", temp_path, e);
        }
    }
    if result.is_ok() {
        debug!("Wrote {} annotated speeches to {:?}", speeches.len(), path);
    }
    result
}

fn write_json_file<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("Failed to write JSON")?;
    writer.flush().context("Failed to flush JSON")?;
    Ok(())
}

/// Write `overall_run_summary.txt` and `overall_run_summary.json` into `dir`
pub fn write_run_summary(dir: &Path, summary: &BatchSummary) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let txt_path = dir.join(RUN_SUMMARY_TXT);
    std::fs::write(&txt_path, summary.format())
        .with_context(|| format!("Failed to write file: {:?}", txt_path))?;

    let json_path = dir.join(RUN_SUMMARY_JSON);
    write_json_file(&json_path, summary)?;

    Ok((txt_path, json_path))
}

/// Human-readable per-meeting summary (`allrun_summary_<ID>.txt`)
pub struct MeetingSummary<'a> {
    outcome: &'a MeetingOutcome,
}

impl<'a> MeetingSummary<'a> {
    pub fn new(outcome: &'a MeetingOutcome) -> Self {
        Self { outcome }
    }

    pub fn format(&self) -> String {
        let outcome = self.outcome;
        let mut out = String::new();

        out.push_str(&format!("Meeting {}\n", outcome.meeting_id));
        out.push_str(&format!("Status: {}\n", outcome.status));
        out.push_str(&format!(
            "Attempts: {} (majority threshold {})\n",
            outcome.attempts_run(),
            outcome.majority_threshold
        ));
        out.push_str(&format!(
            "Started: {}\nFinished: {}\n",
            outcome.started_at.to_rfc3339(),
            outcome.finished_at.to_rfc3339()
        ));
        if let Some(failure) = &outcome.failure {
            out.push_str(&format!("Failure: {} ({})\n", failure, failure.kind()));
        }

        if !outcome.records.is_empty() {
            out.push_str("\nAttempts\n--------\n");
            for record in &outcome.records {
                let (detail, raw_response) = match &record.outcome {
                    AttemptOutcome::Signature { signature } => (signature.to_string(), None),
                    AttemptOutcome::Failed {
                        kind,
                        message,
                        raw_response,
                    } => (format!("FAILED {}: {}", kind, message), raw_response.as_deref()),
                };
                out.push_str(&format!(
                    "#{:<3} {:<10} {} ({} ms)\n",
                    record.attempt, record.phase, detail, record.elapsed_ms
                ));
                if let Some(raw) = raw_response {
                    out.push_str("     raw response:\n");
                    for line in raw.lines() {
                        out.push_str(&format!("     | {}\n", line));
                    }
                }
            }
        }

        for phase in &outcome.phases {
            out.push_str(&format!(
                "\nSignature counts ({}: {} of {} attempts, {} failed)\n",
                phase.phase, phase.attempts_run, phase.budget, phase.failed_attempts
            ));
            for entry in phase.tally.entries() {
                out.push_str(&format!(
                    "  {} x{} (first at #{})\n",
                    entry.signature, entry.count, entry.first_attempt
                ));
            }
        }

        if let Some(selected) = &outcome.selected {
            out.push_str("\nSelected\n--------\n");
            out.push_str(&format!(
                "Signature: {}\nAttempt: #{} ({})\n",
                selected.output.signature.as_str(),
                selected.attempt,
                selected.phase
            ));
            out.push_str("\nCandidate judgments\n-------------------\n");
            let defaulted = &selected.output.classifications.defaulted_orders;
            for result in &selected.output.classifications.results {
                let excerpt = selected
                    .output
                    .speeches
                    .iter()
                    .find(|s| s.speech.order == result.order)
                    .map(|s| s.speech.excerpt(60))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "[{}] trigger={} items={:?}{} {}\n",
                    result.order,
                    result.trigger,
                    result.agenda_items,
                    if defaulted.contains(&result.order) { " (omitted by oracle)" } else { "" },
                    excerpt
                ));
            }

            out.push_str("\nSegments\n--------\n");
            for segment in &selected.output.segments {
                out.push_str(&format!(
                    "[{}] orders {}..{} ({} speeches): {}\n",
                    segment.deliberation_order,
                    segment.start_order,
                    segment.end_order,
                    segment.order_count(),
                    segment.agenda_range_label
                ));
                out.push_str(&format!(
                    "    trigger speech {} by {}\n",
                    segment.trigger_speech_id.as_deref().unwrap_or("-"),
                    segment.trigger_speaker_name.as_deref().unwrap_or("-")
                ));
                for line in &segment.bill_review {
                    out.push_str(&format!("    {}\n", line));
                }
            }
        }

        out
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::consensus::{AttemptOutput, ConsensusStatus, Phase, RunRecord, SelectedRun};
    use crate::error::SegmentationError;
    use crate::models::{ClassificationResult, ClassificationSet, Segment, Signature, Speech};

    fn annotated(order: u32) -> AnnotatedSpeech {
        AnnotatedSpeech {
            speech: Speech {
                speech_id: format!("s{}", order),
                meeting_id: "51069".to_string(),
                speaker_name: "홍길동".to_string(),
                speaker_role: "소위원장".to_string(),
                order,
                text: "의사일정 제1항을 상정합니다.".to_string(),
                raw_agenda_reference_text: String::new(),
                extra: Default::default(),
            },
            deliberation_order: Some(1),
            is_trigger: order == 1,
            agenda_items: vec![1],
            bill_review: vec!["1. 도로교통법 일부개정법률안".to_string()],
            agenda_range_label: Some("item 1".to_string()),
        }
    }

    #[test]
    fn test_write_annotated_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("speeches_triggerdeliber_51069.json");

        write_annotated_atomic(&path, &[annotated(1)]).unwrap();
        write_annotated_atomic(&path, &[annotated(1), annotated(2)]).unwrap();

        let written: Vec<AnnotatedSpeech> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].speech.speech_id, "s1");
        assert!(written[0].is_trigger);

        // No temporary files left behind
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_output_record_is_flat() {
        let json = serde_json::to_value(annotated(1)).unwrap();

        assert_eq!(json["order"], 1);
        assert_eq!(json["speaker_role"], "소위원장");
        assert_eq!(json["deliberation_order"], 1);
        assert_eq!(json["agenda_items"], serde_json::json!([1]));
        assert_eq!(json["agenda_range_label"], "item 1");
    }

    #[test]
    fn test_meeting_summary_for_selected_run() {
        let now = Utc::now();
        let segments = vec![Segment {
            deliberation_order: 1,
            start_order: 1,
            end_order: 2,
            agenda_items: vec![1],
            bill_review: vec!["1. 도로교통법 일부개정법률안".to_string()],
            agenda_range_label: "item 1".to_string(),
            trigger_speech_id: Some("s1".to_string()),
            trigger_speaker_name: Some("홍길동".to_string()),
        }];
        let output = AttemptOutput {
            classifications: ClassificationSet {
                results: vec![
                    ClassificationResult {
                        order: 1,
                        trigger: true,
                        agenda_items: vec![1],
                    },
                    ClassificationResult::not_trigger(2),
                ],
                defaulted_orders: vec![2],
            },
            signature: Signature::of_segments(&segments),
            segments,
            speeches: vec![annotated(1), annotated(2)],
        };
        let outcome = MeetingOutcome {
            meeting_id: "51069".to_string(),
            status: ConsensusStatus::Stabilized,
            records: vec![],
            phases: vec![],
            selected: Some(SelectedRun {
                attempt: 3,
                phase: Phase::Primary,
                output,
            }),
            failure: None,
            majority_threshold: 3,
            started_at: now,
            finished_at: now,
        };

        let text = MeetingSummary::new(&outcome).format();

        assert!(text.contains("[1] trigger=true items=[1] 의사일정 제1항을 상정합니다."));
        assert!(text.contains("[2] trigger=false items=[] (omitted by oracle)"));
        assert!(text.contains("[1] orders 1..2 (2 speeches): item 1"));
        assert!(text.contains("trigger speech s1 by 홍길동"));
        assert!(text.contains("    1. 도로교통법 일부개정법률안"));
    }

    #[test]
    fn test_meeting_summary_for_failed_meeting() {
        let now = Utc::now();
        let error = SegmentationError::MalformedOracleResponse {
            reason: "no array".to_string(),
            raw: "I could not find any triggers.\nSorry.".to_string(),
        };
        let outcome = MeetingOutcome {
            meeting_id: "51069".to_string(),
            status: ConsensusStatus::Failed,
            records: vec![RunRecord::failed(1, Phase::Primary, &error, 12)],
            phases: vec![],
            selected: None,
            failure: Some(SegmentationError::ConsensusNotReached {
                attempts: 1,
                threshold: 3,
            }),
            majority_threshold: 3,
            started_at: now,
            finished_at: now,
        };

        let text = MeetingSummary::new(&outcome).format();

        assert!(text.contains("Meeting 51069"));
        assert!(text.contains("Status: FAILED"));
        assert!(text.contains("FAILED MalformedOracleResponse"));
        assert!(text.contains("     | I could not find any triggers.\n     | Sorry.\n"));
        assert!(text.contains("(ConsensusNotReached)"));
        assert!(!text.contains("Segments"));
    }
}
