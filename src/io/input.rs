use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::{Meeting, Speech};

/// A discovered meeting input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingFile {
    pub meeting_id: String,
    pub path: PathBuf,
}

/// Read a meeting file (a JSON array of speech records)
pub fn load_meeting_file(path: &Path, meeting_id: &str) -> Result<Meeting> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_meeting_json(&content, meeting_id)
        .with_context(|| format!("Failed to parse meeting file: {:?}", path))
}

/// Parse a JSON array of speech records into a meeting
pub fn parse_meeting_json(json: &str, meeting_id: &str) -> Result<Meeting> {
    let speeches: Vec<Speech> =
        serde_json::from_str(json).context("Expected a JSON array of speech records")?;

    let foreign = speeches
        .iter()
        .filter(|s| !s.meeting_id.is_empty() && s.meeting_id != meeting_id)
        .count();
    if foreign > 0 {
        debug!(
            "Meeting {}: {} records carry a different meeting_id",
            meeting_id, foreign
        );
    }

    let meeting = Meeting::new(meeting_id, speeches);
    let duplicates = meeting.duplicate_orders();
    if !duplicates.is_empty() {
        warn!(
            "Meeting {}: duplicate speech orders {:?}",
            meeting_id, duplicates
        );
    }
    Ok(meeting)
}

/// Extract the meeting ID from `<prefix><digits>.json`
pub fn parse_meeting_id_from_filename(path: &Path, prefix: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.strip_prefix(prefix)?.strip_suffix(".json")?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(id.to_string())
}

/// Meeting ID for an arbitrary input path: the numeric ID when the name
/// follows the input convention, otherwise the file stem
pub fn infer_meeting_id(path: &Path, prefix: &str) -> String {
    parse_meeting_id_from_filename(path, prefix).unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("meeting")
            .to_string()
    })
}

/// Recursively find meeting files under `root`, sorted by numeric meeting ID
///
/// When the same ID appears in several directories the first path in
/// lexical order wins.
pub fn discover_meeting_files(root: &Path, prefix: &str) -> Result<Vec<MeetingFile>> {
    if !root.is_dir() {
        bail!("Input root is not a directory: {:?}", root);
    }

    let mut files: Vec<MeetingFile> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            parse_meeting_id_from_filename(&path, prefix)
                .map(|meeting_id| MeetingFile { meeting_id, path })
        })
        .collect();

    files.sort_by(|a, b| {
        compare_numeric_ids(&a.meeting_id, &b.meeting_id).then_with(|| a.path.cmp(&b.path))
    });

    let before = files.len();
    files.dedup_by(|later, first| {
        if later.meeting_id == first.meeting_id {
            warn!(
                "Meeting {} found twice; using {:?}, ignoring {:?}",
                first.meeting_id, first.path, later.path
            );
            true
        } else {
            false
        }
    });
    debug!(
        "Discovered {} meeting files under {:?} ({} duplicates dropped)",
        files.len(),
        root,
        before - files.len()
    );

    Ok(files)
}

/// Canonical form of a numeric meeting ID: leading zeros dropped
pub fn normalize_meeting_id(id: &str) -> &str {
    let id = id.trim();
    match id.trim_start_matches('0') {
        "" if !id.is_empty() => "0",
        trimmed => trimmed,
    }
}

/// Compare digit strings by numeric value without parsing into a bounded int
fn compare_numeric_ids(a: &str, b: &str) -> Ordering {
    let a = normalize_meeting_id(a);
    let b = normalize_meeting_id(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "speeches_meeting_";

    #[test]
    fn test_parse_meeting_json_with_legacy_fields() {
        let json = r#"[
            {"speech_id": 1, "meeting_id": 51069, "member_name": "소위원장 홍길동",
             "speech_order": 1, "speech_text": "의사일정 제1항을 상정합니다.",
             "bills": "1. 도로교통법 일부개정법률안"},
            {"speech_id": "2", "meeting_id": "51069", "speaker_name": "김철수",
             "speaker_role": "위원", "order": 2, "text": "질의하겠습니다.",
             "raw_agenda_reference_text": null}
        ]"#;

        let meeting = parse_meeting_json(json, "51069").unwrap();

        assert_eq!(meeting.meeting_id, "51069");
        assert_eq!(meeting.speeches.len(), 2);
        assert_eq!(meeting.speeches[0].speaker_name, "소위원장 홍길동");
        assert_eq!(meeting.speeches[0].order, 1);
        assert!(meeting.speeches[0].is_chair("소위원장"));
        assert_eq!(meeting.speeches[1].raw_agenda_reference_text, "");
    }

    #[test]
    fn test_parse_meeting_json_rejects_non_array() {
        assert!(parse_meeting_json(r#"{"order": 1}"#, "1").is_err());
    }

    #[test]
    fn test_parse_meeting_id_from_filename() {
        let id = |name: &str| parse_meeting_id_from_filename(Path::new(name), PREFIX);

        assert_eq!(id("speeches_meeting_51069.json"), Some("51069".to_string()));
        assert_eq!(id("/data/a/speeches_meeting_7.json"), Some("7".to_string()));
        assert_eq!(id("speeches_meeting_51069.txt"), None);
        assert_eq!(id("speeches_meeting_abc.json"), None);
        assert_eq!(id("speeches_meeting_.json"), None);
        assert_eq!(id("speeches_triggerdeliber_51069.json"), None);
    }

    #[test]
    fn test_infer_meeting_id_falls_back_to_stem() {
        assert_eq!(
            infer_meeting_id(Path::new("in/speeches_meeting_42.json"), PREFIX),
            "42"
        );
        assert_eq!(infer_meeting_id(Path::new("in/sample.json"), PREFIX), "sample");
    }

    #[test]
    fn test_discover_sorts_numerically_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2023").join("march");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(dir.path().join("speeches_meeting_100.json"), "[]").unwrap();
        std::fs::write(nested.join("speeches_meeting_20.json"), "[]").unwrap();
        std::fs::write(dir.path().join("speeches_meeting_3.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.json"), "[]").unwrap();
        std::fs::write(dir.path().join("speeches_triggerdeliber_3.json"), "[]").unwrap();

        let files = discover_meeting_files(dir.path(), PREFIX).unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.meeting_id.as_str()).collect();

        assert_eq!(ids, vec!["3", "20", "100"]);
        assert_eq!(files[1].path, nested.join("speeches_meeting_20.json"));
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_meeting_files(&dir.path().join("missing"), PREFIX).is_err());
    }

    #[test]
    fn test_normalize_meeting_id() {
        assert_eq!(normalize_meeting_id("051069"), "51069");
        assert_eq!(normalize_meeting_id(" 7 "), "7");
        assert_eq!(normalize_meeting_id("000"), "0");
        assert_eq!(normalize_meeting_id(""), "");
    }

    #[test]
    fn test_compare_numeric_ids() {
        assert_eq!(compare_numeric_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_numeric_ids("007", "7"), Ordering::Equal);
        assert_eq!(compare_numeric_ids("51069", "51070"), Ordering::Less);
    }
}
