use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One speech record of a meeting transcript.
///
/// Field names follow the record format produced by the spreadsheet conversion
/// step; the older conversion output (`speech_order`, `member_name`,
/// `speech_text`, `bills`) is accepted through aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    #[serde(default, deserialize_with = "lenient_string")]
    pub speech_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub meeting_id: String,
    #[serde(default, alias = "member_name", deserialize_with = "lenient_string")]
    pub speaker_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub speaker_role: String,
    /// Position in the meeting; unique and dense per meeting
    #[serde(alias = "speech_order")]
    pub order: u32,
    #[serde(default, alias = "speech_text", deserialize_with = "lenient_string")]
    pub text: String,
    /// Raw agenda listing attached to the speech, one numbered item per line
    #[serde(default, alias = "bills", deserialize_with = "lenient_string")]
    pub raw_agenda_reference_text: String,
    /// Upstream fields this crate does not interpret (`member_id`, `party`, ...),
    /// carried through to the output unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Speech {
    /// Whether this speech was made by the chair.
    ///
    /// The role is authoritative when present; older records carry the role
    /// inside the speaker name (e.g. "소위원장 홍길동").
    pub fn is_chair(&self, chair_marker: &str) -> bool {
        if chair_marker.is_empty() {
            return false;
        }
        if self.speaker_role.trim().is_empty() {
            self.speaker_name.contains(chair_marker)
        } else {
            self.speaker_role.contains(chair_marker)
        }
    }

    /// Text with line breaks flattened, truncated to `max_chars` characters
    pub fn excerpt(&self, max_chars: usize) -> String {
        let flat = self.text.replace(['\n', '\r'], " ");
        match flat.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}…", &flat[..cut]),
            None => flat,
        }
    }
}

/// All speeches of one meeting, in input order.
#[derive(Debug, Clone)]
pub struct Meeting {
    pub meeting_id: String,
    pub speeches: Vec<Speech>,
}

impl Meeting {
    pub fn new(meeting_id: impl Into<String>, speeches: Vec<Speech>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            speeches,
        }
    }

    /// Highest speech order observed (0 for an empty meeting)
    pub fn max_order(&self) -> u32 {
        self.speeches.iter().map(|s| s.order).max().unwrap_or(0)
    }

    /// Chair speeches in input order
    pub fn chair_speeches(&self, chair_marker: &str) -> Vec<&Speech> {
        self.speeches
            .iter()
            .filter(|s| s.is_chair(chair_marker))
            .collect()
    }

    /// Get a speech by its order
    pub fn get_by_order(&self, order: u32) -> Option<&Speech> {
        self.speeches.iter().find(|s| s.order == order)
    }

    /// Orders that appear more than once, sorted
    pub fn duplicate_orders(&self) -> Vec<u32> {
        let mut orders: Vec<u32> = self.speeches.iter().map(|s| s.order).collect();
        orders.sort_unstable();
        let mut duplicates: Vec<u32> = orders
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .map(|pair| pair[0])
            .collect();
        duplicates.dedup();
        duplicates
    }
}

/// A speech stamped with its deliberation segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSpeech {
    #[serde(flatten)]
    pub speech: Speech,
    /// Segment number, `None` when no segment covers this speech
    pub deliberation_order: Option<u32>,
    /// True only for the chair speech that opens its segment
    pub is_trigger: bool,
    pub agenda_items: Vec<u32>,
    pub bill_review: Vec<String>,
    pub agenda_range_label: Option<String>,
}

/// Accepts a string, a number, or null; null becomes the empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
