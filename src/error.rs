//! Error taxonomy for the segmentation pipeline.

use serde::Serialize;

/// How far an error reaches: a single attempt, or the whole meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Logged and counted; the consensus loop moves on to the next attempt
    Attempt,
    /// No (further) attempts are possible for this meeting
    Meeting,
}

/// Errors produced while segmenting one meeting.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SegmentationError {
    #[error("no numbered agenda items found in any speech of meeting {meeting_id}")]
    EmptyBillPool { meeting_id: String },

    #[error("no chair speeches found in meeting {meeting_id}")]
    NoChairSpeeches { meeting_id: String },

    #[error("none of the {chair_speeches} chair speeches in meeting {meeting_id} contain a trigger phrase")]
    NoTriggerCandidates {
        meeting_id: String,
        chair_speeches: usize,
    },

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("malformed oracle response: {reason}")]
    MalformedOracleResponse {
        reason: String,
        /// Full response text as returned by the oracle
        raw: String,
    },

    #[error("no speech was classified as a trigger with agenda items")]
    NoTriggerFound,

    #[error("consensus not reached after {attempts} attempts (threshold {threshold})")]
    ConsensusNotReached { attempts: usize, threshold: usize },
}

impl SegmentationError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::OracleUnavailable(_) | Self::MalformedOracleResponse { .. } | Self::NoTriggerFound => {
                ErrorScope::Attempt
            }
            Self::EmptyBillPool { .. }
            | Self::NoChairSpeeches { .. }
            | Self::NoTriggerCandidates { .. }
            | Self::ConsensusNotReached { .. } => ErrorScope::Meeting,
        }
    }

    /// Raw oracle text behind a malformed response
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::MalformedOracleResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Stable short name used in summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyBillPool { .. } => "EmptyBillPool",
            Self::NoChairSpeeches { .. } => "NoChairSpeeches",
            Self::NoTriggerCandidates { .. } => "NoTriggerCandidates",
            Self::OracleUnavailable(_) => "OracleUnavailable",
            Self::MalformedOracleResponse { .. } => "MalformedOracleResponse",
            Self::NoTriggerFound => "NoTriggerFound",
            Self::ConsensusNotReached { .. } => "ConsensusNotReached",
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, SegmentationError>;
