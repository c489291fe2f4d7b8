pub mod batch;
pub mod consensus;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod parsing;
pub mod stages;

pub use batch::{process_meeting, BatchConfig, BatchOrchestrator, BatchSummary, MeetingResult};
pub use consensus::{
    prepare_meeting, ConsensusConfig, ConsensusController, ConsensusStatus, MeetingOutcome,
};
pub use error::{ErrorScope, SegmentationError};
pub use io::{discover_meeting_files, infer_meeting_id, load_meeting_file, MeetingSummary};
pub use llm::{AnthropicClient, AnthropicConfig, ClassificationOracle, OracleRequest};
pub use models::{AnnotatedSpeech, BillPool, Meeting, Segment, Signature, Speech};
pub use stages::{
    annotate_speeches, build_bill_pool, build_segments, classify_candidates,
    select_trigger_candidates, CandidateConfig,
};
