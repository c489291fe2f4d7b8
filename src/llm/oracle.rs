use anyhow::Result;
use async_trait::async_trait;

/// A fully rendered classification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    /// Instructions, output contract and worked examples
    pub system: String,
    /// Candidate speeches and the bill pool
    pub user: String,
}

/// External text classifier that judges trigger status per candidate speech.
///
/// Implementations return the raw response text; it is untrusted and is
/// validated by the normalizer. Any error is treated as the oracle being
/// unavailable for that attempt.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify(&self, request: &OracleRequest) -> Result<String>;

    /// Short identifier for logs and summaries
    fn name(&self) -> String {
        "oracle".to_string()
    }
}
