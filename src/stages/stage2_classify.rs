use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, SegmentationError};
use crate::llm::{normalize_response, ClassificationOracle, OracleRequest};
use crate::models::{ClassificationSet, Speech};

/// Execute Stage 2: oracle classification of the trigger candidates
///
/// The oracle call is bounded by `timeout`. A timeout or transport error is
/// reported as `OracleUnavailable`; an unusable response as
/// `MalformedOracleResponse`. Both are scoped to the current attempt.
pub async fn classify_candidates(
    oracle: &dyn ClassificationOracle,
    request: &OracleRequest,
    candidates: &[&Speech],
    timeout: Duration,
) -> Result<ClassificationSet> {
    let raw = match tokio::time::timeout(timeout, oracle.classify(request)).await {
        Err(_) => {
            return Err(SegmentationError::OracleUnavailable(format!(
                "{} timed out after {}s",
                oracle.name(),
                timeout.as_secs_f64()
            )));
        }
        Ok(Err(e)) => {
            return Err(SegmentationError::OracleUnavailable(format!(
                "{}: {:#}",
                oracle.name(),
                e
            )));
        }
        Ok(Ok(raw)) => raw,
    };

    debug!("Oracle response: {} chars", raw.len());

    let set = normalize_response(&raw, candidates).inspect_err(|_| {
        warn!(
            "Unusable oracle response (first 200 chars): {}",
            raw.chars().take(200).collect::<String>()
        );
    })?;

    info!(
        "Stage 2: {} candidates classified, {} triggers, {} defaulted",
        set.results.len(),
        set.trigger_count(),
        set.defaulted_orders.len()
    );

    Ok(set)
}
