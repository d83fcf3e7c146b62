use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{FormFamily, RawValuationRecord, ReviewContext, ValuationRecord};

/// Envelope returned by every form store fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    pub data: Vec<RawValuationRecord>,
}

/// Failure modes of a single source fetch. All of them degrade to an empty
/// contribution; none of them fails the merged view.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("source rejected the scoping context: {0}")]
    Unauthorized(String),
    #[error("source returned a malformed payload: {0}")]
    Malformed(String),
}

/// One of the three independent record stores. Implementations must return
/// an empty batch, not an error, when the actor simply has nothing visible.
pub trait ValuationSource: Send + Sync {
    fn form_family(&self) -> FormFamily;

    fn fetch_records<'a>(
        &'a self,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<SourceBatch, SourceError>>;
}

/// Fetches every configured source concurrently and unions the results into
/// one working set, stamping each record with the producing source's form
/// family. Waits for all fetches to settle; a failing source contributes an
/// empty set and a warning log, never an error. No filtering, no
/// deduplication.
pub async fn aggregate(
    sources: &[Arc<dyn ValuationSource>],
    ctx: &ReviewContext,
) -> Vec<ValuationRecord> {
    let fetches = sources.iter().map(|source| {
        let family = source.form_family();
        async move {
            match source.fetch_records(ctx).await {
                Ok(batch) => batch
                    .data
                    .into_iter()
                    .map(|raw| ValuationRecord::from_raw(raw, family))
                    .collect(),
                Err(error) => {
                    warn!(
                        family = family.label(),
                        %error,
                        "valuation source degraded to an empty contribution"
                    );
                    Vec::new()
                }
            }
        }
    });

    join_all(fetches).await.into_iter().flatten().collect()
}
