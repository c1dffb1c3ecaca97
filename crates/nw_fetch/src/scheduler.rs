use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use nw_core::storage::SourceRepository;
use nw_core::{Candidate, Error, Result, Source};

use crate::strategy::FetchDispatcher;

/// Sink for fetched candidates; implemented by the ingestion side. Returns
/// the number of candidates accepted after dedup.
#[async_trait]
pub trait CandidateImporter: Send + Sync {
    async fn import(&self, candidates: Vec<Candidate>) -> Result<usize>;
}

/// Walks configured sources on an interval gate and pushes whatever their
/// strategy produced into the importer. One broken source never blocks the
/// others.
pub struct FetchScheduler {
    sources: Arc<dyn SourceRepository>,
    dispatcher: FetchDispatcher,
    importer: Arc<dyn CandidateImporter>,
}

impl FetchScheduler {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        dispatcher: FetchDispatcher,
        importer: Arc<dyn CandidateImporter>,
    ) -> Self {
        Self {
            sources,
            dispatcher,
            importer,
        }
    }

    /// Run every active source that is due. Per-source failures are logged
    /// and swallowed; this never returns an error once the source list has
    /// loaded.
    pub async fn run_all_due(&self) {
        info!("starting fetch cycle over all sources");

        let sources = match self.sources.list_active().await {
            Ok(sources) => sources,
            Err(e) => {
                error!("failed to load sources: {}", e);
                return;
            }
        };

        let now = Utc::now();
        for source in sources {
            if !is_due(source.last_fetched_at, source.fetch_interval_minutes, now) {
                debug!("skipping source {} - not yet time to fetch", source.name);
                continue;
            }

            match self.run_source(&source).await {
                Ok(accepted) => {
                    info!("imported {} articles from {}", accepted, source.name);
                }
                Err(e) => {
                    error!("failed to fetch source {}: {}", source.name, e);
                }
            }
        }

        info!("completed fetch cycle");
    }

    /// Fetch a single source on demand, ignoring its interval gate. Unlike
    /// [`run_all_due`](Self::run_all_due) this propagates failures so a
    /// manual trigger can report them.
    pub async fn run_one(&self, source_id: i64) -> Result<usize> {
        let source = self
            .sources
            .by_id(source_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| Error::NotFound(format!("source {}", source_id)))?;

        self.run_source(&source).await
    }

    async fn run_source(&self, source: &Source) -> Result<usize> {
        info!("fetching news from source: {}", source.name);

        let candidates = self.dispatcher.fetch(source).await?;
        let accepted = self.importer.import(candidates).await?;

        self.sources
            .update_last_fetched(source.id, Utc::now())
            .await?;

        Ok(accepted)
    }
}

/// A source with no prior fetch is always due; otherwise it is due once the
/// configured number of minutes has elapsed.
pub fn is_due(
    last_fetched_at: Option<DateTime<Utc>>,
    interval_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    match last_fetched_at {
        None => true,
        Some(last) => (now - last).num_minutes() >= interval_minutes,
    }
}
