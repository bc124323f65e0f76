//! Runs the enabled adapters and merges their output.
//!
//! Each source runs in its own task (or in turn, with panics caught) so a
//! panic or a hung storefront cannot take the others down. Results are merged in configured source order.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use brewdb_core::{CanonicalProduct, ProductKey, SourceId};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;

use crate::error::ScraperError;
use crate::sources::{Harvest, RunContext, SourceAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Listing read to the end without interruption.
    Ok,
    /// Interrupted or pages skipped, but products were collected.
    Partial,
    /// Nothing collected, or the browser session broke.
    Failed,
}

impl SourceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Partial => "partial",
            SourceStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a finished harvest.
#[must_use]
pub fn classify(harvest: &Harvest) -> SourceStatus {
    if matches!(harvest.interruption, Some(ScraperError::BrowserSession(_))) {
        return SourceStatus::Failed;
    }
    let clean = harvest.interruption.is_none() && harvest.skipped_pages == 0;
    if clean {
        SourceStatus::Ok
    } else if harvest.products.is_empty() {
        SourceStatus::Failed
    } else {
        SourceStatus::Partial
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: SourceId,
    pub status: SourceStatus,
    pub products: usize,
    pub dropped: usize,
    pub skipped_pages: usize,
    pub skipped_known: usize,
    pub pages: u32,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SourceSummary {
    fn from_harvest(harvest: &Harvest, elapsed: Duration) -> Self {
        Self {
            source: harvest.source,
            status: classify(harvest),
            products: harvest.products.len(),
            dropped: harvest.dropped,
            skipped_pages: harvest.skipped_pages,
            skipped_known: harvest.skipped_known,
            pages: harvest.pages,
            error: harvest.interruption.as_ref().map(ToString::to_string),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn crashed(source: SourceId, reason: String, elapsed: Duration) -> Self {
        Self {
            source,
            status: SourceStatus::Failed,
            products: 0,
            dropped: 0,
            skipped_pages: 0,
            skipped_known: 0,
            pages: 0,
            error: Some(reason),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Merged collection: earlier records first, then each source in order.
    pub products: Vec<CanonicalProduct>,
    pub sources: Vec<SourceSummary>,
    /// Products this run added to the collection.
    pub new_products: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.sources.iter().any(|s| s.status == SourceStatus::Failed)
    }

    #[must_use]
    pub fn summary(&self, source: SourceId) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.source == source)
    }
}

/// Concatenates `existing` and each batch in order, keeping the first record
/// seen for every `(source, id)`.
#[must_use]
pub fn merge<I>(existing: Vec<CanonicalProduct>, batches: I) -> Vec<CanonicalProduct>
where
    I: IntoIterator<Item = Vec<CanonicalProduct>>,
{
    let mut seen: HashSet<ProductKey> = HashSet::with_capacity(existing.len());
    let mut merged = Vec::with_capacity(existing.len());
    for product in existing.into_iter().chain(batches.into_iter().flatten()) {
        if seen.insert(product.key()) {
            merged.push(product);
        } else {
            tracing::debug!(source = %product.source, id = %product.id, "duplicate product dropped");
        }
    }
    merged
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    concurrent: bool,
    run_timeout: Option<Duration>,
}

impl Aggregator {
    /// `adapters` in configured order; that order is kept in the output.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            concurrent: true,
            run_timeout: None,
        }
    }

    #[must_use]
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Cancels every adapter once `timeout` has elapsed.
    #[must_use]
    pub fn run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Runs every adapter and merges the results after `existing`.
    pub async fn run(&self, ctx: &RunContext, existing: Vec<CanonicalProduct>) -> RunReport {
        let started_at = Utc::now();
        let cancel = ctx.cancel.child_token();
        let run_ctx = ctx.with_cancel(cancel.clone());

        let watchdog = self.run_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(timeout) => {
                        tracing::warn!(timeout_secs = timeout.as_secs(), "run timeout reached; cancelling sources");
                        cancel.cancel();
                    }
                }
            })
        });

        let outcomes = if self.concurrent {
            self.run_concurrent(&run_ctx).await
        } else {
            self.run_sequential(&run_ctx).await
        };

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let existing_len = existing.len();
        let mut summaries = Vec::with_capacity(outcomes.len());
        let mut batches = Vec::with_capacity(outcomes.len());
        for (summary, products) in outcomes {
            tracing::info!(
                source = %summary.source,
                status = %summary.status,
                products = summary.products,
                dropped = summary.dropped,
                skipped_pages = summary.skipped_pages,
                elapsed_ms = summary.elapsed_ms,
                "source finished"
            );
            summaries.push(summary);
            batches.push(products);
        }

        let products = merge(existing, batches);
        let new_products = products.len().saturating_sub(existing_len);
        RunReport {
            products,
            sources: summaries,
            new_products,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn run_concurrent(&self, ctx: &RunContext) -> Vec<(SourceSummary, Vec<CanonicalProduct>)> {
        let handles: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let ctx = ctx.clone();
                let source = adapter.source();
                let started = Instant::now();
                let handle = tokio::spawn(async move { adapter.collect(&ctx).await });
                (source, started, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (source, started, handle) in handles {
            let outcome = match handle.await {
                Ok(harvest) => finish(harvest, started.elapsed()),
                Err(e) => {
                    tracing::error!(source = %source, error = %e, "source task crashed");
                    (
                        SourceSummary::crashed(source, format!("task failed: {e}"), started.elapsed()),
                        Vec::new(),
                    )
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn run_sequential(&self, ctx: &RunContext) -> Vec<(SourceSummary, Vec<CanonicalProduct>)> {
        let mut outcomes = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let started = Instant::now();
            let outcome = match AssertUnwindSafe(adapter.collect(ctx)).catch_unwind().await {
                Ok(harvest) => finish(harvest, started.elapsed()),
                Err(_) => {
                    let source = adapter.source();
                    tracing::error!(source = %source, "source panicked");
                    (
                        SourceSummary::crashed(source, "task panicked".to_owned(), started.elapsed()),
                        Vec::new(),
                    )
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn finish(harvest: Harvest, elapsed: Duration) -> (SourceSummary, Vec<CanonicalProduct>) {
    let summary = SourceSummary::from_harvest(&harvest, elapsed);
    (summary, harvest.products)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(source: SourceId, id: &str, name: &str) -> CanonicalProduct {
        CanonicalProduct {
            source,
            id: id.to_owned(),
            name: name.to_owned(),
            brand: String::new(),
            description: String::new(),
            price: None,
            member_price: None,
            discount: None,
            unit_price: None,
            volume_ml: None,
            unit: None,
            rating_average: None,
            rating_total: None,
            image_urls: Vec::new(),
            product_url: format!("https://example.com/{id}"),
            variants: Vec::new(),
        }
    }

    fn harvest(products: Vec<CanonicalProduct>, interruption: Option<ScraperError>) -> Harvest {
        let mut h = Harvest::new(SourceId::Liquorland);
        h.products = products;
        h.interruption = interruption;
        h
    }

    #[test]
    fn merge_keeps_source_order_and_first_duplicate() {
        let merged = merge(
            vec![product(SourceId::Liquorland, "1", "old")],
            vec![
                vec![product(SourceId::BeerCartel, "1", "bc")],
                vec![
                    product(SourceId::Liquorland, "1", "new"),
                    product(SourceId::Liquorland, "2", "two"),
                ],
            ],
        );
        let names: Vec<_> = merged.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["old", "bc", "two"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![
            product(SourceId::FirstChoiceLiquor, "9", "a"),
            product(SourceId::FirstChoiceLiquor, "8", "b"),
        ];
        let once = merge(Vec::new(), vec![batch.clone()]);
        let twice = merge(once.clone(), vec![batch]);
        assert_eq!(once, twice);
    }

    #[test]
    fn clean_harvest_is_ok_even_when_empty() {
        assert_eq!(classify(&harvest(Vec::new(), None)), SourceStatus::Ok);
    }

    #[test]
    fn interrupted_harvest_with_products_is_partial() {
        let h = harvest(
            vec![product(SourceId::Liquorland, "1", "a")],
            Some(ScraperError::PaginationLimitExceeded {
                source_id: SourceId::Liquorland,
                max_pages: 2,
            }),
        );
        assert_eq!(classify(&h), SourceStatus::Partial);
    }

    #[test]
    fn interrupted_harvest_without_products_is_failed() {
        let h = harvest(Vec::new(), Some(ScraperError::Cancelled));
        assert_eq!(classify(&h), SourceStatus::Failed);
    }

    #[test]
    fn skipped_pages_downgrade_to_partial() {
        let mut h = harvest(vec![product(SourceId::Liquorland, "1", "a")], None);
        h.skipped_pages = 1;
        assert_eq!(classify(&h), SourceStatus::Partial);
    }

    #[test]
    fn browser_session_error_is_failed_regardless_of_products() {
        let h = harvest(
            vec![product(SourceId::BeerCartel, "1", "a")],
            Some(ScraperError::BrowserSession("crashed".to_owned())),
        );
        assert_eq!(classify(&h), SourceStatus::Failed);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
