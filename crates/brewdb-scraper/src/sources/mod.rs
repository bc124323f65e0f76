//! Per-source adapters.
//!
//! Each adapter walks one storefront's listing, turns what it reads into
//! [`RawItem`]s and normalizes them as it goes. Adapters never fail as a
//! whole: whatever was gathered before an interruption is returned in the
//! [`Harvest`] together with the interrupting error.

pub mod beercartel;
pub mod coles;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use brewdb_core::{CanonicalProduct, ProductKey, SourceConfig, SourceId};
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserLauncher;
use crate::error::ScraperError;
use crate::normalize::normalize;
use crate::progress::{NoopProgress, ProgressSink, Tally};
use crate::transport::Transport;
use crate::types::RawItem;

pub use beercartel::BeerCartelAdapter;
pub use coles::ColesAdapter;

/// Shared state handed to every adapter of a run.
#[derive(Clone)]
pub struct RunContext {
    pub cancel: CancellationToken,
    pub progress: Arc<dyn ProgressSink>,
    /// Products already collected by an earlier run; adapters skip them.
    pub known: Arc<HashSet<ProductKey>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            progress: Arc::new(NoopProgress),
            known: Arc::new(HashSet::new()),
        }
    }
}

impl RunContext {
    #[must_use]
    pub fn is_known(&self, source: SourceId, id: &str) -> bool {
        !self.known.is_empty() && self.known.contains(&(source, id.to_owned()))
    }

    /// The same context with `cancel` replaced.
    #[must_use]
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }
}

/// Everything one adapter produced in a run.
#[derive(Debug)]
pub struct Harvest {
    pub source: SourceId,
    /// Normalized products in listing order.
    pub products: Vec<CanonicalProduct>,
    /// Items that could not be deserialized or normalized.
    pub dropped: usize,
    /// Listing pages fetched but not parseable.
    pub skipped_pages: usize,
    /// Items skipped because an earlier run already collected them.
    pub skipped_known: usize,
    /// Listing pages fetched.
    pub pages: u32,
    /// The error that ended the listing early, if any.
    pub interruption: Option<ScraperError>,
}

impl Harvest {
    #[must_use]
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            products: Vec::new(),
            dropped: 0,
            skipped_pages: 0,
            skipped_known: 0,
            pages: 0,
            interruption: None,
        }
    }

    /// Normalizes `raw` and keeps it, or counts it as dropped.
    pub(crate) fn accept(&mut self, raw: RawItem, tally: &mut Tally<'_>) {
        tally.bump();
        match normalize(raw) {
            Ok(product) => self.products.push(product),
            Err(e) => {
                self.dropped += 1;
                tracing::warn!(source = %self.source, error = %e, "item dropped");
            }
        }
    }

    /// Counts an item that failed before it could become a [`RawItem`].
    pub(crate) fn reject(&mut self, tally: &mut Tally<'_>, reason: &ScraperError) {
        tally.bump();
        self.dropped += 1;
        tracing::warn!(source = %self.source, error = %reason, "item dropped");
    }

    pub(crate) fn skip_known(&mut self, id: &str) {
        self.skipped_known += 1;
        tracing::debug!(source = %self.source, id, "already collected; skipping");
    }

    /// Records the error that ended the listing. The first one wins.
    pub(crate) fn interrupt(&mut self, err: ScraperError) {
        match &err {
            ScraperError::Cancelled => {
                tracing::warn!(source = %self.source, "run cancelled; keeping products gathered so far");
            }
            other => {
                tracing::error!(source = %self.source, error = %other, "source interrupted");
            }
        }
        if self.interruption.is_none() {
            self.interruption = Some(err);
        }
    }
}

/// One storefront's collection routine.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;

    /// Walks the whole listing. Never panics on bad input and always closes
    /// any resources it opened.
    async fn collect(&self, ctx: &RunContext) -> Harvest;
}

/// Knobs shared by every adapter, taken from the app config.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub max_pages: usize,
    pub page_size: u32,
    pub detail_concurrency: usize,
    /// Fetch each product's detail page or endpoint.
    pub enrich_details: bool,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            max_pages: 200,
            page_size: 100,
            detail_concurrency: 4,
            enrich_details: true,
        }
    }
}

/// Builds the adapter for a configured source.
#[must_use]
pub fn build_adapter(
    config: &SourceConfig,
    settings: &AdapterSettings,
    transport: &Transport,
    launcher: &Arc<dyn BrowserLauncher>,
) -> Arc<dyn SourceAdapter> {
    match config.source {
        SourceId::BeerCartel => Arc::new(BeerCartelAdapter::new(
            &config.url,
            transport.clone(),
            Arc::clone(launcher),
            settings,
        )),
        SourceId::Liquorland | SourceId::FirstChoiceLiquor => Arc::new(ColesAdapter::new(
            config.source,
            &config.url,
            transport.clone(),
            settings,
        )),
    }
}
