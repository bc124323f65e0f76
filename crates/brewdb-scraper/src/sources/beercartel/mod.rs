//! Beer Cartel: browser-rendered Shopify collection pages.
//!
//! `LoadPage → ExtractItems → (HasNextPage ? LoadPage : Done)`, one browser
//! tab for the whole run. Each listed product is optionally enriched from its
//! product page; a failed detail load keeps the listing-only data.

pub mod extract;

use std::sync::Arc;

use async_trait::async_trait;
use brewdb_core::SourceId;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::error::ScraperError;
use crate::pagination::{next_link_decision, PageCap, PageDecision};
use crate::progress::Tally;
use crate::transport::{extract_origin, resolve_url, FetchTarget, HttpRequest, Transport};
use crate::types::{BeerCartelCard, BeerCartelDetail, BeerCartelItem, RawItem};

use super::{AdapterSettings, Harvest, RunContext, SourceAdapter};

pub struct BeerCartelAdapter {
    listing_url: String,
    origin: String,
    transport: Transport,
    launcher: Arc<dyn BrowserLauncher>,
    max_pages: usize,
    enrich_details: bool,
}

impl BeerCartelAdapter {
    #[must_use]
    pub fn new(
        listing_url: &str,
        transport: Transport,
        launcher: Arc<dyn BrowserLauncher>,
        settings: &AdapterSettings,
    ) -> Self {
        Self {
            listing_url: listing_url.to_owned(),
            origin: extract_origin(listing_url),
            transport,
            launcher,
            max_pages: settings.max_pages,
            enrich_details: settings.enrich_details,
        }
    }

    /// Listing URL for 1-indexed `page`.
    fn page_url(&self, page: u32) -> Result<String, ScraperError> {
        HttpRequest::get(&self.listing_url)
            .query("page", page)
            .resolved_url()
            .map(String::from)
    }

    async fn crawl(
        &self,
        session: &dyn BrowserSession,
        ctx: &RunContext,
        harvest: &mut Harvest,
        tally: &mut Tally<'_>,
    ) -> Result<(), ScraperError> {
        let cap = PageCap {
            source_id: SourceId::BeerCartel,
            max_pages: self.max_pages,
        };
        let mut page = 1u32;

        loop {
            cap.check(page)?;
            let url = self.page_url(page)?;
            tracing::info!(source = "beercartel", page, url = %url, "loading listing page");
            let html = self
                .transport
                .fetch(FetchTarget::Navigate { session, url: &url }, &ctx.cancel)
                .await?;
            harvest.pages += 1;

            match extract::cached_products(&html, &format!("beercartel page {page}")) {
                Ok(items) => {
                    tracing::info!(source = "beercartel", page, items = items.len(), "page parsed");
                    for value in items {
                        self.process_item(session, ctx, value, harvest, tally).await?;
                    }
                }
                Err(e) => {
                    harvest.skipped_pages += 1;
                    tracing::warn!(source = "beercartel", page, error = %e, "skipping unreadable listing page");
                }
            }

            if let PageDecision::Stop(reason) = next_link_decision(&html, page) {
                tracing::info!(source = "beercartel", pages = page, ?reason, "listing done");
                return Ok(());
            }
            page += 1;
        }
    }

    async fn process_item(
        &self,
        session: &dyn BrowserSession,
        ctx: &RunContext,
        value: serde_json::Value,
        harvest: &mut Harvest,
        tally: &mut Tally<'_>,
    ) -> Result<(), ScraperError> {
        let card: BeerCartelCard = match serde_json::from_value(value) {
            Ok(card) => card,
            Err(e) => {
                harvest.reject(tally, &ScraperError::parse("beercartel product", e));
                return Ok(());
            }
        };
        if let Some(id) = card.id.as_deref() {
            if ctx.is_known(SourceId::BeerCartel, id) {
                harvest.skip_known(id);
                return Ok(());
            }
        }

        let (detail, stop) = if self.enrich_details {
            match self.fetch_detail(session, ctx, &card).await {
                Ok(detail) => (detail, None),
                Err(ScraperError::Cancelled) => {
                    (BeerCartelDetail::default(), Some(ScraperError::Cancelled))
                }
                Err(e) => {
                    tracing::warn!(
                        source = "beercartel",
                        product = card.handle.as_deref().unwrap_or_default(),
                        error = %e,
                        "detail page failed; keeping listing data"
                    );
                    (BeerCartelDetail::default(), None)
                }
            }
        } else {
            (BeerCartelDetail::default(), None)
        };

        harvest.accept(
            RawItem::BeerCartel(BeerCartelItem {
                card,
                detail,
                origin: self.origin.clone(),
            }),
            tally,
        );
        stop.map_or(Ok(()), Err)
    }

    async fn fetch_detail(
        &self,
        session: &dyn BrowserSession,
        ctx: &RunContext,
        card: &BeerCartelCard,
    ) -> Result<BeerCartelDetail, ScraperError> {
        let Some(url) = card
            .handle
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .and_then(|handle| resolve_url(&self.origin, &format!("/products/{}", handle.trim())))
        else {
            return Ok(BeerCartelDetail::default());
        };
        let html = self
            .transport
            .fetch(FetchTarget::Navigate { session, url: &url }, &ctx.cancel)
            .await?;
        Ok(extract::product_detail(&html))
    }
}

#[async_trait]
impl SourceAdapter for BeerCartelAdapter {
    fn source(&self) -> SourceId {
        SourceId::BeerCartel
    }

    async fn collect(&self, ctx: &RunContext) -> Harvest {
        let mut harvest = Harvest::new(SourceId::BeerCartel);
        let mut tally = Tally::new(SourceId::BeerCartel, ctx.progress.as_ref());

        let session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                harvest.interrupt(e);
                tally.finish();
                return harvest;
            }
        };

        if let Err(e) = self
            .crawl(session.as_ref(), ctx, &mut harvest, &mut tally)
            .await
        {
            harvest.interrupt(e);
        }

        if let Err(e) = session.close().await {
            tracing::warn!(source = "beercartel", error = %e, "browser did not close cleanly");
        }
        tally.finish();
        harvest
    }
}
