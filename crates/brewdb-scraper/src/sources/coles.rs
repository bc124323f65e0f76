//! Liquorland and First Choice Liquor: the shared retail-platform product API.
//!
//! Listing: `GET {url}&page={n}` returning `{ products, meta }`. Detail:
//! `GET {endpoint}/{id}?catalogue=1` returning `{ product }`, where
//! `endpoint` is the listing URL without its query string.

use async_trait::async_trait;
use brewdb_core::SourceId;
use futures::stream::{self, StreamExt};
use reqwest::Url;

use crate::error::ScraperError;
use crate::normalize::clean_coles_id;
use crate::pagination::{api_next_page, page_total, PageCap, PageDecision};
use crate::progress::Tally;
use crate::transport::{extract_origin, json_api_headers, FetchTarget, HttpRequest, Transport};
use crate::types::{ColesDetailResponse, ColesItem, ColesListResponse, ColesProduct, RawItem};

use super::{AdapterSettings, Harvest, RunContext, SourceAdapter};

pub struct ColesAdapter {
    source: SourceId,
    listing_url: String,
    origin: String,
    detail_endpoint: Option<String>,
    transport: Transport,
    max_pages: usize,
    page_size: u32,
    detail_concurrency: usize,
    enrich_details: bool,
}

impl ColesAdapter {
    #[must_use]
    pub fn new(
        source: SourceId,
        listing_url: &str,
        transport: Transport,
        settings: &AdapterSettings,
    ) -> Self {
        Self {
            source,
            listing_url: listing_url.to_owned(),
            origin: extract_origin(listing_url),
            detail_endpoint: detail_endpoint(listing_url),
            transport,
            max_pages: settings.max_pages,
            page_size: settings.page_size,
            detail_concurrency: settings.detail_concurrency.max(1),
            enrich_details: settings.enrich_details,
        }
    }

    fn wrap(&self, product: ColesProduct) -> RawItem {
        let item = ColesItem {
            product,
            origin: self.origin.clone(),
        };
        match self.source {
            SourceId::FirstChoiceLiquor => RawItem::FirstChoiceLiquor(item),
            _ => RawItem::Liquorland(item),
        }
    }

    fn listing_request(&self, page: u32) -> HttpRequest {
        let mut request = HttpRequest::get(&self.listing_url).query("page", page);
        if self.page_size > 0 {
            request = request.query("show", self.page_size);
        }
        request.headers = json_api_headers(&self.origin);
        request
    }

    async fn crawl(
        &self,
        ctx: &RunContext,
        harvest: &mut Harvest,
        tally: &mut Tally<'_>,
    ) -> Result<(), ScraperError> {
        let cap = PageCap {
            source_id: self.source,
            max_pages: self.max_pages,
        };
        let mut page = 1u32;
        let mut cumulative = 0u64;
        let mut known_pages: Option<u32> = None;

        loop {
            cap.check(page)?;
            let request = self.listing_request(page);
            let body = self
                .transport
                .fetch(FetchTarget::Http(&request), &ctx.cancel)
                .await?;
            harvest.pages += 1;

            let listing: ColesListResponse = match serde_json::from_str(&body) {
                Ok(listing) => listing,
                Err(e) => {
                    let err = ScraperError::parse(format!("{} page {page}", self.source), e);
                    harvest.skipped_pages += 1;
                    match known_pages {
                        Some(total) if page < total => {
                            tracing::warn!(source = %self.source, page, error = %err, "skipping unreadable page");
                            page += 1;
                            continue;
                        }
                        _ => return Err(err),
                    }
                }
            };

            known_pages = page_total(listing.meta.as_ref()).or(known_pages);
            let on_page = listing.products.len();
            cumulative += on_page as u64;
            tracing::info!(
                source = %self.source,
                page,
                items = on_page,
                total_pages = known_pages,
                "page parsed"
            );

            let decision = api_next_page(page, on_page, cumulative, listing.meta.as_ref());
            self.take_page(ctx, listing.products, harvest, tally).await?;

            match decision {
                PageDecision::Stop(reason) => {
                    tracing::info!(source = %self.source, page, ?reason, "listing done");
                    return Ok(());
                }
                PageDecision::Continue if known_pages.is_some_and(|total| page >= total) => {
                    tracing::info!(source = %self.source, page, "last advertised page reached");
                    return Ok(());
                }
                PageDecision::Continue => page += 1,
            }
        }
    }

    /// Deserializes, enriches and normalizes one page of items.
    async fn take_page(
        &self,
        ctx: &RunContext,
        values: Vec<serde_json::Value>,
        harvest: &mut Harvest,
        tally: &mut Tally<'_>,
    ) -> Result<(), ScraperError> {
        let mut products = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<ColesProduct>(value) {
                Ok(product) => {
                    let known = product
                        .id
                        .as_deref()
                        .map(clean_coles_id)
                        .filter(|id| ctx.is_known(self.source, id));
                    match known {
                        Some(id) => harvest.skip_known(id),
                        None => products.push(product),
                    }
                }
                Err(e) => {
                    let err = ScraperError::parse(format!("{} product", self.source), e);
                    harvest.reject(tally, &err);
                }
            }
        }

        let (products, cancelled) = if self.enrich_details {
            self.enrich(products, ctx).await
        } else {
            (products, false)
        };

        for product in products {
            harvest.accept(self.wrap(product), tally);
        }
        if cancelled {
            return Err(ScraperError::Cancelled);
        }
        Ok(())
    }

    /// Fetches detail records with bounded concurrency, in listing order.
    /// Returns whether the run was cancelled meanwhile.
    async fn enrich(&self, products: Vec<ColesProduct>, ctx: &RunContext) -> (Vec<ColesProduct>, bool) {
        let Some(endpoint) = self.detail_endpoint.as_deref() else {
            return (products, false);
        };

        let results: Vec<(ColesProduct, Result<Option<ColesProduct>, ScraperError>)> =
            stream::iter(products)
                .map(|listing| async move {
                    let detail = self.fetch_detail(endpoint, &listing, ctx).await;
                    (listing, detail)
                })
                .buffered(self.detail_concurrency)
                .collect()
                .await;

        let mut cancelled = false;
        let merged = results
            .into_iter()
            .map(|(listing, detail)| match detail {
                Ok(Some(detail)) => merge_detail(listing, detail),
                Ok(None) => listing,
                Err(ScraperError::Cancelled) => {
                    cancelled = true;
                    listing
                }
                Err(e) => {
                    tracing::warn!(
                        source = %self.source,
                        id = listing.id.as_deref().unwrap_or_default(),
                        error = %e,
                        "detail fetch failed; keeping listing data"
                    );
                    listing
                }
            })
            .collect();
        (merged, cancelled)
    }

    async fn fetch_detail(
        &self,
        endpoint: &str,
        listing: &ColesProduct,
        ctx: &RunContext,
    ) -> Result<Option<ColesProduct>, ScraperError> {
        let Some(id) = listing.id.as_deref().map(clean_coles_id).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let mut request = HttpRequest::get(format!("{endpoint}/{id}")).query("catalogue", 1);
        request.headers = json_api_headers(&self.origin);
        let body = self
            .transport
            .fetch(FetchTarget::Http(&request), &ctx.cancel)
            .await?;
        let detail: ColesDetailResponse = serde_json::from_str(&body)
            .map_err(|e| ScraperError::parse(format!("{} product {id}", self.source), e))?;
        Ok(Some(detail.product))
    }
}

#[async_trait]
impl SourceAdapter for ColesAdapter {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn collect(&self, ctx: &RunContext) -> Harvest {
        let mut harvest = Harvest::new(self.source);
        let mut tally = Tally::new(self.source, ctx.progress.as_ref());
        if let Err(e) = self.crawl(ctx, &mut harvest, &mut tally).await {
            harvest.interrupt(e);
        }
        tally.finish();
        harvest
    }
}

/// Listing URL with query and fragment removed.
fn detail_endpoint(listing_url: &str) -> Option<String> {
    let mut url = Url::parse(listing_url).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.as_str().trim_end_matches('/').to_owned())
}

/// Detail record with listing values filling whatever the detail lacks.
fn merge_detail(listing: ColesProduct, mut detail: ColesProduct) -> ColesProduct {
    detail.id = detail.id.or(listing.id);
    detail.name = detail.name.or(listing.name);
    detail.brand = detail.brand.or(listing.brand);
    detail.description = detail.description.or(listing.description);
    detail.product_url = detail.product_url.or(listing.product_url);
    detail.image = detail.image.or(listing.image);
    if detail.images.is_empty() {
        detail.images = listing.images;
    }
    detail.price = detail.price.or(listing.price);
    detail.ratings = detail.ratings.or(listing.ratings);
    detail.unit_of_measure_label = detail.unit_of_measure_label.or(listing.unit_of_measure_label);
    detail.unit_of_measure = detail.unit_of_measure.or(listing.unit_of_measure);
    if detail.product_properties.is_empty() {
        detail.product_properties = listing.product_properties;
    }
    if detail.multi_uom_price.is_empty() {
        detail.multi_uom_price = listing.multi_uom_price;
    }
    detail
}
