//! Page-termination decisions for the two listing styles.
//!
//! ## Rendered listings
//! Storefront collection pages link to the following page either with
//! `rel="next"` or with a plain anchor whose `href` carries `page=N+1`:
//! ```text
//! <a href="/collections/beer?page=3" rel="next">Next</a>
//! <a class="pagination__item" href="/collections/beer?page=3">3</a>
//! ```
//!
//! ## Product APIs
//! Each page carries its own metadata:
//! ```text
//! { "products": [...], "meta": { "page": { "current": 2, "total": 9 }, "totalResults": 873 } }
//! ```
//! A listing is finished on an empty page, once the cumulative item count
//! reaches `totalResults`, or once `current` reaches the page total.
//!
//! Both styles are guarded by a hard page cap.

use brewdb_core::SourceId;
use scraper::{Html, Selector};

use crate::error::ScraperError;
use crate::types::ColesMeta;

/// Why a listing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    TotalResultsReached,
    LastPage,
    NoNextLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Continue,
    Stop(StopReason),
}

/// Decides whether an API listing has another page after `page` (1-indexed).
///
/// `items_on_page` is the raw item count of the page just read (before any
/// item was dropped), `cumulative` the running total including it.
#[must_use]
pub fn api_next_page(
    page: u32,
    items_on_page: usize,
    cumulative: u64,
    meta: Option<&ColesMeta>,
) -> PageDecision {
    if items_on_page == 0 {
        return PageDecision::Stop(StopReason::EmptyPage);
    }
    if let Some(total) = meta.and_then(|m| m.total_results) {
        if cumulative >= total {
            return PageDecision::Stop(StopReason::TotalResultsReached);
        }
    }
    if let Some(total_pages) = page_total(meta) {
        if page >= total_pages {
            return PageDecision::Stop(StopReason::LastPage);
        }
    }
    PageDecision::Continue
}

/// Total page count advertised by the API, if any.
#[must_use]
pub fn page_total(meta: Option<&ColesMeta>) -> Option<u32> {
    meta.and_then(|m| m.page.as_ref()).and_then(|p| p.total)
}

/// Hard cap on the number of listing pages a source may request.
#[derive(Debug, Clone, Copy)]
pub struct PageCap {
    pub source_id: SourceId,
    pub max_pages: usize,
}

impl PageCap {
    /// # Errors
    ///
    /// Returns [`ScraperError::PaginationLimitExceeded`] if `next_page`
    /// (1-indexed) is beyond the cap.
    pub fn check(&self, next_page: u32) -> Result<(), ScraperError> {
        let within = usize::try_from(next_page).is_ok_and(|n| n <= self.max_pages);
        if within {
            Ok(())
        } else {
            Err(ScraperError::PaginationLimitExceeded {
                source_id: self.source_id,
                max_pages: self.max_pages,
            })
        }
    }
}

/// Decides whether a rendered listing continues after `current_page`.
#[must_use]
pub fn next_link_decision(html: &str, current_page: u32) -> PageDecision {
    if has_next_page(html, current_page) {
        PageDecision::Continue
    } else {
        PageDecision::Stop(StopReason::NoNextLink)
    }
}

/// Whether a rendered listing page links to page `current_page + 1`.
#[must_use]
pub fn has_next_page(html: &str, current_page: u32) -> bool {
    let doc = Html::parse_document(html);

    if let Ok(rel_next) = Selector::parse(r#"a[rel~="next"][href], link[rel~="next"][href]"#) {
        if doc.select(&rel_next).next().is_some() {
            return true;
        }
    }

    let Ok(anchors) = Selector::parse("a[href]") else {
        return false;
    };
    let wanted = current_page.saturating_add(1);
    doc.select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .any(|href| href_targets_page(href, wanted))
}

/// `true` if `href` has a `page` query parameter equal to `page`.
fn href_targets_page(href: &str, page: u32) -> bool {
    let Some((_, query)) = href.split_once('?') else {
        return false;
    };
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("page="))
        .any(|value| value.parse::<u32>().ok() == Some(page))
}
