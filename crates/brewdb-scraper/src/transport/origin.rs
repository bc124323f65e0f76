//! URL origin and relative-link helpers.

use reqwest::Url;

/// Extracts the scheme+host origin from a configured source URL.
///
/// Given `"https://www.liquorland.com.au/api/products/ll/nsw/beer?show=100"`,
/// returns `"https://www.liquorland.com.au"`. Product links in the API
/// payloads are site-relative and are joined onto this origin.
#[must_use]
pub fn extract_origin(url: &str) -> String {
    Url::parse(url).map_or_else(
        |e| {
            tracing::warn!(
                url,
                error = %e,
                "could not parse source url; falling back to string split for origin extraction"
            );
            url.trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Resolves a possibly relative or protocol-relative link against `base`.
///
/// `"//cdn.shopify.com/a.jpg"` becomes `"https://cdn.shopify.com/a.jpg"`,
/// `"/products/x"` is joined onto the base origin. Returns `None` for empty
/// input or links that cannot be resolved to an `http(s)` URL.
#[must_use]
pub fn resolve_url(base: &str, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    let resolved = match Url::parse(link) {
        Ok(url) => url,
        Err(_) => Url::parse(base).ok()?.join(link).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
