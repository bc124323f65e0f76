use super::*;

#[test]
fn resolved_url_appends_injected_params() {
    let request = HttpRequest::get("https://www.liquorland.com.au/api/products/ll/nsw/beer?show=100")
        .query("page", 2);
    let url = request.resolved_url().unwrap();
    assert_eq!(
        url.as_str(),
        "https://www.liquorland.com.au/api/products/ll/nsw/beer?show=100&page=2"
    );
}

#[test]
fn resolved_url_replaces_existing_param() {
    let request = HttpRequest::get("https://example.com/api?page=page_number&sort=").query("page", 3);
    let url = request.resolved_url().unwrap();
    assert_eq!(url.as_str(), "https://example.com/api?sort=&page=3");
}

#[test]
fn resolved_url_without_params_is_unchanged() {
    let request = HttpRequest::get("https://example.com/api/products/1?catalogue=1");
    assert_eq!(
        request.resolved_url().unwrap().as_str(),
        "https://example.com/api/products/1?catalogue=1"
    );
}

#[test]
fn resolved_url_rejects_invalid_url() {
    let result = HttpRequest::get("not-a-url").query("page", 1).resolved_url();
    assert!(
        matches!(result, Err(ScraperError::InvalidUrl { .. })),
        "expected InvalidUrl, got: {result:?}"
    );
}

#[test]
fn extract_origin_strips_path_and_query() {
    assert_eq!(
        extract_origin("https://www.firstchoiceliquor.com.au/api/products/fc/nsw/beer?show=100"),
        "https://www.firstchoiceliquor.com.au"
    );
}

#[test]
fn extract_origin_falls_back_on_unparseable_input() {
    assert_eq!(extract_origin("beercartel.com.au/collections"), "beercartel.com.au/collections");
}

#[test]
fn resolve_url_handles_protocol_relative_links() {
    assert_eq!(
        resolve_url("https://beercartel.com.au", "//cdn.shopify.com/s/files/a.jpg").as_deref(),
        Some("https://cdn.shopify.com/s/files/a.jpg")
    );
}

#[test]
fn resolve_url_joins_site_relative_links() {
    assert_eq!(
        resolve_url("https://www.liquorland.com.au/api/x", "/beer/stone-wood-pacific-ale_123").as_deref(),
        Some("https://www.liquorland.com.au/beer/stone-wood-pacific-ale_123")
    );
}

#[test]
fn resolve_url_rejects_empty_and_non_http() {
    assert!(resolve_url("https://example.com", "  ").is_none());
    assert!(resolve_url("https://example.com", "mailto:a@b.com").is_none());
}

#[test]
fn json_api_headers_carry_referer() {
    let headers = json_api_headers("https://www.liquorland.com.au");
    assert_eq!(
        headers.get(reqwest::header::REFERER).unwrap(),
        "https://www.liquorland.com.au"
    );
    assert!(headers.contains_key(reqwest::header::ACCEPT));
}
