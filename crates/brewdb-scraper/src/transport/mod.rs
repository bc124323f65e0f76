//! Retry-wrapped acquisition for both HTTP requests and browser navigations.

mod origin;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserSession;
use crate::error::{AttemptError, ScraperError};
use crate::retry::{retry_with_backoff, RetryPolicy, Sleeper, TokioSleeper};

pub use origin::{extract_origin, resolve_url};

/// An HTTP request descriptor: method, URL, headers, and query params.
///
/// Query params are appended to any query string already present in `url`,
/// which lets a configured listing URL carry fixed params (`show=100`)
/// while the adapter injects the page number.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// The final URL with injected query params. A key already present in
    /// the base URL is replaced rather than duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `url` does not parse.
    pub fn resolved_url(&self) -> Result<Url, ScraperError> {
        let mut url = Url::parse(&self.url).map_err(|e| ScraperError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if self.query.is_empty() {
            return Ok(url);
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !self.query.iter().any(|(q, _)| q == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (k, v) in kept.iter().chain(self.query.iter()) {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// What to fetch: a browser navigation or an HTTP request.
pub enum FetchTarget<'a> {
    /// Navigate the browser to `url` and return the rendered HTML.
    Navigate {
        session: &'a dyn BrowserSession,
        url: &'a str,
    },
    /// Issue the request and return the response body.
    Http(&'a HttpRequest),
}

/// Fetches pages under a [`RetryPolicy`], honoring a cancellation token.
///
/// Non-2xx responses, timeouts, network errors, and browser navigation
/// failures are all retried. Cloning is cheap; the underlying
/// `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    request_timeout_secs: u64,
}

impl Transport {
    /// Creates a transport with configured timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        request_timeout_secs: u64,
        user_agent: &str,
        policy: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            policy,
            sleeper: Arc::new(TokioSleeper),
            request_timeout_secs,
        })
    }

    /// Replaces the backoff sleeper (tests use one that records instead of waiting).
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fetches `target` with retries and returns its content: the response
    /// body for HTTP, the rendered page HTML for navigations.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Fetch`] once every attempt has failed.
    /// - [`ScraperError::Cancelled`] if `cancel` fires.
    /// - [`ScraperError::InvalidUrl`] if an HTTP request URL does not parse
    ///   (not retried).
    pub async fn fetch(
        &self,
        target: FetchTarget<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, ScraperError> {
        match target {
            FetchTarget::Navigate { session, url } => {
                retry_with_backoff(&self.policy, self.sleeper.as_ref(), cancel, url, |_| async move {
                    session.navigate(url).await?;
                    session.content().await
                })
                .await
            }
            FetchTarget::Http(request) => {
                let url = request.resolved_url()?;
                let label = url.to_string();
                retry_with_backoff(&self.policy, self.sleeper.as_ref(), cancel, &label, |_| {
                    self.send_once(request, url.clone())
                })
                .await
            }
        }
    }

    async fn send_once(&self, request: &HttpRequest, url: Url) -> Result<String, AttemptError> {
        let url_string = url.to_string();
        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| self.classify(e, &url_string))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status {
                status: status.as_u16(),
                url: url_string,
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.classify(e, &url_string))
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> AttemptError {
        if err.is_timeout() {
            AttemptError::Timeout {
                url: url.to_owned(),
                secs: self.request_timeout_secs,
            }
        } else {
            AttemptError::Http(err)
        }
    }
}

/// Headers a desktop browser sends to a storefront's JSON API.
#[must_use]
pub fn json_api_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json,text/plain;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-AU,en;q=0.9"),
    );
    headers.insert(
        reqwest::header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(reqwest::header::REFERER, value);
    }
    headers
}

#[cfg(test)]
#[path = "../transport_test.rs"]
mod tests;
