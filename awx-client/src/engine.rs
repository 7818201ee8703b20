//! HTTP request engine
//!
//! Every call against the controller goes through [`ApiClient::request`]: the
//! URL is routed, the `Authorization` header injected, GETs are retried with a
//! fixed delay, and the status code is classified against the set the caller
//! accepts. Each request observes a cancellation token both while in flight and
//! while waiting between attempts.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::codec::Record;
use crate::config::ClientConfig;
use crate::endpoint::{Dialect, EndpointRouter};
use crate::envelope::{self, Shape};
use crate::error::{ApiError, ApiResult, truncate_body};

/// Delay between retry attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts beyond the first
    pub retry_count: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Total attempts allowed for a verb; only GET is retried
    pub fn attempts_for(&self, method: &Method) -> u32 {
        if *method == Method::GET {
            1 + self.retry_count
        } else {
            1
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 0,
            delay: crate::config::DEFAULT_RETRY_DELAY,
        }
    }
}

/// A response whose status was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Client for the controller REST API
///
/// Holds one pooled HTTP client and configuration fixed at construction;
/// clones share the pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    router: EndpointRouter,
    authorization: HeaderValue,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("router", &self.router)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        config.validate()?;
        let authorization = config.credentials.authorization()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| ApiError::configuration(format!("unable to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            router: EndpointRouter::new(&config.endpoint, config.platform),
            authorization,
            retry: RetryPolicy {
                retry_count: config.retry_count,
                delay: config.retry_delay,
            },
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the retry wait, e.g. with a recording sleeper in tests
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn router(&self) -> &EndpointRouter {
        &self.router
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send a request and classify the response against `accepted`
    pub async fn request(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        accepted: &[u16],
        dialect: Dialect,
    ) -> ApiResult<Response> {
        let url = self.router.url(path, dialect);
        self.request_url(ctx, method, &url, body, accepted).await
    }

    /// Same as [`request`](Self::request) for an already resolved URL
    pub async fn request_url(
        &self,
        ctx: &CancellationToken,
        method: Method,
        url: &str,
        body: Option<&JsonValue>,
        accepted: &[u16],
    ) -> ApiResult<Response> {
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::RequestBuild {
                path: url.to_string(),
                message: e.to_string(),
            })?;
        let attempts = self.retry.attempts_for(&method);

        let mut attempt = 0;
        loop {
            attempt += 1;
            if ctx.is_cancelled() {
                return Err(cancelled(&method, url));
            }
            debug!("{} {} (attempt {}/{})", method, url, attempt, attempts);

            match self
                .attempt(ctx, &method, url, payload.as_deref(), accepted)
                .await
            {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(
                        "{} {} failed, retry {}/{} after {:?}: {}",
                        method,
                        url,
                        attempt,
                        attempts - 1,
                        self.retry.delay,
                        err
                    );
                    tokio::select! {
                        biased;
                        _ = ctx.cancelled() => return Err(cancelled(&method, url)),
                        _ = self.sleeper.sleep(self.retry.delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(
        &self,
        ctx: &CancellationToken,
        method: &Method,
        url: &str,
        payload: Option<&[u8]>,
        accepted: &[u16],
    ) -> ApiResult<Response> {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, self.authorization.clone());
        if let Some(bytes) = payload {
            builder = builder.body(bytes.to_vec());
        }

        let response = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(cancelled(method, url)),
            result = builder.send() => result.map_err(|source| ApiError::Transport {
                method: method.to_string(),
                url: url.to_string(),
                source,
            })?,
        };
        let status = response.status().as_u16();

        let body = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(cancelled(method, url)),
            result = response.bytes() => result.map_err(|source| ApiError::BodyRead {
                method: method.to_string(),
                url: url.to_string(),
                source,
            })?,
        };

        if accepted.contains(&status) {
            Ok(Response {
                status,
                body: body.to_vec(),
            })
        } else {
            Err(ApiError::UnexpectedStatus {
                method: method.to_string(),
                url: url.to_string(),
                status,
                expected: accepted.to_vec(),
                body: truncate_body(&String::from_utf8_lossy(&body)),
            })
        }
    }

    /// Send a request whose response body must be a JSON object
    pub async fn request_object(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        accepted: &[u16],
        dialect: Dialect,
    ) -> ApiResult<Record> {
        let url = self.router.url(path, dialect);
        let response = self.request_url(ctx, method, &url, body, accepted).await?;
        envelope::decode_object(&url, &response.body)
    }

    /// GET a single object
    ///
    /// Item shape: 404 means absent. Count shape: zero rows means absent, more
    /// than one is a cardinality error.
    pub async fn get_one(
        &self,
        ctx: &CancellationToken,
        path: &str,
        shape: Shape,
        dialect: Dialect,
    ) -> ApiResult<Option<Record>> {
        let url = self.router.url(path, dialect);
        match shape {
            Shape::Item => {
                let response = self
                    .request_url(ctx, Method::GET, &url, None, &[200, 404])
                    .await?;
                if response.status == 404 {
                    debug!("{} not found", url);
                    return Ok(None);
                }
                envelope::decode_object(&url, &response.body).map(Some)
            }
            Shape::Count => {
                let response = self
                    .request_url(ctx, Method::GET, &url, None, &[200])
                    .await?;
                let page = envelope::decode_list(&url, &response.body)?;
                envelope::expect_single(&url, page)
            }
        }
    }

    /// Find one object of a collection by field filters (e.g. `name=bob`)
    pub async fn lookup(
        &self,
        ctx: &CancellationToken,
        collection: &str,
        filters: &[(&str, String)],
        dialect: Dialect,
    ) -> ApiResult<Option<Record>> {
        let path = with_query(collection, filters);
        self.get_one(ctx, &path, Shape::Count, dialect).await
    }

    /// GET every row of a count-shape listing, following `next` links
    pub async fn list_all(
        &self,
        ctx: &CancellationToken,
        path: &str,
        dialect: Dialect,
    ) -> ApiResult<Vec<Record>> {
        let mut url = self.router.url(path, dialect);
        let mut visited = HashSet::new();
        let mut rows = Vec::new();
        loop {
            if !visited.insert(url.clone()) {
                return Err(ApiError::decode(
                    url,
                    "pagination links back to a page already read",
                ));
            }
            let response = self
                .request_url(ctx, Method::GET, &url, None, &[200])
                .await?;
            let mut page = envelope::decode_list(&url, &response.body)?;
            let next = page.next.take().filter(|n| !n.is_empty());
            rows.extend(envelope::records(&url, page)?);

            match next {
                Some(next) => url = self.router.resolve(&next),
                None => break,
            }
        }
        Ok(rows)
    }

    /// POST to a collection; 201 with the created object
    pub async fn create(
        &self,
        ctx: &CancellationToken,
        path: &str,
        body: &JsonValue,
        dialect: Dialect,
    ) -> ApiResult<Record> {
        self.request_object(ctx, Method::POST, path, Some(body), &[201], dialect)
            .await
    }

    /// PUT or PATCH an item; 200 with the updated object
    pub async fn update(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        body: &JsonValue,
        dialect: Dialect,
    ) -> ApiResult<Record> {
        self.request_object(ctx, method, path, Some(body), &[200], dialect)
            .await
    }

    /// DELETE an item; 202 or 204
    pub async fn delete(&self, ctx: &CancellationToken, path: &str, dialect: Dialect) -> ApiResult<()> {
        self.request(ctx, Method::DELETE, path, None, &[202, 204], dialect)
            .await
            .map(|_| ())
    }
}

fn cancelled(method: &Method, url: &str) -> ApiError {
    ApiError::Cancelled {
        method: method.to_string(),
        url: url.to_string(),
    }
}

/// Append url-encoded query parameters to a path
pub fn with_query(path: &str, filters: &[(&str, String)]) -> String {
    if filters.is_empty() {
        return path.to_string();
    }
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in filters {
        query.append_pair(key, value);
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    #[test]
    fn only_get_is_retried() {
        let policy = RetryPolicy {
            retry_count: 2,
            delay: Duration::from_secs(1),
        };
        assert_eq!(policy.attempts_for(&Method::GET), 3);
        assert_eq!(policy.attempts_for(&Method::POST), 1);
        assert_eq!(policy.attempts_for(&Method::PATCH), 1);
        assert_eq!(policy.attempts_for(&Method::DELETE), 1);
    }

    #[test]
    fn with_query_encodes_values() {
        assert_eq!(
            with_query("credentials/", &[("name", "bob smith".to_string())]),
            "credentials/?name=bob+smith"
        );
        assert_eq!(
            with_query(
                "hosts/?page_size=200",
                &[("name", "web&1".to_string()), ("inventory", "3".to_string())]
            ),
            "hosts/?page_size=200&name=web%261&inventory=3"
        );
        assert_eq!(with_query("labels/", &[]), "labels/");
    }

    #[test]
    fn new_rejects_bad_configuration() {
        let config = ClientConfig::new("not a url", Credentials::token("t"));
        assert!(matches!(
            ApiClient::new(&config),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn new_takes_retry_tuning_from_config() {
        let config = ClientConfig::new("https://awx.example.com", Credentials::token("t"))
            .with_retry(3, Duration::from_millis(250));
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.retry_policy().retry_count, 3);
        assert_eq!(client.retry_policy().delay, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let config = ClientConfig::new("https://awx.example.com", Credentials::token("t"));
        let client = ApiClient::new(&config).unwrap();
        let ctx = CancellationToken::new();
        ctx.cancel();
        let result = client
            .request(&ctx, Method::GET, "ping/", None, &[200], Dialect::Controller)
            .await;
        assert!(matches!(result, Err(ApiError::Cancelled { .. })));
    }
}
