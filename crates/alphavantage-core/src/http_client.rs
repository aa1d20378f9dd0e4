use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;

use crate::body::ResponseBody;
use crate::client::redact;
use crate::testdata::TestdataIndex;

/// HTTP request envelope used by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub timeout_ms: Option<u64>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// HTTP response with a streamed body. Any status is a response, not an error.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn ok(body: impl Into<bytes::Bytes>) -> Self {
        Self::new(200, ResponseBody::from_bytes(body))
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Broad cause of an [`HttpError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Connect,
    Timeout,
    Body,
    Cancelled,
    Other,
}

/// The executor could not produce a response.
///
/// Every kind except [`HttpErrorKind::Cancelled`] sends the request on to the
/// fallback host when one is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Connect,
            ..Self::new(message)
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Timeout,
            ..Self::new(message)
        }
    }

    pub fn body(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Body,
            ..Self::new(message)
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: HttpErrorKind::Cancelled,
            message: String::from("request cancelled"),
        }
    }

    pub const fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == HttpErrorKind::Cancelled
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract: send one GET and hand back the streamed response.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        (**self).execute(request)
    }
}

/// Production HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("alphavantage/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url);
            if let Some(timeout_ms) = request.timeout_ms {
                builder = builder.timeout(Duration::from_millis(timeout_ms));
            }

            let response = builder.send().await.map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    HttpError::timeout(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::connect(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let stream = response
                .bytes_stream()
                .map_err(|e| HttpError::body(format!("failed to read response body: {e}")));

            Ok(HttpResponse::new(status, ResponseBody::from_stream(stream)))
        })
    }
}

/// Serves recorded bodies from a testdata directory instead of the network.
///
/// Requests are matched on their query parameters with `apikey` ignored.
/// A request with no recording fails like an unreachable host.
#[derive(Debug, Clone)]
pub struct ReplayHttpClient {
    dir: PathBuf,
    index: Arc<TestdataIndex>,
}

impl ReplayHttpClient {
    pub fn new(dir: impl Into<PathBuf>, index: TestdataIndex) -> Self {
        Self {
            dir: dir.into(),
            index: Arc::new(index),
        }
    }

    /// Loads `index.json` from `dir`.
    pub fn open(dir: &Path) -> Result<Self, crate::testdata::TestdataError> {
        let index = TestdataIndex::load(dir)?;
        Ok(Self::new(dir, index))
    }
}

impl HttpClient for ReplayHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let Some(entry) = self.index.lookup(&request.url) else {
                return Err(HttpError::new(format!(
                    "no recorded response for {}",
                    redact(&request.url)
                )));
            };
            let path = self.dir.join(&entry.path);
            let body = tokio::fs::read(&path).await.map_err(|e| {
                HttpError::new(format!(
                    "failed to read recorded body '{}': {e}",
                    path.display()
                ))
            })?;
            Ok(HttpResponse::ok(body))
        })
    }
}
