//! Paced Alpha Vantage transport with a single fallback host.

use std::fmt::{Debug, Formatter};
use std::io;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use time::UtcOffset;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::body::ResponseBody;
use crate::decoder::{self, CsvRecord};
use crate::detect;
use crate::error::{DecodeError, Error};
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::pacer::Pacer;
use crate::query::Query;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
pub const QUERY_PATH: &str = "/query";
const REDACTED: &str = "REDACTED";

/// Alpha Vantage client.
///
/// Every call waits for one pacer permit, sends a GET to the primary host,
/// and when the executor fails retries once against the fallback host if one
/// is configured. Clones share the pacer and the HTTP executor.
#[derive(Clone)]
pub struct Client {
    http: Arc<dyn HttpClient>,
    api_key: String,
    pacer: Pacer,
    base_url: String,
    fallback_url: Option<String>,
    timeout_ms: Option<u64>,
}

impl Client {
    /// Client against the public host with no rate limit.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_url(&self) -> Option<&str> {
        self.fallback_url.as_deref()
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Sends `query` and returns the body without inspecting it.
    ///
    /// Steps: validate, wait for a pacer permit, send to the primary host,
    /// fall back once when the executor fails. The body comes back whatever
    /// the HTTP status; a non-2xx status is only logged.
    pub async fn execute_raw<Q>(&self, token: &CancellationToken, query: &Q) -> Result<ResponseBody, Error>
    where
        Q: Query + ?Sized,
    {
        query.validate()?;
        self.pacer.wait(token).await?;

        let function = query.function_name();
        let encoded = self.encoded_query(query);
        let primary = request_url(&self.base_url, &encoded);
        debug!(function, url = %redact(&primary), "sending request");

        let response = match self.send(token, primary).await {
            Ok(response) => response,
            Err(error) => match &self.fallback_url {
                Some(fallback) if !error.is_cancelled() => {
                    warn!(function, error = %error, fallback = %fallback, "primary host failed, retrying fallback host");
                    self.send(token, request_url(fallback, &encoded)).await?
                }
                _ => return Err(error.into()),
            },
        };

        if !response.is_success() {
            warn!(function, status = response.status, "non-success HTTP status");
        }
        Ok(response.body.with_cancellation(token.clone()))
    }

    /// [`Client::execute_raw`] followed by in-band error detection.
    pub async fn execute<Q>(&self, token: &CancellationToken, query: &Q) -> Result<ResponseBody, Error>
    where
        Q: Query + ?Sized,
    {
        let body = self.execute_raw(token, query).await?;
        detect::detect(body).await
    }

    pub async fn json<T, Q>(&self, token: &CancellationToken, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Query + ?Sized,
    {
        let bytes = self.execute(token, query).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn json_value<Q>(&self, token: &CancellationToken, query: &Q) -> Result<serde_json::Value, Error>
    where
        Q: Query + ?Sized,
    {
        self.json(token, query).await
    }

    /// Reads the whole CSV response and decodes every row.
    pub async fn collect_csv<T, Q>(
        &self,
        token: &CancellationToken,
        query: &Q,
        offset: Option<UtcOffset>,
    ) -> Result<Vec<T>, Error>
    where
        T: CsvRecord,
        Q: Query + ?Sized,
    {
        let bytes = self.execute(token, query).await?.bytes().await?;
        Ok(decoder::collect(&bytes[..], offset)?)
    }

    /// Decodes CSV rows as they arrive, on a blocking thread.
    ///
    /// `on_row` sees every row result in server order and may stop early.
    /// Returns the number of rows handed to `on_row`.
    pub async fn csv_rows<T, Q, F>(
        &self,
        token: &CancellationToken,
        query: &Q,
        offset: Option<UtcOffset>,
        mut on_row: F,
    ) -> Result<u64, Error>
    where
        T: CsvRecord + 'static,
        Q: Query + ?Sized,
        F: FnMut(Result<T, DecodeError>) -> ControlFlow<()> + Send + 'static,
    {
        let reader = self.execute(token, query).await?.into_blocking_reader();
        let decoded = tokio::task::spawn_blocking(move || -> Result<u64, DecodeError> {
            let mut rows = 0;
            for row in decoder::records::<T, _>(reader, offset)? {
                rows += 1;
                if on_row(row).is_break() {
                    break;
                }
            }
            Ok(rows)
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?;

        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(decoded?)
    }

    fn encoded_query<Q: Query + ?Sized>(&self, query: &Q) -> String {
        let mut encoded = query.encode();
        if !self.api_key.is_empty() && !query.values().contains_key("apikey") {
            if !encoded.is_empty() {
                encoded.push('&');
            }
            encoded.push_str("apikey=");
            encoded.push_str(&urlencoding::encode(&self.api_key));
        }
        encoded
    }

    async fn send(&self, token: &CancellationToken, url: String) -> Result<HttpResponse, HttpError> {
        let mut request = HttpRequest::get(url);
        if let Some(timeout_ms) = self.timeout_ms {
            request = request.with_timeout_ms(timeout_ms);
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(HttpError::cancelled()),
            result = self.http.execute(request) => result,
        };
        if let Err(error) = &result {
            if !error.is_cancelled() {
                debug!(error = %error, "request failed");
            }
        }
        result
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &if self.api_key.is_empty() { "" } else { REDACTED })
            .field("pacer", &self.pacer)
            .field("base_url", &self.base_url)
            .field("fallback_url", &self.fallback_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    http: Option<Arc<dyn HttpClient>>,
    api_key: String,
    pacer: Pacer,
    base_url: String,
    fallback_url: Option<String>,
    timeout_ms: Option<u64>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            http: None,
            api_key: String::new(),
            pacer: Pacer::unlimited(),
            base_url: String::from(DEFAULT_BASE_URL),
            fallback_url: None,
            timeout_ms: None,
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Replaces the reqwest executor, e.g. with a [`crate::ReplayHttpClient`].
    pub fn http_client(mut self, http: impl HttpClient + 'static) -> Self {
        self.http = Some(Arc::new(http));
        self
    }

    pub fn shared_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Shorthand for `pacer(Pacer::per_minute(n))`; `0` disables pacing.
    pub fn requests_per_minute(self, per_minute: u32) -> Self {
        self.pacer(Pacer::per_minute(per_minute))
    }

    /// Primary host. A missing scheme defaults to `https://`.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(url.as_ref());
        self
    }

    pub fn fallback_url(mut self, url: impl AsRef<str>) -> Self {
        self.fallback_url = Some(normalize_base_url(url.as_ref()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn build(self) -> Client {
        Client {
            http: self
                .http
                .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new())),
            api_key: self.api_key,
            pacer: self.pacer,
            base_url: self.base_url,
            fallback_url: self.fallback_url,
            timeout_ms: self.timeout_ms,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn request_url(base: &str, encoded: &str) -> String {
    format!("{base}{QUERY_PATH}?{encoded}")
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.contains("://") {
        url.to_owned()
    } else {
        format!("https://{url}")
    };
    url.trim_end_matches('/').to_owned()
}

/// Replaces the value of every `apikey` parameter in `url`.
pub fn redact(url: &str) -> String {
    let Some((head, query)) = url.split_once('?') else {
        return url.to_owned();
    };
    let pairs = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("apikey", _)) => format!("apikey={REDACTED}"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>();
    format!("{head}?{}", pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::http_client::HttpErrorKind;
    use crate::query::{FunctionDescriptor, ParamDescriptor, ParamKind, QueryValues, RawQuery};

    static PING: FunctionDescriptor = FunctionDescriptor {
        name: "PING",
        group: "Test",
        description: "",
        required: &[ParamDescriptor {
            name: "symbol",
            kind: ParamKind::String,
            description: "",
        }],
        optional: &[],
        csv_columns: &[],
        examples: &[],
    };

    /// Records request URLs and answers from a script of results.
    struct Scripted {
        seen: Mutex<Vec<String>>,
        answers: Mutex<Vec<Result<(u16, &'static str), HttpError>>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<(u16, &'static str), HttpError>>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                answers: Mutex::new(answers.into_iter().rev().collect()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().expect("lock").clone()
        }
    }

    impl HttpClient for Scripted {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.seen.lock().expect("lock").push(request.url);
            let answer = self
                .answers
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or(Ok((200, "")));
            Box::pin(async move {
                let (status, body) = answer?;
                Ok(HttpResponse::new(status, ResponseBody::from_bytes(body)))
            })
        }
    }

    fn ping() -> RawQuery {
        RawQuery::new(&PING, QueryValues::new()).set("symbol", "IBM")
    }

    fn client(http: Arc<Scripted>) -> ClientBuilder {
        Client::builder()
            .shared_http_client(http)
            .api_key("secret key")
            .base_url("primary.test/")
    }

    #[tokio::test]
    async fn api_key_is_appended_after_encoded_query() {
        let http = Scripted::new(vec![Ok((200, "ok"))]);
        let body = client(http.clone())
            .build()
            .execute(&CancellationToken::new(), &ping())
            .await
            .expect("execute");

        assert_eq!(body.text().await.expect("text"), "ok");
        assert_eq!(
            http.seen(),
            ["https://primary.test/query?function=PING&symbol=IBM&apikey=secret%20key"]
        );
    }

    #[tokio::test]
    async fn explicit_query_apikey_wins() {
        let http = Scripted::new(vec![Ok((200, "ok"))]);
        let query = ping().set("apikey", "override");
        client(http.clone())
            .build()
            .execute_raw(&CancellationToken::new(), &query)
            .await
            .expect("execute");

        assert_eq!(
            http.seen(),
            ["https://primary.test/query?apikey=override&function=PING&symbol=IBM"]
        );
    }

    #[tokio::test]
    async fn invalid_query_never_reaches_the_network() {
        let http = Scripted::new(vec![]);
        let query = RawQuery::new(&PING, QueryValues::new());
        let error = client(http.clone())
            .build()
            .execute(&CancellationToken::new(), &query)
            .await
            .expect_err("missing symbol");

        assert!(matches!(error, Error::Validation(_)));
        assert!(http.seen().is_empty());
    }

    #[tokio::test]
    async fn connect_failure_falls_back_once() {
        let http = Scripted::new(vec![Err(HttpError::connect("refused")), Ok((200, "ok"))]);
        client(http.clone())
            .fallback_url("http://fallback.test")
            .build()
            .execute(&CancellationToken::new(), &ping())
            .await
            .expect("fallback succeeds");

        let seen = http.seen();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].starts_with("http://fallback.test/query?"));
    }

    #[tokio::test]
    async fn fallback_failure_is_reported() {
        let http = Scripted::new(vec![
            Err(HttpError::connect("refused")),
            Err(HttpError::timeout("slow")),
        ]);
        let error = client(http.clone())
            .fallback_url("http://fallback.test")
            .build()
            .execute(&CancellationToken::new(), &ping())
            .await
            .expect_err("both hosts fail");

        assert!(matches!(error, Error::Transport(ref e) if e.kind() == HttpErrorKind::Timeout));
        assert_eq!(http.seen().len(), 2);
    }

    #[tokio::test]
    async fn error_status_returns_the_body_without_fallback() {
        let http = Scripted::new(vec![Ok((503, "busy"))]);
        let body = client(http.clone())
            .fallback_url("http://fallback.test")
            .build()
            .execute(&CancellationToken::new(), &ping())
            .await
            .expect("503 is still a response");

        assert_eq!(body.text().await.expect("text"), "busy");
        assert_eq!(http.seen().len(), 1);
    }

    #[tokio::test]
    async fn any_executor_failure_falls_back() {
        let http = Scripted::new(vec![Err(HttpError::new("unreadable recording")), Ok((200, "ok"))]);
        let body = client(http.clone())
            .fallback_url("http://fallback.test")
            .build()
            .execute(&CancellationToken::new(), &ping())
            .await
            .expect("fallback succeeds");

        assert_eq!(body.text().await.expect("text"), "ok");
        assert_eq!(http.seen().len(), 2);
    }

    #[tokio::test]
    async fn service_envelope_is_detected() {
        let http = Scripted::new(vec![Ok((200, r#"{"Note": "Thank you for using Alpha Vantage!"}"#))]);
        let error = client(http)
            .build()
            .execute(&CancellationToken::new(), &ping())
            .await
            .expect_err("note envelope");
        assert!(matches!(error, Error::Service(_)));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let http = Scripted::new(vec![]);
        let token = CancellationToken::new();
        token.cancel();

        let error = client(http.clone())
            .build()
            .execute(&token, &ping())
            .await
            .expect_err("cancelled");
        assert!(error.is_cancelled());
        assert!(http.seen().is_empty());
    }

    #[test]
    fn redact_hides_api_keys_only() {
        assert_eq!(
            redact("https://h/query?function=X&apikey=abc&symbol=IBM"),
            "https://h/query?function=X&apikey=REDACTED&symbol=IBM"
        );
        assert_eq!(redact("https://h/query"), "https://h/query");
    }

    #[test]
    fn base_urls_are_normalized() {
        assert_eq!(normalize_base_url("localhost:8080/"), "https://localhost:8080");
        assert_eq!(normalize_base_url("http://127.0.0.1:1"), "http://127.0.0.1:1");
    }

    #[test]
    fn debug_output_hides_the_key() {
        let rendered = format!("{:?}", Client::new("topsecret"));
        assert!(!rendered.contains("topsecret"));
    }
}
