//! HTTP traffic logging middleware.
//!
//! [`LoggingLayer`] observes every exchange that goes through it and writes a
//! human readable trace to a [`Logger`]. How much gets written is decided by a
//! [`SharedLevel`] that can be changed at any time:
//!
//! ```text
//! --> Request GET https://api.example.com/search?q=cat HTTP/1.1
//! | RequestHeaders: {accept:application/json}
//! | RequestParams: {q:cat}
//! --> END GET
//! <-- 200 OK https://api.example.com/search?q=cat (38ms)
//! | ResponseHeaders: {content-type:application/json,content-length:11}
//! | ResponseResult: {"ok":true}
//! <-- END HTTP (11-byte body)
//! ```
//!
//! Requests and responses are never modified, and transport errors are
//! handed back to the caller unchanged after being logged.

mod request;
mod response;
mod sink;
mod text;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{Instrument, Level, span};

pub use sink::{Logger, TracingLogger};
pub use text::{
    MAX_LINE_CHARS, chunk_text, decode_text, display_text, is_plaintext, resolve_charset,
    unescape_unicode, url_decode,
};

use crate::{Error, LogLevel, Request, Response, Result, SharedLevel};

/// Layer that logs requests and responses.
///
/// Every service produced by the layer shares the layer's level, so
/// [`LoggingLayer::set_level`] reconfigures all of them at once.
///
/// # Example
///
/// ```ignore
/// use netlog::LogLevel;
/// use netlog::middleware::LoggingLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(LoggingLayer::new(LogLevel::Headers))
///     .service(client);
/// ```
#[derive(Clone, Default)]
pub struct LoggingLayer {
    level: SharedLevel,
    logger: Option<Arc<dyn Logger>>,
}

impl std::fmt::Debug for LoggingLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingLayer")
            .field("level", &self.level.get())
            .finish_non_exhaustive()
    }
}

impl LoggingLayer {
    /// Create a logging layer writing to [`TracingLogger`] at `level`.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self::with_shared_level(SharedLevel::new(level))
    }

    /// Create a logging layer driven by an existing level handle.
    #[must_use]
    pub fn with_shared_level(level: SharedLevel) -> Self {
        Self {
            level,
            logger: None,
        }
    }

    /// Send the trace to `logger` instead of [`TracingLogger`].
    #[must_use]
    pub fn logger(mut self, logger: impl Logger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Send the trace to an already shared logger.
    #[must_use]
    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level.get()
    }

    /// Change the level for the next requests, returning the previous one.
    pub fn set_level(&self, level: LogLevel) -> LogLevel {
        self.level.set(level)
    }

    /// Handle on the level shared by this layer and its services.
    #[must_use]
    pub fn shared_level(&self) -> SharedLevel {
        self.level.clone()
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level.clone(),
            logger: self
                .logger
                .clone()
                .unwrap_or_else(|| Arc::new(TracingLogger)),
        }
    }
}

/// Service that logs requests and responses.
#[derive(Clone)]
pub struct Logging<S> {
    inner: S,
    level: SharedLevel,
    logger: Arc<dyn Logger>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for Logging<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logging")
            .field("inner", &self.inner)
            .field("level", &self.level.get())
            .finish_non_exhaustive()
    }
}

impl<S> Logging<S> {
    /// Create a logging service writing to [`TracingLogger`].
    pub fn new(inner: S, level: LogLevel) -> Self {
        LoggingLayer::new(level).layer(inner)
    }
}

impl<S> Service<Request<Bytes>> for Logging<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        // Read once: a concurrent level change applies to the next request.
        let level = self.level.get();
        let mut inner = self.inner.clone();
        if !level.is_enabled() {
            return Box::pin(async move { inner.call(request).await });
        }

        let logger = Arc::clone(&self.logger);
        let method = request.method();
        let url = request.url().clone();
        let span = span!(Level::INFO, "http_request", %method, %url);

        Box::pin(
            async move {
                for line in request::request_lines(level, &request) {
                    logger.log(&line);
                }

                let start = Instant::now();
                let result = inner.call(request).await;
                let elapsed = start.elapsed();

                match &result {
                    Ok(response) => {
                        for line in response::response_lines(level, method, &url, response, elapsed)
                        {
                            logger.log(&line);
                        }
                    }
                    Err(err) => logger.log(&format!("<-- HTTP FAILED: {err}")),
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert2::{check, let_assert};
    use http::{HeaderMap, HeaderValue, Version};
    use tower::ServiceExt;

    use super::*;
    use crate::Method;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn lines(&self) -> Vec<String> {
            self.0.lock().expect("lock").clone()
        }
    }

    impl Logger for Recorder {
        fn log(&self, line: &str) {
            self.0.lock().expect("lock").push(line.to_owned());
        }
    }

    fn json_ok(_request: Request<Bytes>) -> std::future::Ready<Result<Response<Bytes>>> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("content-length", HeaderValue::from_static("11"));
        std::future::ready(Ok(Response::new(200, headers, Bytes::from_static(br#"{"ok":true}"#))
            .with_version(Version::HTTP_11)))
    }

    fn search() -> Request<Bytes> {
        let url = url::Url::parse("https://api.example.com/search?q=cat&page=2").expect("valid URL");
        Request::builder(Method::Get, url)
            .version(Version::HTTP_11)
            .header("accept", "application/json")
            .build()
    }

    fn layer(level: LogLevel, recorder: &Recorder) -> LoggingLayer {
        LoggingLayer::new(level).logger(recorder.clone())
    }

    #[tokio::test]
    async fn none_logs_nothing() {
        let recorder = Recorder::default();
        let service = layer(LogLevel::None, &recorder).layer(tower::service_fn(json_ok));

        let response = service.oneshot(search()).await.expect("response");

        check!(recorder.lines().is_empty());
        check!(response.body().as_ref() == br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn basic_logs_two_lines() {
        let recorder = Recorder::default();
        let service = layer(LogLevel::Basic, &recorder).layer(tower::service_fn(json_ok));

        service.oneshot(search()).await.expect("response");

        let lines = recorder.lines();
        check!(lines.len() == 2);
        check!(lines[0] == "--> Request GET https://api.example.com/search?q=cat&page=2 HTTP/1.1");
        check!(lines[1].starts_with("<-- 200 OK https://api.example.com/search?q=cat&page=2 ("));
        check!(lines[1].ends_with("ms, 11-byte body)"));
    }

    #[tokio::test]
    async fn body_trace() {
        let recorder = Recorder::default();
        let service = layer(LogLevel::Body, &recorder).layer(tower::service_fn(json_ok));

        let response = service.oneshot(search()).await.expect("response");

        // Elapsed time varies from run to run.
        let trace = recorder
            .lines()
            .into_iter()
            .map(|line| {
                if line.starts_with("<-- 200") {
                    if let Some((head, _)) = line.split_once(" (") {
                        return format!("{head} (<elapsed>)");
                    }
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(trace, @r#"
        --> Request GET https://api.example.com/search?q=cat&page=2 HTTP/1.1
        | RequestHeaders: {accept:application/json}
        | RequestParams: {q:cat,page:2}
        --> END GET
        <-- 200 OK https://api.example.com/search?q=cat&page=2 (<elapsed>)
        | ResponseHeaders: {content-type:application/json,content-length:11}
        | ResponseResult: {"ok":true}
        <-- END HTTP (11-byte body)
        "#);

        let body: serde_json::Value = response.json().expect("json");
        check!(body == serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn failure_is_logged_and_returned() {
        let recorder = Recorder::default();
        let service = layer(LogLevel::Body, &recorder).layer(tower::service_fn(|_request: Request<Bytes>| {
            std::future::ready(Err::<Response<Bytes>, _>(Error::connection("connection refused")))
        }));

        let result = service.oneshot(search()).await;

        let_assert!(Err(Error::Connection(message)) = result);
        check!(message == "connection refused");
        let lines = recorder.lines();
        check!(lines.iter().filter(|line| line.starts_with("<-- ")).count() == 1);
        check!(lines.last().map(String::as_str) == Some("<-- HTTP FAILED: connection error: connection refused"));
    }

    #[tokio::test]
    async fn level_change_applies_to_next_request() {
        let recorder = Recorder::default();
        let layer = layer(LogLevel::None, &recorder);
        let service = layer.layer(tower::service_fn(json_ok));

        service.clone().oneshot(search()).await.expect("response");
        check!(recorder.lines().is_empty());

        check!(layer.set_level(LogLevel::Basic) == LogLevel::None);
        service.oneshot(search()).await.expect("response");
        check!(recorder.lines().len() == 2);
    }

    #[test]
    fn default_layer_is_silent() {
        let layer = LoggingLayer::default();
        check!(layer.level() == LogLevel::None);
        check!(format!("{layer:?}").contains("None"));
    }
}
