//! HTTP client implementation using hyper-util.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::Instrument;
use url::Url;

use crate::middleware::{CookieLayer, CookieStore, DefaultsLayer, Logger, LoggingLayer, Populate};
use crate::{
    Error, LogLevel, Request, Response, Result, SharedLevel,
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased service for middleware composition.
///
/// This type allows storing and composing arbitrary Tower layers without
/// exposing complex generic types to users.
pub type BoxedService = BoxCloneService<Request<Bytes>, Response<Bytes>, Error>;

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Thread-safe wrapper for `BoxedService`.
///
/// This wrapper uses a Mutex to make the service Sync, which is required
/// by the `HttpClient` trait.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request<Bytes>) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(request).await })
    }
}

// ============================================================================
// Raw Client (the transport under every layer)
// ============================================================================

/// Raw HTTP client using hyper-util.
#[derive(Clone)]
struct RawHyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl RawHyperClient {
    fn new(config: &ClientConfig) -> Self {
        let connector = https_connector(config.connect_timeout);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self {
            inner,
            timeout: config.timeout,
        }
    }

    /// Build a hyper request from a netlog request.
    ///
    /// The protocol version is negotiated by the connection, not taken from
    /// the request.
    fn build_hyper_request(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str())
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let url = request.url().clone();
        let hyper_request = Self::build_hyper_request(request)?;

        let response = tokio::time::timeout(self.timeout, self.inner.request(hyper_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::new(parts.status.as_u16(), parts.headers, body)
            .with_url(url)
            .with_version(parts.version))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Service<Request<Bytes>> for RawHyperClient {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

// ============================================================================
// Public Client
// ============================================================================

/// HTTP client using hyper-util with connection pooling, TLS, traffic
/// logging, and middleware support.
///
/// Every client carries a [`LoggingLayer`] whose level starts at
/// [`ClientConfig::log_level`] and can be changed while the client is in use.
///
/// # Example
///
/// ```ignore
/// use netlog::{HyperClient, HttpClientExt, LogLevel};
///
/// let client = HyperClient::builder()
///     .base_url("https://api.example.com/".parse()?)
///     .log_level(LogLevel::Body)
///     .build();
///
/// let response = client.get(client.url("users/42")?.as_str()).await?;
///
/// // Quieter from now on
/// client.set_log_level(LogLevel::Basic);
/// ```
#[derive(Clone)]
pub struct HyperClient {
    service: SyncService,
    config: ClientConfig,
    level: SharedLevel,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .field("log_level", &self.level.get())
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration and no extra middleware.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        HyperClientBuilder {
            config: config.into(),
            ..HyperClientBuilder::default()
        }
        .build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Name of this client.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.config.tag
    }

    /// Base URL, if any.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.config.base_url.as_ref()
    }

    /// Resolve `path` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not a valid URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.config.url(path)
    }

    /// Current traffic logging level.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.level.get()
    }

    /// Change the traffic logging level, returning the previous one.
    ///
    /// Requests already in flight keep the level they started with.
    pub fn set_log_level(&self, level: LogLevel) -> LogLevel {
        self.level.set(level)
    }

    /// Handle on the traffic logging level, shared by every clone of this client.
    #[must_use]
    pub fn shared_level(&self) -> SharedLevel {
        self.level.clone()
    }

    fn dispatch(&self, request: Request<Bytes>) -> ServiceFuture {
        let span = tracing::debug_span!("http_client", tag = %self.config.tag);
        Box::pin(self.service.call(request).instrument(span))
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl netlog_core::HttpClient for HyperClient {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.dispatch(request).await
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Request<Bytes>> for HyperClient {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // SyncService is always ready (the underlying service is polled when called)
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.dispatch(request)
    }
}

/// Builder for [`HyperClient`].
///
/// The assembled stack, from the caller down to the network:
///
/// 1. layers added with [`HyperClientBuilder::layer`], first added outermost;
/// 2. default headers and parameters;
/// 3. traffic logging;
/// 4. cookies;
/// 5. the hyper transport.
///
/// # Example
///
/// ```ignore
/// use netlog::{HyperClient, LogLevel};
/// use std::time::Duration;
///
/// let client = HyperClient::builder()
///     .timeout(Duration::from_secs(30))
///     .log_level(LogLevel::Headers)
///     .default_headers(|headers| {
///         headers.insert("x-app-version".to_owned(), "1.4.2".to_owned());
///     })
///     .build();
/// ```
#[derive(Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
    logger: Option<Arc<dyn Logger>>,
    default_headers: Option<Populate>,
    default_params: Option<Populate>,
    cookie_store: Option<Arc<dyn CookieStore>>,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .field("custom_logger", &self.logger.is_some())
            .field("cookies", &self.cookie_store.is_some())
            .finish_non_exhaustive()
    }
}

impl HyperClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the request timeout (applied at the connection level, not middleware).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the base URL used by [`HyperClient::url`].
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.config = self.config.base_url(url);
        self
    }

    /// Name this client.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config = self.config.tag(tag);
        self
    }

    // ========================================================================
    // Traffic Logging
    // ========================================================================

    /// Set the initial traffic logging level.
    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config = self.config.log_level(level);
        self
    }

    /// Send the traffic trace to `logger` instead of `tracing`.
    #[must_use]
    pub fn logger(mut self, logger: impl Logger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    // ========================================================================
    // Companion Middleware
    // ========================================================================

    /// Add headers to every request that does not already carry them.
    #[must_use]
    pub fn default_headers(
        mut self,
        populate: impl Fn(&mut std::collections::BTreeMap<String, String>) + Send + Sync + 'static,
    ) -> Self {
        self.default_headers = Some(Arc::new(populate));
        self
    }

    /// Add parameters to every request: to the body of form-encoded `POST`s,
    /// to the URL query otherwise.
    #[must_use]
    pub fn default_params(
        mut self,
        populate: impl Fn(&mut std::collections::BTreeMap<String, String>) + Send + Sync + 'static,
    ) -> Self {
        self.default_params = Some(Arc::new(populate));
        self
    }

    /// Persist cookies in `store`.
    #[must_use]
    pub fn cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    // ========================================================================
    // Generic Middleware API
    // ========================================================================

    /// Add a Tower layer to the client.
    ///
    /// Layers are applied in order: first added = outermost (processes requests first).
    /// All of them sit above traffic logging.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use netlog::HyperClient;
    /// use tower::limit::ConcurrencyLimitLayer;
    ///
    /// let client = HyperClient::builder()
    ///     .layer(ConcurrencyLimitLayer::new(8))
    ///     .build();
    /// ```
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config.build();
        let level = SharedLevel::new(config.log_level);

        let mut service: BoxedService = BoxCloneService::new(RawHyperClient::new(&config));

        if let Some(store) = self.cookie_store {
            service = BoxCloneService::new(CookieLayer::shared(store).layer(service));
        }

        let mut logging = LoggingLayer::with_shared_level(level.clone());
        if let Some(logger) = self.logger {
            logging = logging.shared_logger(logger);
        }
        service = BoxCloneService::new(logging.layer(service));

        if self.default_headers.is_some() || self.default_params.is_some() {
            let defaults = DefaultsLayer::with_populators(self.default_headers, self.default_params);
            service = BoxCloneService::new(defaults.layer(service));
        }

        // Wrap from the innermost: the first layer added ends up outermost
        for layer_fn in self.layers.iter().rev() {
            service = layer_fn(service);
        }

        HyperClient {
            service: SyncService::new(service),
            config,
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn client_default() {
        let client = HyperClient::new();
        check!(client.config().timeout == Duration::from_secs(30));
        check!(client.tag() == "default");
        check!(client.log_level() == LogLevel::None);
    }

    #[test]
    fn client_builder() {
        let client = HyperClient::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .tag("search")
            .log_level(LogLevel::Basic)
            .build();

        check!(client.config().timeout == Duration::from_secs(60));
        check!(client.config().pool_idle_per_host == 16);
        check!(client.tag() == "search");
        check!(client.log_level() == LogLevel::Basic);
    }

    #[test]
    fn level_is_shared_by_clones() {
        let client = HyperClient::new();
        let cloned = client.clone();

        check!(client.set_log_level(LogLevel::Body) == LogLevel::None);
        check!(cloned.log_level() == LogLevel::Body);
        check!(client.shared_level().get() == LogLevel::Body);
    }

    #[test]
    fn resolves_against_base_url() {
        let client = HyperClient::builder()
            .base_url(Url::parse("https://api.example.com/v2/").expect("valid URL"))
            .build();

        check!(client.base_url().map(Url::as_str) == Some("https://api.example.com/v2/"));
        check!(client.url("users").expect("url").as_str() == "https://api.example.com/v2/users");
    }

    #[test]
    fn client_is_debug() {
        let client = HyperClient::new();
        let debug = format!("{client:?}");
        check!(debug.contains("HyperClient"));
        check!(debug.contains("log_level"));
    }
}
