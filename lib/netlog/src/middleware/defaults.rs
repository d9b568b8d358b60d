//! Per-client default headers and parameters.
//!
//! Populators run on every request, so they can read values that change over
//! time (tokens, device ids, timestamps).

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderName, HeaderValue, header::CONTENT_LENGTH};
use tower::{Layer, Service};
use tracing::debug;

use crate::{Error, Method, Request, Response, Result};

/// Fills a map of names to values.
pub type Populate = Arc<dyn Fn(&mut BTreeMap<String, String>) + Send + Sync>;

/// Layer that adds default headers and parameters to every request.
///
/// Headers already present on the request are left alone. Parameters go to
/// the body of a form-encoded `POST`, and to the URL query otherwise.
///
/// ```
/// use netlog::middleware::DefaultsLayer;
///
/// let layer = DefaultsLayer::new()
///     .headers(|headers| {
///         headers.insert("x-client".to_owned(), "demo".to_owned());
///     })
///     .params(|params| {
///         params.insert("lang".to_owned(), "en".to_owned());
///     });
/// # let _ = layer;
/// ```
#[derive(Clone, Default)]
pub struct DefaultsLayer {
    headers: Option<Populate>,
    params: Option<Populate>,
}

impl std::fmt::Debug for DefaultsLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultsLayer")
            .field("headers", &self.headers.is_some())
            .field("params", &self.params.is_some())
            .finish()
    }
}

impl DefaultsLayer {
    /// Create a layer that adds nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default headers populator.
    #[must_use]
    pub fn headers(mut self, populate: impl Fn(&mut BTreeMap<String, String>) + Send + Sync + 'static) -> Self {
        self.headers = Some(Arc::new(populate));
        self
    }

    /// Set the default parameters populator.
    #[must_use]
    pub fn params(mut self, populate: impl Fn(&mut BTreeMap<String, String>) + Send + Sync + 'static) -> Self {
        self.params = Some(Arc::new(populate));
        self
    }

    pub(crate) fn with_populators(headers: Option<Populate>, params: Option<Populate>) -> Self {
        Self { headers, params }
    }
}

impl<S> Layer<S> for DefaultsLayer {
    type Service = Defaults<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Defaults {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service that adds default headers and parameters to requests.
#[derive(Clone, Debug)]
pub struct Defaults<S> {
    inner: S,
    layer: DefaultsLayer,
}

impl<S> Defaults<S> {
    fn apply(&self, request: &mut Request<Bytes>) {
        if let Some(populate) = &self.layer.headers {
            let mut headers = BTreeMap::new();
            populate(&mut headers);
            add_headers(request, headers);
        }
        if let Some(populate) = &self.layer.params {
            let mut params = BTreeMap::new();
            populate(&mut params);
            if !params.is_empty() {
                add_params(request, &params);
            }
        }
    }
}

fn add_headers(request: &mut Request<Bytes>, headers: BTreeMap<String, String>) {
    for (name, value) in headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(header), Ok(value)) => {
                if !request.headers().contains_key(&header) {
                    request.headers_mut().insert(header, value);
                }
            }
            _ => debug!(%name, "skipping invalid default header"),
        }
    }
}

fn add_params(request: &mut Request<Bytes>, params: &BTreeMap<String, String>) {
    if request.method() == Method::Post && request.is_form() {
        let body = request.body().cloned().unwrap_or_default();
        let mut encoded = String::from_utf8_lossy(&body).into_owned();
        let extra = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        if !encoded.is_empty() {
            encoded.push('&');
        }
        encoded.push_str(&extra);
        debug!(count = params.len(), "adding default params to form body");
        if request.headers().contains_key(CONTENT_LENGTH) {
            request
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
        }
        *request.body_mut() = Some(Bytes::from(encoded));
    } else {
        debug!(count = params.len(), "adding default params to query");
        request.url_mut().query_pairs_mut().extend_pairs(params);
    }
}

impl<S> Service<Request<Bytes>> for Defaults<S>
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

    fn call(&mut self, mut request: Request<Bytes>) -> Self::Future {
        self.apply(&mut request);

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}
