//! Cookie persistence.
//!
//! [`CookieLayer`] sits below the logging middleware, next to the transport,
//! so the trace never shows the `Cookie` header it adds.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use http::HeaderValue;
use http::header::{COOKIE, SET_COOKIE};
use tower::{Layer, Service};
use tracing::debug;

use crate::{Error, Request, Response, Result};

/// Where cookies are kept between requests, keyed by host.
pub trait CookieStore: Send + Sync + 'static {
    /// Remember `cookie` (a `Cookie` header value) for `host`.
    fn save(&self, host: &str, cookie: String);

    /// The `Cookie` header value to send to `host`, if any.
    fn load(&self, host: &str) -> Option<String>;
}

/// Process-local [`CookieStore`].
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    cookies: Mutex<HashMap<String, String>>,
}

impl InMemoryCookieStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for InMemoryCookieStore {
    fn save(&self, host: &str, cookie: String) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_owned(), cookie);
    }

    fn load(&self, host: &str) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned()
    }
}

/// Layer that attaches stored cookies to requests and stores new ones.
#[derive(Clone)]
pub struct CookieLayer {
    store: Arc<dyn CookieStore>,
}

impl std::fmt::Debug for CookieLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieLayer").finish_non_exhaustive()
    }
}

impl CookieLayer {
    /// Create a cookie layer backed by `store`.
    pub fn new(store: impl CookieStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Create a cookie layer backed by an already shared store.
    #[must_use]
    pub fn shared(store: Arc<dyn CookieStore>) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for CookieLayer {
    type Service = Cookies<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cookies {
            inner,
            store: Arc::clone(&self.store),
        }
    }
}

/// Service that attaches and stores cookies.
#[derive(Clone)]
pub struct Cookies<S> {
    inner: S,
    store: Arc<dyn CookieStore>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for Cookies<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookies")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// `name=value` parts of every `Set-Cookie` header, joined with `; `.
fn received_cookies(response: &Response<Bytes>) -> Option<String> {
    let cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>();
    (!cookies.is_empty()).then(|| cookies.join("; "))
}

impl<S> Service<Request<Bytes>> for Cookies<S>
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
        let host = request.url().host_str().unwrap_or_default().to_owned();

        if !request.headers().contains_key(COOKIE) {
            let stored = self.store.load(&host);
            if let Some(value) = stored.and_then(|cookie| HeaderValue::try_from(cookie).ok()) {
                debug!(%host, "attaching stored cookies");
                request.headers_mut().insert(COOKIE, value);
            }
        }

        let store = Arc::clone(&self.store);
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(request).await?;
            if let Some(cookies) = received_cookies(&response) {
                debug!(%host, "saving received cookies");
                store.save(&host, cookies);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use http::HeaderMap;
    use tower::ServiceExt;

    use super::*;
    use crate::Method;

    fn request(cookie: Option<&str>) -> Request<Bytes> {
        let url = url::Url::parse("https://example.com/profile").expect("valid URL");
        let builder = Request::builder(Method::Get, url);
        match cookie {
            Some(cookie) => builder.header("cookie", cookie).build(),
            None => builder.build(),
        }
    }

    /// Echoes the request `Cookie` header back as the body and sets two cookies.
    async fn echo(request: Request<Bytes>) -> Result<Response<Bytes>> {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("session=abc; Path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark"));
        let body = request.header("cookie").unwrap_or_default().to_owned();
        Ok(Response::new(200, headers, Bytes::from(body)))
    }

    #[test]
    fn store_round_trip() {
        let store = InMemoryCookieStore::new();
        check!(store.load("example.com").is_none());

        store.save("example.com", "a=1".to_owned());
        check!(store.load("example.com").as_deref() == Some("a=1"));
        check!(store.load("other.com").is_none());
    }

    #[tokio::test]
    async fn saves_then_attaches() {
        let store = Arc::new(InMemoryCookieStore::new());
        let service = CookieLayer::shared(store.clone()).layer(tower::service_fn(echo));

        let first = service.clone().oneshot(request(None)).await.expect("response");
        check!(first.body().is_empty());
        check!(store.load("example.com").as_deref() == Some("session=abc; theme=dark"));

        let second = service.oneshot(request(None)).await.expect("response");
        check!(second.body().as_ref() == b"session=abc; theme=dark");
    }

    #[tokio::test]
    async fn explicit_cookie_wins() {
        let store = Arc::new(InMemoryCookieStore::new());
        store.save("example.com", "session=old".to_owned());
        let service = CookieLayer::shared(store).layer(tower::service_fn(echo));

        let response = service.oneshot(request(Some("mine=1"))).await.expect("response");
        check!(response.body().as_ref() == b"mine=1");
    }
}
