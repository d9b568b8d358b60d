//! HTTP traffic logging middleware for tower-based clients.
//!
//! netlog sits between your code and the transport, watches every request
//! and response go by, and writes a readable trace without touching either:
//!
//! ```text
//! --> Request POST https://api.example.com/login HTTP/1.1
//! Content-Type: application/x-www-form-urlencoded
//! Content-Length: 7
//! | RequestHeaders: {content-type:application/x-www-form-urlencoded}
//! | RequestParams: {a:1,b:2}
//! --> END POST (7-byte body)
//! <-- 200 OK https://api.example.com/login (84ms)
//! | ResponseHeaders: {content-type:application/json}
//! | ResponseResult: {"token":"abc"}
//! <-- END HTTP (15-byte body)
//! ```
//!
//! How much is written depends on the [`LogLevel`], which can be changed on a
//! live client. Use the [`middleware::LoggingLayer`] on any
//! `tower::Service<Request<Bytes>>`, or the ready-made [`HyperClient`]:
//!
//! ```ignore
//! use netlog::prelude::*;
//!
//! let client = HyperClient::builder()
//!     .log_level(LogLevel::Body)
//!     .build();
//!
//! let response = client.get("https://api.example.com/users/42").await?;
//! ```

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;

// Re-export client types
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_TAG};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use netlog_core::{
    ContentType, Error, HttpClient, HttpClientExt, LogLevel, MediaType, Method, Request,
    RequestBuilder, Response, Result, SharedLevel, from_json, is_encoded, to_form, to_json,
};

// Re-export http types for status codes and headers
pub use netlog_core::{HeaderMap, StatusCode, Version, header};

// Re-export url, part of the public API
pub use url;
