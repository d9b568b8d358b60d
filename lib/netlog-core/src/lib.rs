//! Core types for the netlog HTTP traffic logging middleware.
//!
//! This crate provides the data model shared by the middleware and its
//! transports:
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - buffered HTTP response type
//! - [`LogLevel`] and [`SharedLevel`] - logging verbosity
//! - [`Error`] and [`Result`] - Error handling
//! - [`HttpClient`] - Core client trait for HTTP execution
//! - [`MediaType`] - parsed `Content-Type` values
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod client;
mod error;
mod level;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{ContentType, MediaType, from_json, to_form, to_json};
pub use client::{HttpClient, HttpClientExt};
pub use error::{Error, Result};
pub use level::{LogLevel, SharedLevel};
pub use method::Method;
pub use request::{Request, RequestBuilder, is_encoded};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, StatusCode, Version, header};
