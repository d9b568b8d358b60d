//! Prelude module for convenient imports.
//!
//! ```ignore
//! use netlog::prelude::*;
//! ```

pub use crate::middleware::{Logger, LoggingLayer, TracingLogger};
pub use crate::{
    ClientConfig, ContentType, Error, HttpClient, HttpClientExt, HyperClient, LogLevel, Method,
    Request, RequestBuilder, Response, Result, SharedLevel, StatusCode, header,
};
