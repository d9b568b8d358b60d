//! Prelude module for convenient imports.
//!
//! ```ignore
//! use netlog_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Error, HttpClient, HttpClientExt, LogLevel, Method, Request, RequestBuilder,
    Response, Result, SharedLevel,
};
