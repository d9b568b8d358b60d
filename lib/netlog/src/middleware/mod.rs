//! Tower middleware layers for netlog.
//!
//! The centrepiece is [`LoggingLayer`], the traffic logger. The other layers
//! are the companions a configured client installs around it:
//!
//! - [`LoggingLayer`] - Writes a request/response trace to a [`Logger`]
//! - [`DefaultsLayer`] - Adds per-client default headers and parameters
//! - [`CookieLayer`] - Attaches and stores cookies through a [`CookieStore`]
//!
//! The text helpers used by the trace ([`is_plaintext`], [`url_decode`],
//! [`unescape_unicode`], ...) are exported for custom loggers.
//!
//! # Example
//!
//! ```ignore
//! use netlog::LogLevel;
//! use netlog::middleware::{LoggingLayer, ServiceBuilder};
//!
//! let service = ServiceBuilder::new()
//!     .layer(LoggingLayer::new(LogLevel::Body))
//!     .service(transport);
//! ```
//!
//! Layers added to [`crate::HyperClientBuilder`] wrap the logging layer, so
//! the trace shows requests after those layers changed them.

mod cookies;
mod defaults;
mod logging;

pub use cookies::{CookieLayer, CookieStore, Cookies, InMemoryCookieStore};
pub use defaults::{Defaults, DefaultsLayer, Populate};
pub use logging::{
    Logger, Logging, LoggingLayer, MAX_LINE_CHARS, TracingLogger, chunk_text, decode_text,
    display_text, is_plaintext, resolve_charset, unescape_unicode, url_decode,
};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
