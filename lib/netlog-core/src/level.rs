//! Verbosity levels for HTTP traffic logging.
//!
//! [`LogLevel`] is totally ordered: every level logs everything the previous
//! one does, plus more. [`SharedLevel`] is the handle that lets a running
//! client change its level while requests are in flight.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Error;

/// How much of each exchange gets logged.
///
/// ```
/// use netlog_core::LogLevel;
///
/// assert!(LogLevel::Body > LogLevel::Headers);
/// assert!(LogLevel::Headers.logs_headers());
/// assert!(!LogLevel::Headers.logs_body());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    /// No logs.
    #[default]
    #[display("NONE")]
    None = 0,
    /// Request and response summary lines.
    #[display("BASIC")]
    Basic = 1,
    /// Summary lines, headers and request parameters.
    #[display("HEADERS")]
    Headers = 2,
    /// Everything, including bodies.
    #[display("BODY")]
    Body = 3,
}

impl LogLevel {
    /// Returns `true` unless the level is [`LogLevel::None`].
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self > Self::None
    }

    /// Returns `true` if headers are logged at this level.
    #[must_use]
    pub fn logs_headers(self) -> bool {
        self >= Self::Headers
    }

    /// Returns `true` if bodies are logged at this level.
    #[must_use]
    pub fn logs_body(self) -> bool {
        self >= Self::Body
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Basic,
            2 => Self::Headers,
            _ => Self::Body,
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "headers" => Ok(Self::Headers),
            "body" => Ok(Self::Body),
            _ => Err(Error::InvalidLevel(value.to_string())),
        }
    }
}

/// A [`LogLevel`] shared by every clone of a logging middleware.
///
/// Reads and writes are atomic, so a level change made from any thread is
/// picked up by the next request that starts; requests already in flight
/// keep the level they started with.
#[derive(Debug, Clone, Default)]
pub struct SharedLevel {
    inner: Arc<AtomicU8>,
}

impl SharedLevel {
    /// Create a handle holding `level`.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(level as u8)),
        }
    }

    /// Current level.
    #[must_use]
    pub fn get(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// Replace the level, returning the previous one.
    pub fn set(&self, level: LogLevel) -> LogLevel {
        LogLevel::from_u8(self.inner.swap(level as u8, Ordering::AcqRel))
    }
}

impl From<LogLevel> for SharedLevel {
    fn from(level: LogLevel) -> Self {
        Self::new(level)
    }
}
