//! Destinations for trace lines.

/// Receives the formatted trace, one line at a time, in call order.
///
/// Any `Fn(&str)` closure is a logger:
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use netlog::middleware::LoggingLayer;
///
/// let lines = Arc::new(Mutex::new(Vec::<String>::new()));
/// let sink = Arc::clone(&lines);
/// let layer = LoggingLayer::default().logger(move |line: &str| {
///     sink.lock().expect("lock").push(line.to_owned());
/// });
/// # let _ = layer;
/// ```
pub trait Logger: Send + Sync + 'static {
    /// Emit a single line.
    fn log(&self, line: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn log(&self, line: &str) {
        self(line);
    }
}

/// Emits every line as an `INFO` event on the `netlog::http` target.
///
/// Lines are recorded inside the `http_request` span opened by the
/// middleware, so subscribers see the method and URL as span fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, line: &str) {
        tracing::info!(target: "netlog::http", "{line}");
    }
}
