//! Inbound half of the trace.

use std::fmt::Write as _;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use super::text::{MAX_LINE_CHARS, chunk_text, display_text, is_plaintext, join_headers, url_decode};
use crate::{LogLevel, Method, Response};

/// Lines describing `response` at `level`, in emission order.
///
/// `request_url` stands in for the final URL when the transport did not
/// record one.
pub(super) fn response_lines(
    level: LogLevel,
    method: Method,
    request_url: &Url,
    response: &Response<Bytes>,
    elapsed: Duration,
) -> Vec<String> {
    let mut summary = format!("<-- {}", response.status());
    let reason = response.reason();
    if !reason.is_empty() {
        let _ = write!(summary, " {reason}");
    }
    let url = response.url().unwrap_or(request_url);
    let _ = write!(summary, " {url} ({}ms", elapsed.as_millis());
    if !level.logs_headers() {
        let size = response
            .content_length()
            .map_or_else(|| "unknown-length".to_owned(), |length| format!("{length}-byte"));
        let _ = write!(summary, ", {size} body");
    }
    summary.push(')');

    let mut lines = vec![summary];
    if !level.logs_headers() {
        return lines;
    }

    lines.push(format!(
        "| ResponseHeaders: {{{}}}",
        url_decode(&join_headers(response.headers()))
    ));

    if !level.logs_body() || !response.promises_body(method) {
        lines.push("<-- END HTTP".to_owned());
    } else if response.is_body_encoded() {
        lines.push("<-- END HTTP (encoded body omitted)".to_owned());
    } else {
        // The buffer is shared, the caller still sees every byte.
        let snapshot = response.body().clone();
        if is_plaintext(&snapshot) {
            dump_text(&mut lines, &snapshot, response.content_type());
            lines.push(format!("<-- END HTTP ({}-byte body)", snapshot.len()));
        } else {
            lines.push(format!(
                "<-- END HTTP (binary {}-byte body omitted)",
                snapshot.len()
            ));
        }
    }
    lines
}

fn dump_text(lines: &mut Vec<String>, body: &[u8], content_type: Option<&str>) {
    if body.is_empty() {
        return;
    }
    let text = display_text(body, content_type);
    for (index, chunk) in chunk_text(&text, MAX_LINE_CHARS).into_iter().enumerate() {
        if index == 0 {
            lines.push(format!("| ResponseResult: {chunk}"));
        } else {
            lines.push(chunk.to_owned());
        }
    }
}
