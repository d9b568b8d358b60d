//! Outbound half of the trace.

use std::fmt::Write as _;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::text::{decode_text, is_plaintext, join_headers, join_pairs, url_decode};
use crate::{LogLevel, MediaType, Method, Request, is_encoded};

/// Lines describing `request` at `level`, in emission order.
pub(super) fn request_lines(level: LogLevel, request: &Request<Bytes>) -> Vec<String> {
    let method = request.method();
    let body = request.body();

    let mut summary = format!("--> Request {method} {}", request.url());
    if let Some(version) = request.version() {
        let _ = write!(summary, " {version:?}");
    }
    if !level.logs_headers() {
        if let Some(body) = body {
            let _ = write!(summary, " ({}-byte body)", body.len());
        }
        return vec![summary];
    }

    let mut lines = vec![summary];
    if let Some(body) = body {
        if let Some(content_type) = request.content_type() {
            lines.push(format!("Content-Type: {content_type}"));
        }
        lines.push(format!("Content-Length: {}", body.len()));
    }
    lines.push(format!(
        "| RequestHeaders: {{{}}}",
        url_decode(&join_headers(request.headers()))
    ));
    if let Some(params) = params(request) {
        lines.push(format!("| RequestParams: {params}"));
    }
    lines.push(end_line(level, request));
    lines
}

fn params(request: &Request<Bytes>) -> Option<String> {
    match request.method() {
        Method::Get => {
            let query = request.url().query().unwrap_or_default();
            Some(format!("{{{}}}", url_decode(&join_pairs(query))))
        }
        Method::Post => Some(match request.body() {
            Some(body) if request.is_form() => {
                let encoded = String::from_utf8_lossy(body);
                format!("{{{}}}", url_decode(&join_pairs(&encoded)))
            }
            Some(body) => dump_body(request.content_type(), body),
            None => "{}".to_owned(),
        }),
        _ => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BodySummary<'a> {
    content_type: Option<&'a str>,
    content_length: usize,
    content: Value,
}

/// Best-effort JSON description of a body that is not a form.
fn dump_body(content_type: Option<&str>, body: &Bytes) -> String {
    let is_json = content_type
        .and_then(MediaType::parse)
        .is_some_and(|media| media.is_json());
    let content = is_json
        .then(|| serde_json::from_slice::<Value>(body).ok())
        .flatten()
        .or_else(|| {
            is_plaintext(body)
                .then(|| Value::String(decode_text(body, content_type).into_owned()))
        })
        .unwrap_or(Value::Null);

    let summary = BodySummary {
        content_type,
        content_length: body.len(),
        content,
    };
    serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_owned())
}

fn end_line(level: LogLevel, request: &Request<Bytes>) -> String {
    let method = request.method();
    match request.body() {
        Some(_) if is_encoded(request.headers()) && level.logs_body() => {
            format!("--> END {method} (encoded body omitted)")
        }
        Some(body) if level.logs_body() && !is_plaintext(body) => {
            format!("--> END {method} (binary {}-byte body omitted)", body.len())
        }
        Some(body) if level.logs_body() => format!("--> END {method} ({}-byte body)", body.len()),
        _ => format!("--> END {method}"),
    }
}
