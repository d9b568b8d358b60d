//! Body classification and text formatting shared by both reporters.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use http::HeaderMap;
use percent_encoding::percent_decode_str;

use crate::MediaType;

/// Longest body slice emitted on a single log line, in characters.
pub const MAX_LINE_CHARS: usize = 4000;

const PLAINTEXT_SAMPLE_BYTES: usize = 64;
const PLAINTEXT_SAMPLE_CODE_POINTS: usize = 16;

/// Returns `true` if `body` probably contains human readable text.
///
/// Decodes up to 16 code points from the first 64 bytes and rejects the body
/// as soon as one of them is a control character that is not whitespace, or
/// a UTF-8 sequence is cut off by the end of the sample. Malformed sequences
/// decode to U+FFFD, so text in other charsets still counts as text. Binary
/// formats whose header happens to be printable are misclassified as text.
///
/// ```
/// use netlog::middleware::is_plaintext;
///
/// assert!(is_plaintext(b"{\"ok\":true}\n"));
/// assert!(is_plaintext(b"caf\xe9 au lait"));
/// assert!(!is_plaintext(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
/// ```
#[must_use]
pub fn is_plaintext(body: &[u8]) -> bool {
    let mut rest = body.get(..PLAINTEXT_SAMPLE_BYTES).unwrap_or(body);
    for _ in 0..PLAINTEXT_SAMPLE_CODE_POINTS {
        if rest.is_empty() {
            break;
        }
        let Some((code_point, width)) = next_code_point(rest) else {
            return false;
        };
        if code_point.is_control() && !code_point.is_whitespace() {
            return false;
        }
        rest = rest.get(width..).unwrap_or_default();
    }
    true
}

/// Decodes the code point at the start of `bytes` and its width in bytes.
///
/// Invalid lead or continuation bytes yield U+FFFD; `None` means a valid
/// lead byte runs past the end of `bytes`.
fn next_code_point(bytes: &[u8]) -> Option<(char, usize)> {
    let &lead = bytes.first()?;
    let width = match lead {
        0x00..=0x7F => return Some((char::from(lead), 1)),
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Some((char::REPLACEMENT_CHARACTER, 1)),
    };
    let encoded = bytes.get(..width)?;
    if let Some(bad) = encoded
        .iter()
        .skip(1)
        .position(|byte| byte & 0xC0 != 0x80)
    {
        return Some((char::REPLACEMENT_CHARACTER, bad + 1));
    }
    // Overlong forms, surrogates and values above U+10FFFF.
    let code_point = std::str::from_utf8(encoded)
        .ok()
        .and_then(|decoded| decoded.chars().next())
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    Some((code_point, width))
}

/// Encoding named by the `charset` of `content_type`, UTF-8 otherwise.
#[must_use]
pub fn resolve_charset(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(MediaType::parse)
        .and_then(|media| media.charset().and_then(|label| Encoding::for_label(label.as_bytes())))
        .unwrap_or(UTF_8)
}

/// Decode `body` with the charset declared by `content_type`.
#[must_use]
pub fn decode_text<'a>(body: &'a [u8], content_type: Option<&str>) -> Cow<'a, str> {
    resolve_charset(content_type)
        .decode_without_bom_handling(body)
        .0
}

/// Decode `body` for display: charset, then percent escapes, then `\uXXXX` escapes.
#[must_use]
pub fn display_text(body: &[u8], content_type: Option<&str>) -> String {
    unescape_unicode(&url_decode(&decode_text(body, content_type)))
}

/// Percent-decode `input` without ever failing.
///
/// A `%` that does not start a two digit hex escape is kept literally, and
/// so is `+`.
///
/// ```
/// use netlog::middleware::url_decode;
///
/// assert_eq!(url_decode("a+b%20c%zz%"), "a+b c%zz%");
/// ```
#[must_use]
pub fn url_decode(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let sanitized = escape_stray_percent(input);
    percent_decode_str(&sanitized)
        .decode_utf8_lossy()
        .into_owned()
}

fn escape_stray_percent(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut escaped = String::with_capacity(input.len());
    for (index, c) in input.char_indices() {
        match c {
            '%' if !starts_hex_pair(bytes.get(index + 1..index + 3)) => escaped.push_str("%25"),
            '+' => escaped.push_str("%2B"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn starts_hex_pair(pair: Option<&[u8]>) -> bool {
    matches!(pair, Some([high, low]) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit())
}

/// Replace `\uXXXX` escapes with the characters they encode.
///
/// Consecutive escapes forming a surrogate pair become one character; a lone
/// surrogate becomes U+FFFD.
///
/// ```
/// use netlog::middleware::unescape_unicode;
///
/// assert_eq!(unescape_unicode(r"caf\u00e9 \ud83d\ude00"), "café 😀");
/// ```
#[must_use]
pub fn unescape_unicode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut units = Vec::new();
    let mut rest = input;

    while let Some(position) = rest.find("\\u") {
        let (before, escape) = rest.split_at(position);
        if !before.is_empty() {
            flush_units(&mut units, &mut out);
            out.push_str(before);
        }
        match escape.get(2..6).and_then(parse_code_unit) {
            Some(unit) => {
                units.push(unit);
                rest = escape.get(6..).unwrap_or_default();
            }
            None => {
                flush_units(&mut units, &mut out);
                out.push_str("\\u");
                rest = escape.get(2..).unwrap_or_default();
            }
        }
    }
    flush_units(&mut units, &mut out);
    out.push_str(rest);
    out
}

fn parse_code_unit(hex: &str) -> Option<u16> {
    if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        None
    }
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    out.extend(
        char::decode_utf16(units.drain(..)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

/// Split `text` into consecutive slices of at most `max_chars` characters.
///
/// Concatenating the slices gives back `text`; an empty text yields no slice.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(index, _)| index);
        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// All headers as `name:value` joined with `,`, duplicates included.
pub(super) fn join_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}:{}", String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join(",")
}

/// Raw `a=1&b=2` pairs as `a:1,b:2`, in order.
pub(super) fn join_pairs(encoded: &str) -> String {
    encoded
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            format!("{name}:{value}")
        })
        .collect::<Vec<_>>()
        .join(",")
}
