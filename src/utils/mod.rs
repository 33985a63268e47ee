//! Utility functions shared across the application.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::collections::HashMap;

/// Looks up a header in a gateway header map, ignoring the name's case.
///
/// v1 events keep the client's casing (`Host`) while v2 events lowercase every
/// name (`host`), so exact-match lookups miss half the events.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Bytes that may not appear literally in a URI path.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A decoded path has no escapes left, so its `%` is literal.
const DECODED_PATH: &AsciiSet = &PATH.add(b'%');

/// Bytes that may not appear literally in a URI query.
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes a decoded path, such as the v1 `path` field.
#[must_use]
pub fn escape_path(path: &str) -> String {
    utf8_percent_encode(path, DECODED_PATH).to_string()
}

/// Percent-encodes what may not appear in a path received as sent by the
/// client, such as the v2 `rawPath`. Existing `%XX` escapes are kept.
#[must_use]
pub fn escape_raw_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Same as [`escape_raw_path`] for a raw query string.
#[must_use]
pub fn escape_raw_query(query: &str) -> String {
    utf8_percent_encode(query, QUERY).to_string()
}
