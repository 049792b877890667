//! Qualified-name translation between logical field names and the names
//! stored in the search index.
//!
//! Field names may contain characters that collide with reserved search-engine
//! syntax (`.` in field paths, `-`, `*`, `+`). Logical names are therefore
//! URL-encoded (form encoding, UTF-8), followed by a substitution pass over the
//! characters form encoding leaves alone: `.` → `%2E`, `-` → `%2D`, `*` → `%2A`
//! and `+` → `%20`. `:` is percent-encoded by the first pass, so prefixed names
//! like `cm:name` become `cm%3Aname`. Decoding reverses the percent-encoding.

use percent_encoding::percent_decode_str;
use url::form_urlencoded::byte_serialize;

/// Encode a logical field name into its stored form.
pub fn encode(qualified_name: &str) -> String {
    let encoded: String = byte_serialize(qualified_name.as_bytes()).collect();
    encoded
        .replace('.', "%2E")
        .replace('-', "%2D")
        .replace('*', "%2A")
        .replace('+', "%20")
}

/// Decode a stored field name back into its logical form.
pub fn decode(field_name: &str) -> String {
    let spaced = field_name.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
