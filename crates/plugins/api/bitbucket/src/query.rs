//! Query string helpers.

use std::fmt::Display;

use url::form_urlencoded;

/// Urlencode the parameters that have a value, in the order given.
///
/// Absent parameters are left out entirely; with nothing present the result
/// is the empty string.
pub fn smart_encode<V: Display>(params: &[(&str, Option<V>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in params {
        if let Some(value) = value {
            serializer.append_pair(name, &value.to_string());
        }
    }
    serializer.finish()
}

/// Append `?query` to `url` unless `query` is empty.
pub(crate) fn with_query(mut url: String, query: &str) -> String {
    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }
    url
}
