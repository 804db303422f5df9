//! Forwarded header map and its query-string encoding.
//!
//! Headers needed to re-fetch a resource travel with every rewritten URI as a
//! JSON object in the `headers` query parameter, next to the target in `url`.

use crate::config::HeaderDecodeMode;
use crate::error::{ProxyError, Result};
use std::collections::BTreeMap;
use tracing::warn;
use url::{Url, form_urlencoded};

/// Query parameter carrying the target URL.
pub const URL_PARAM: &str = "url";

/// Query parameter carrying the JSON-encoded header map.
pub const HEADERS_PARAM: &str = "headers";

/// Case-insensitive header name → value mapping forwarded to the upstream.
///
/// Names are stored lowercased, so inserting `Referer` after `referer`
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardHeaders(BTreeMap<String, String>);

impl ForwardHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON object form, before percent-encoding.
    pub fn to_json(&self) -> String {
        // A map of strings always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ForwardHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = ForwardHeaders::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

/// Percent-encode a header map for use as the `headers` parameter value.
pub fn encode(headers: &ForwardHeaders) -> String {
    form_urlencoded::byte_serialize(headers.to_json().as_bytes()).collect()
}

/// Decode an already percent-decoded `headers` parameter.
///
/// Absent or blank input is an empty map. Anything that is not a JSON
/// object of strings is an error in [`HeaderDecodeMode::Strict`] and an
/// empty map in [`HeaderDecodeMode::Lenient`].
pub fn decode(raw: Option<&str>, mode: &HeaderDecodeMode) -> Result<ForwardHeaders> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(ForwardHeaders::new());
    };

    match serde_json::from_str::<BTreeMap<String, String>>(raw) {
        Ok(map) => Ok(map.into_iter().collect()),
        Err(e) => match mode {
            HeaderDecodeMode::Strict => Err(ProxyError::InvalidHeaders(format!(
                "Invalid headers parameter: {e}"
            ))),
            HeaderDecodeMode::Lenient => {
                warn!("Ignoring malformed headers parameter: {}", e);
                Ok(ForwardHeaders::new())
            }
        },
    }
}

/// Build `url=<target>[&headers=<map>]`; the headers pair is left out when empty.
pub fn proxy_query(target: &Url, headers: &ForwardHeaders) -> String {
    let mut query = format!(
        "{URL_PARAM}={}",
        form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect::<String>()
    );
    if !headers.is_empty() {
        query.push('&');
        query.push_str(HEADERS_PARAM);
        query.push('=');
        query.push_str(&encode(headers));
    }
    query
}
