//! Origin allow/deny guard for the proxy endpoints.
//!
//! An origin is denied only when the denylist holds the `*` wildcard and the
//! allowlist does not match it (the origin itself or `*`). Specific denylist
//! entries never deny on their own. Requests without an `Origin` header are
//! checked as `""`.

use axum::{
    extract::{Request, State},
    http::header::ORIGIN,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashSet;

use super::state::AppState;
use crate::{config::Config, error::ProxyError, metrics};

/// Matches every origin, including the empty one.
pub const WILDCARD: &str = "*";

/// Immutable origin policy built once from configuration.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    allowlist: HashSet<String>,
    denylist: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<A, D>(allowlist: A, denylist: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            allowlist: normalize(allowlist),
            denylist: normalize(denylist),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.origin_allowlist, &config.origin_denylist)
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim().to_ascii_lowercase();
        !(self.denylist.contains(WILDCARD) && !matches(&self.allowlist, &origin))
    }
}

fn normalize<I>(list: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    list.into_iter()
        .map(|s| s.as_ref().trim().to_ascii_lowercase())
        .collect()
}

fn matches(list: &HashSet<String>, origin: &str) -> bool {
    list.contains(WILDCARD) || list.contains(origin)
}

/// Axum middleware: reject requests whose `Origin` the policy denies.
pub async fn origin_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !state.access.is_allowed(origin) {
        metrics::record_origin_denied();
        return ProxyError::OriginDenied(origin.to_string()).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn empty_lists_allow_everyone() {
        let policy = AccessPolicy::default();
        assert!(policy.is_allowed(""));
        assert!(policy.is_allowed("https://anyone.example"));
    }

    #[test]
    fn wildcard_deny_without_allowlist_denies_everyone() {
        let policy = AccessPolicy::new(NONE, ["*"]);
        assert!(!policy.is_allowed(""));
        assert!(!policy.is_allowed("https://site.example"));
    }

    #[test]
    fn wildcard_deny_admits_allowlisted_origin() {
        let policy = AccessPolicy::new(["https://site.example"], ["*"]);
        assert!(policy.is_allowed("https://site.example"));
        assert!(policy.is_allowed("HTTPS://SITE.EXAMPLE"));
        assert!(!policy.is_allowed("https://other.example"));
        assert!(!policy.is_allowed(""));
    }

    #[test]
    fn allowlist_alone_does_not_restrict() {
        let policy = AccessPolicy::new(["https://site.example"], NONE);
        assert!(policy.is_allowed("https://other.example"));
    }

    #[test]
    fn specific_deny_entry_without_wildcard_allows() {
        let policy = AccessPolicy::new(NONE, ["https://evil.example"]);
        assert!(policy.is_allowed("https://evil.example"));
        assert!(policy.is_allowed("https://site.example"));
    }

    #[test]
    fn wildcard_deny_ignores_specific_entries() {
        let policy = AccessPolicy::new(["https://site.example"], ["*", "https://site.example"]);
        assert!(policy.is_allowed("https://site.example"));
        assert!(!policy.is_allowed("https://evil.example"));
    }

    #[test]
    fn wildcard_allow_overrides_any_deny() {
        let policy = AccessPolicy::new(["*"], ["*", "https://evil.example"]);
        assert!(policy.is_allowed("https://evil.example"));
        assert!(policy.is_allowed(""));
    }

    #[test]
    fn allowlisted_empty_origin() {
        let policy = AccessPolicy::new([""], ["*"]);
        assert!(policy.is_allowed(""));
        assert!(!policy.is_allowed("https://site.example"));
    }
}
