use axum::{
    extract::FromRequestParts,
    http::{header::ORIGIN, request::Parts},
};
use std::borrow::Cow;
use url::{Url, form_urlencoded};

use super::{state::AppState, target_validation::validate_target};
use crate::{
    error::ProxyError,
    headers::{self, ForwardHeaders, HEADERS_PARAM, URL_PARAM},
};

/// First `url` and first `headers` value of a query string; later repeats
/// and unknown keys are ignored.
#[derive(Debug, Default)]
struct ProxyParams<'q> {
    url: Option<Cow<'q, str>>,
    headers: Option<Cow<'q, str>>,
}

impl<'q> ProxyParams<'q> {
    fn parse(query: &'q str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                URL_PARAM if params.url.is_none() => params.url = Some(value),
                HEADERS_PARAM if params.headers.is_none() => params.headers = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// One inbound proxy request: what to fetch, and with which headers.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub target: Url,
    pub headers: ForwardHeaders,
    /// `Origin` of the caller, empty when absent
    pub caller_origin: String,
}

impl FromRequestParts<AppState> for ProxyRequest {
    type Rejection = ProxyError;

    /// A missing or empty `url` is rejected before `headers` is looked at.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let params = ProxyParams::parse(parts.uri.query().unwrap_or_default());

        let raw_url = params
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ProxyError::MissingUrl)?;

        let headers = headers::decode(params.headers.as_deref(), &state.config.header_decode)?;
        let target = validate_target(&raw_url, state.config.block_private_targets)?;

        let caller_origin = parts
            .headers
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(ProxyRequest {
            target,
            headers,
            caller_origin,
        })
    }
}
