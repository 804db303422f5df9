use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::server::handlers::CORS_HEADERS;

/// Which kind of upstream resource a failed fetch was for.
///
/// Only used to pick the plain-text body of an upstream status error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Manifest,
    Segment,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Manifest => f.write_str("the m3u8 file"),
            Resource::Segment => f.write_str("segment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("URL is required")]
    MissingUrl,

    #[error("The origin \"{0}\" is not allowed.")]
    OriginDenied(String),

    #[error("{0}")]
    BlockedTarget(String),

    #[error("Failed to fetch {resource}")]
    UpstreamStatus {
        status: StatusCode,
        resource: Resource,
    },

    #[error("{0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    InvalidTarget(String),

    #[error("{0}")]
    InvalidHeaders(String),

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl => StatusCode::BAD_REQUEST,
            ProxyError::OriginDenied(_) | ProxyError::BlockedTarget(_) => StatusCode::FORBIDDEN,
            ProxyError::UpstreamStatus { status, .. } => *status,
            ProxyError::InvalidUrl(_)
            | ProxyError::InvalidTarget(_)
            | ProxyError::InvalidHeaders(_)
            | ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ProxyError::Upstream(e) => error!("Upstream transport error: {}", e),
            ProxyError::UpstreamStatus { status, .. } => {
                warn!("Upstream responded with {}", status)
            }
            other => warn!("Rejecting request ({}): {}", status, other),
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            CORS_HEADERS,
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_is_bad_request() {
        let err = ProxyError::MissingUrl;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "URL is required");
    }

    #[test]
    fn origin_denied_names_origin() {
        let err = ProxyError::OriginDenied("https://evil.example".to_string());
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(err.to_string().contains("\"https://evil.example\""));
    }

    #[test]
    fn upstream_status_is_passed_through() {
        let err = ProxyError::UpstreamStatus {
            status: StatusCode::NOT_FOUND,
            resource: Resource::Manifest,
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Failed to fetch the m3u8 file");

        let err = ProxyError::UpstreamStatus {
            status: StatusCode::BAD_GATEWAY,
            resource: Resource::Segment,
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Failed to fetch segment");
    }

    #[test]
    fn parse_errors_are_internal() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let message = parse_err.to_string();
        let err = ProxyError::from(parse_err);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn into_response_is_plain_text() {
        let resp = ProxyError::MissingUrl.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn into_response_carries_cors_headers() {
        let resp = ProxyError::OriginDenied(String::new()).into_response();
        let headers = resp.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
    }
}
