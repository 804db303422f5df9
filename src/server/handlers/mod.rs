pub mod demo;
pub mod health;
pub mod manifest;
pub mod segment;

use axum::http::{HeaderName, header};

pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Permissive CORS headers carried by every proxy endpoint response, errors included.
pub const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
];

/// Content type plus [`CORS_HEADERS`].
pub fn proxy_headers(content_type: &'static str) -> [(HeaderName, &'static str); 4] {
    let [origin, headers, methods] = CORS_HEADERS;
    [(header::CONTENT_TYPE, content_type), origin, headers, methods]
}
