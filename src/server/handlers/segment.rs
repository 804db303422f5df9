use crate::{
    error::{ProxyError, Resource, Result},
    metrics,
    server::{request::ProxyRequest, state::AppState},
};
use axum::{
    body::Body,
    extract::State,
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use std::time::Instant;
use tracing::{info, warn};

use super::{SEGMENT_CONTENT_TYPE, proxy_headers};

/// Relay a segment or key from upstream without buffering the body
pub async fn serve_segment(
    State(state): State<AppState>,
    request: ProxyRequest,
) -> Result<Response> {
    let start = Instant::now();
    info!(
        "Proxying segment: {} (origin: {:?})",
        request.target, request.caller_origin
    );

    let response = match state.upstream.fetch(&request.target, &request.headers).await {
        Ok(response) => response,
        Err(e) => {
            metrics::record_upstream_error();
            metrics::record_request("segment", e.status().as_u16());
            metrics::record_duration("segment", start);
            return Err(e);
        }
    };

    let status = response.status();
    metrics::record_request("segment", status.as_u16());
    metrics::record_duration("segment", start);

    if !status.is_success() {
        return Err(ProxyError::UpstreamStatus {
            status,
            resource: Resource::Segment,
        });
    }

    let target = request.target;
    let body = Body::from_stream(
        response
            .bytes_stream()
            .inspect_err(move |e| warn!("Segment stream from {} aborted: {}", target, e)),
    );

    Ok((status, proxy_headers(SEGMENT_CONTENT_TYPE), body).into_response())
}
