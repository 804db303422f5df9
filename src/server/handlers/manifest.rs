use crate::{
    error::{ProxyError, Resource, Result},
    hls::PlaylistRewriter,
    metrics,
    server::{request::ProxyRequest, state::AppState},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::info;

use super::{MANIFEST_CONTENT_TYPE, proxy_headers};

/// Fetch an upstream playlist and serve it with every URI routed through the proxy
pub async fn serve_manifest(
    State(state): State<AppState>,
    request: ProxyRequest,
) -> Result<Response> {
    let start = Instant::now();
    info!(
        "Proxying manifest: {} (origin: {:?})",
        request.target, request.caller_origin
    );

    let result = rewrite_manifest(&state, &request).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    metrics::record_request("manifest", status.as_u16());
    metrics::record_duration("manifest", start);

    let playlist = result?;
    Ok((StatusCode::OK, proxy_headers(MANIFEST_CONTENT_TYPE), playlist).into_response())
}

/// The whole body is buffered; a playlist is either fully rewritten or not at all
async fn rewrite_manifest(state: &AppState, request: &ProxyRequest) -> Result<String> {
    let response = state
        .upstream
        .fetch(&request.target, &request.headers)
        .await
        .inspect_err(|_| metrics::record_upstream_error())?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProxyError::UpstreamStatus {
            status,
            resource: Resource::Manifest,
        });
    }

    let content = response.text().await?;

    PlaylistRewriter::new(&request.target, &request.headers)
        .with_public_base_url(state.config.public_base_url.as_deref())
        .with_tag_uris(state.config.rewrite_tag_uris)
        .rewrite(&content)
}
