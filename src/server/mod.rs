pub mod access;
pub mod handlers;
pub mod request;
pub mod state;
pub mod target_validation;

use crate::config::Config;
use crate::hls::rewriter::{MANIFEST_ENDPOINT, SEGMENT_ENDPOINT};
use axum::{Router, http::Method, middleware, routing::get};
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Build the router with all routes, the origin guard and the CORS layer.
///
/// The origin guard only wraps the proxy endpoints; the CORS layer answers
/// preflight requests before any handler runs.
pub fn build_router(config: Config) -> Router {
    let state = AppState::new(config);

    let proxy_routes = Router::new()
        .route(MANIFEST_ENDPOINT, get(handlers::manifest::serve_manifest))
        .route(SEGMENT_ENDPOINT, get(handlers::segment::serve_segment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access::origin_guard,
        ));

    let mut app = Router::new()
        .merge(proxy_routes)
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics));

    if state.config.demo_page {
        app = app.route("/", get(handlers::demo::serve_demo));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    app.layer(cors).with_state(state)
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let app = build_router(config);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
