mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::location::{GeocodeProvider, LocationResolver};

pub use state::AppState;

pub fn build_router<P: GeocodeProvider + 'static>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/api/locate", get(handlers::locate::<P>))
        .route("/api/infer", get(handlers::infer::<P>))
        .route("/api/centroid", get(handlers::centroid::<P>))
        .route("/api/centroids", get(handlers::centroids))
        .route("/api/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start<P: GeocodeProvider + 'static>(
    resolver: LocationResolver<P>,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = build_router(Arc::new(AppState::new(resolver)));
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Pinpoint server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
