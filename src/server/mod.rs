pub mod body;
pub mod middleware;
pub mod state;

pub use state::AppState;

use crate::orchestrator::ValidatedRequest;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::{Router, middleware::from_fn_with_state};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Build the front-door: validation middleware in front of the mock downstream
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(mock_operation)
        .layer(from_fn_with_state(state, middleware::validate_request))
        .layer(TraceLayer::new_for_http())
}

/// Downstream stand-in: answers with the operationId the request was routed to
async fn mock_operation(request: Request) -> (StatusCode, String) {
    match request.extensions().get::<ValidatedRequest>() {
        Some(validated) => (StatusCode::OK, validated.operation.label()),
        None => (StatusCode::OK, "unvalidated".to_string()),
    }
}

/// Start the front-door server
pub async fn start_server(addr: SocketAddr, state: AppState) -> crate::Result<()> {
    let model = state.validator.model();
    tracing::info!(
        "Serving {} {} ({} operations, base path '{}')",
        model.title(),
        model.version(),
        model.operations().len(),
        model.base_path()
    );

    let app = build_router(state);

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
