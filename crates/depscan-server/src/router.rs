//! Axum router setup for the depscan server

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;

use crate::{
    ServerState,
    handlers::{
        analyse_all, analyse_custom, analyse_graph, health_check, repository_all,
        repository_branches, repository_delete, repository_download, repository_fetch,
        repository_log, visualize_demo,
    },
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Analysis
        .route("/analyse/custom", post(analyse_custom))
        .route("/analyse/all", post(analyse_all))
        .route("/analyse/graph", get(analyse_graph))
        .route("/analyse/visualize-demo", post(visualize_demo))
        // Repositories
        .route("/repository/all", get(repository_all))
        .route("/repository/branches", get(repository_branches))
        .route("/repository/log", get(repository_log))
        .route("/repository/fetch", put(repository_fetch))
        .route("/repository/download", post(repository_download))
        .route("/repository/delete", post(repository_delete))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
