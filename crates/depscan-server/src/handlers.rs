//! REST API handlers
//!
//! Analyses and git operations block, so every handler moves its work onto
//! the blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use depscan_analyzer::{AnalysisReport, Analyzer, AnalyzerResult, BatchOutcome, DemoSize};
use depscan_core::DependencyEdge;
use serde::{Deserialize, Serialize};

use crate::{ApiError, ServerState};

async fn blocking<T, F>(state: &ServerState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Analyzer) -> AnalyzerResult<T> + Send + 'static,
    T: Send + 'static,
{
    let analyzer = Arc::clone(&state.analyzer);
    Ok(tokio::task::spawn_blocking(move || work(&analyzer)).await??)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyseRequest {
    pub repository_path: PathBuf,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    pub repo: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct DemoQuery {
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DemoResponse {
    pub size: DemoSize,
    pub dot: String,
}

#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub repo: String,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub repository_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub strategy: String,
}

/// `POST /analyse/custom`
pub async fn analyse_custom(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AnalyseRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    tracing::info!("Repository path received: {}", request.repository_path.display());
    let report = blocking(&state, move |analyzer| {
        analyzer.analyse(&request.repository_path, request.version.as_deref())
    })
    .await?;
    Ok(Json(report))
}

/// `POST /analyse/all`
pub async fn analyse_all(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<BatchOutcome>>, ApiError> {
    tracing::info!("Analysing all repositories");
    Ok(Json(blocking(&state, |analyzer| analyzer.analyse_all()).await?))
}

/// `GET /analyse/graph?repo=&version=`
pub async fn analyse_graph(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<Vec<DependencyEdge>>, ApiError> {
    let edges = blocking(&state, move |analyzer| {
        analyzer.query(&query.repo, &query.version)
    })
    .await?;
    Ok(Json(edges))
}

/// `POST /analyse/visualize-demo?size=`
pub async fn visualize_demo(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DemoQuery>,
) -> Result<Json<DemoResponse>, ApiError> {
    let size = match query.size.as_deref() {
        Some(size) => size.parse::<DemoSize>()?,
        None => DemoSize::default(),
    };
    let dot = blocking(&state, move |analyzer| analyzer.visualize_demo(size)).await?;
    Ok(Json(DemoResponse { size, dot }))
}

/// `GET /repository/branches?repo=&version=`
pub async fn repository_branches(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RepoQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let commits = blocking(&state, move |analyzer| {
        Ok(analyzer.provider().commit_log(
            &query.repo,
            query.version.as_deref(),
            usize::MAX,
            false,
        )?)
    })
    .await?;
    Ok(Json(commits))
}

/// `GET /repository/log?repo=`
pub async fn repository_log(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RepoQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let commits = blocking(&state, move |analyzer| {
        Ok(analyzer.provider().log_all(&query.repo)?)
    })
    .await?;
    Ok(Json(commits))
}

/// `PUT /repository/fetch?repo=`: fetch every remote, then return the full log.
pub async fn repository_fetch(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RepoQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let commits = blocking(&state, move |analyzer| {
        let provider = analyzer.provider();
        provider.fetch_all(&query.repo)?;
        Ok(provider.log_all(&query.repo)?)
    })
    .await?;
    Ok(Json(commits))
}

/// `GET /repository/all`
pub async fn repository_all(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = blocking(&state, |analyzer| {
        Ok(analyzer.provider().list_local_repositories()?)
    })
    .await?;
    Ok(Json(names))
}

/// `POST /repository/download`
pub async fn repository_download(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("Downloading repository: {}", request.repository_url);
    let message = blocking(&state, move |analyzer| {
        Ok(analyzer.provider().download(&request.repository_url)?)
    })
    .await?;
    Ok(Json(MessageResponse { message }))
}

/// `POST /repository/delete`
pub async fn repository_delete(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("Deleting repository");
    let message = blocking(&state, |analyzer| Ok(analyzer.provider().delete()?)).await?;
    Ok(Json(MessageResponse { message }))
}

/// `GET /api/health`
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        strategy: state.analyzer.strategy().to_string(),
    })
}
