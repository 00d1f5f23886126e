//! REST API of the simulated swarm manager
//!
//! Implements the Docker Engine swarm, service, task, node and container
//! endpoints on top of a shared [`ClusterState`].

use crate::container::ProcessInstance;
use crate::error::{Result, SwarmError};
use crate::swarm::{ClusterState, Filters, Node, NodeSpec, Service, ServiceSpec, Swarm, Task};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Docker API version reported by `/version`
pub const API_VERSION: &str = "1.43";

/// Shared state of every handler
pub type ApiState = Arc<ClusterState>;

/// Swarm init request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InitRequest {
    pub listen_addr: String,
    pub advertise_addr: String,
}

/// Swarm join request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JoinRequest {
    pub listen_addr: String,
    pub advertise_addr: String,
    pub remote_addrs: Vec<String>,
    pub join_token: String,
}

/// Query of the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub filters: Option<String>,
}

impl ListQuery {
    fn filters(&self) -> Filters {
        Filters::parse(self.filters.as_deref())
    }
}

/// Version info response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VersionResponse {
    version: String,
    api_version: String,
    os: String,
    arch: String,
}

impl IntoResponse for SwarmError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        debug!("API error ({}): {}", status, self);
        (status, self.to_string()).into_response()
    }
}

/// Build the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/_ping", get(ping))
        .route("/version", get(version))
        .route("/swarm", get(inspect_swarm))
        .route("/swarm/init", post(init_swarm))
        .route("/swarm/join", post(join_swarm))
        .route("/swarm/leave", post(leave_swarm))
        .route("/services", get(list_services))
        .route("/services/create", post(create_service))
        .route("/services/{id}", get(inspect_service).delete(delete_service))
        .route("/services/{id}/update", post(update_service))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", get(inspect_task))
        .route("/nodes", get(list_nodes))
        .route("/nodes/{id}", get(inspect_node).delete(delete_node))
        .route("/nodes/{id}/update", post(update_node))
        .route("/containers/json", get(list_containers))
        .route("/containers/{id}/json", get(inspect_container))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decode a JSON body, treating an empty body as the default value
fn decode_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

async fn ping() -> &'static str {
    "OK"
}

async fn version() -> impl IntoResponse {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: API_VERSION.to_string(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    })
}

async fn init_swarm(State(state): State<ApiState>, body: Bytes) -> Result<Json<String>> {
    let req: InitRequest = decode_or_default(&body)?;
    let node_id = state
        .init_cluster(&req.listen_addr, &req.advertise_addr)
        .await?;
    Ok(Json(node_id))
}

async fn inspect_swarm(State(state): State<ApiState>) -> Result<Json<Swarm>> {
    Ok(Json(state.inspect_swarm().await?))
}

async fn join_swarm(State(state): State<ApiState>, body: Bytes) -> Result<StatusCode> {
    let req: JoinRequest = serde_json::from_slice(&body)?;
    debug!(
        "Join request for {:?} (token {:?})",
        req.remote_addrs, req.join_token
    );
    state
        .join_cluster(&req.remote_addrs, &req.listen_addr, &req.advertise_addr)
        .await?;
    Ok(StatusCode::OK)
}

async fn leave_swarm(State(state): State<ApiState>) -> Result<StatusCode> {
    state.leave_cluster().await?;
    Ok(StatusCode::OK)
}

async fn create_service(State(state): State<ApiState>, body: Bytes) -> Result<Json<Service>> {
    let spec: ServiceSpec = serde_json::from_slice(&body)?;
    Ok(Json(state.create_service(spec).await?))
}

async fn inspect_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Service>> {
    Ok(Json(state.inspect_service(&id).await?))
}

async fn list_services(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Service>>> {
    Ok(Json(state.list_services(&query.filters()).await?))
}

async fn update_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Service>> {
    let spec: ServiceSpec = serde_json::from_slice(&body)?;
    Ok(Json(state.update_service(&id, spec).await?))
}

async fn delete_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.delete_service(&id).await?;
    Ok(StatusCode::OK)
}

async fn inspect_task(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<Task>> {
    Ok(Json(state.inspect_task(&id).await?))
}

async fn list_tasks(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>> {
    Ok(Json(state.list_tasks(&query.filters()).await?))
}

async fn inspect_node(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<Node>> {
    Ok(Json(state.inspect_node(&id).await?))
}

async fn list_nodes(State(state): State<ApiState>) -> Result<Json<Vec<Node>>> {
    Ok(Json(state.list_nodes().await?))
}

async fn update_node(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode> {
    let spec: NodeSpec = serde_json::from_slice(&body)?;
    state.update_node(&id, spec).await?;
    Ok(StatusCode::OK)
}

async fn delete_node(State(state): State<ApiState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.delete_node(&id).await?;
    Ok(StatusCode::OK)
}

async fn list_containers(State(state): State<ApiState>) -> Json<Vec<ProcessInstance>> {
    Json(state.list_instances().await)
}

async fn inspect_container(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessInstance>> {
    Ok(Json(state.inspect_instance(&id).await?))
}
