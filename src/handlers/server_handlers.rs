use crate::error::{AppError, Result};
use crate::mcp::registry::RegistryStats;
use crate::models::descriptor::{DescriptorDraft, EndpointDescriptor};
use crate::models::presets::{find_preset, presets};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct IdentityQuery {
    pub identity: String,
}

#[derive(Debug, Serialize)]
pub struct ServerListResponse {
    pub servers: Vec<EndpointDescriptor>,
    pub stats: RegistryStats,
}

#[derive(Debug, Serialize)]
pub struct PresetSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub draft: DescriptorDraft,
}

/// GET /api/servers
pub async fn list_servers(State(state): State<AppState>) -> Json<ServerListResponse> {
    let registry = state.registry.read().await;
    Json(ServerListResponse {
        servers: registry.list().to_vec(),
        stats: registry.stats(),
    })
}

/// POST /api/servers
///
/// Registers the draft, replacing any entry with the same identity.
pub async fn add_server(
    State(state): State<AppState>,
    Json(draft): Json<DescriptorDraft>,
) -> Result<(StatusCode, Json<EndpointDescriptor>)> {
    let descriptor = draft.validate()?;
    state.registry.write().await.insert(descriptor.clone());
    Ok((StatusCode::CREATED, Json(descriptor)))
}

/// DELETE /api/servers?identity=
///
/// Unknown identities are not an error.
pub async fn remove_server(
    State(state): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> StatusCode {
    state.registry.write().await.remove(&query.identity);
    StatusCode::NO_CONTENT
}

/// GET /api/servers/lookup?identity=
pub async fn lookup_server(
    State(state): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<EndpointDescriptor>> {
    let registry = state.registry.read().await;
    registry
        .find(&query.identity)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Server not registered: {}", query.identity)))
}

/// GET /api/servers/presets
pub async fn list_presets(State(state): State<AppState>) -> Json<Vec<PresetSummary>> {
    let root = &state.config.filesystem_root;
    Json(
        presets()
            .iter()
            .map(|preset| PresetSummary {
                name: preset.name,
                description: preset.description,
                draft: preset.to_draft(root),
            })
            .collect(),
    )
}

/// POST /api/servers/presets/{name}
pub async fn add_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<EndpointDescriptor>)> {
    let preset =
        find_preset(&name).ok_or_else(|| AppError::NotFound(format!("Unknown preset: {name}")))?;

    let descriptor = preset.to_draft(&state.config.filesystem_root).validate()?;
    tracing::info!(preset = %name, identity = %descriptor.identity(), "Adding preset server");
    state.registry.write().await.insert(descriptor.clone());
    Ok((StatusCode::CREATED, Json(descriptor)))
}
