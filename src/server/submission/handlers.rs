use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::auth::{ProjectAccess, ReadAccess, ReleaseAccess, WriteAccess};
use crate::index::{IndexDocument, NewVersion};
use crate::server::AppState;
use crate::server::dto::{AccessResponse, ReleaseRequest, ReleaseResponse};
use crate::server::response::{ApiError, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct NodePath {
    pub node_id: String,
}

/// Looks up `node_id` and hides it unless it was submitted under `project_id`.
async fn project_record(
    state: &AppState,
    node_id: &str,
    project_id: &str,
) -> Result<Option<IndexDocument>, ApiError> {
    let Some(doc) = state.index.get(node_id).await? else {
        return Ok(None);
    };

    if !doc.belongs_to(project_id) {
        tracing::warn!(node_id, project_id, "Record is bound to another project");
        return Err(ApiError::not_found("File not found"));
    }

    Ok(Some(doc))
}

pub async fn get_access(access: ProjectAccess<ReadAccess>) -> impl IntoResponse {
    Json(ApiResponse::success(AccessResponse {
        username: access.session.username().to_string(),
        program: access.program,
        project: access.project,
        roles: access.grant.roles.into_iter().collect(),
    }))
}

pub async fn get_file(
    access: ProjectAccess<ReadAccess>,
    State(state): State<Arc<AppState>>,
    Path(path): Path<NodePath>,
) -> impl IntoResponse {
    let doc = project_record(&state, &path.node_id, &access.project_id())
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(doc)))
}

pub async fn list_file_versions(
    access: ProjectAccess<ReadAccess>,
    State(state): State<Arc<AppState>>,
    Path(path): Path<NodePath>,
) -> impl IntoResponse {
    let versions = match project_record(&state, &path.node_id, &access.project_id()).await? {
        Some(_) => state.index.list_versions(&path.node_id).await?,
        None => Vec::new(),
    };
    Ok::<_, ApiError>(Json(ApiResponse::success(versions)))
}

pub async fn add_file_version(
    access: ProjectAccess<WriteAccess>,
    State(state): State<Arc<AppState>>,
    Path(path): Path<NodePath>,
    Json(mut attrs): Json<NewVersion>,
) -> impl IntoResponse {
    let project_id = access.project_id();
    let current = project_record(&state, &path.node_id, &project_id).await?;
    attrs.bind_to_project(&project_id, current.as_ref());

    let doc = state
        .versions()
        .add_node_version(&path.node_id, &attrs)
        .await?;

    tracing::info!(
        user = access.session.username(),
        project = %project_id,
        node_id = %path.node_id,
        head = %doc.did,
        "Recorded file version"
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(doc)))
}

pub async fn release_file(
    access: ProjectAccess<ReleaseAccess>,
    State(state): State<Arc<AppState>>,
    Path(path): Path<NodePath>,
    Json(req): Json<ReleaseRequest>,
) -> impl IntoResponse {
    if req.release_number.trim().is_empty() {
        return Err(ApiError::bad_request("release_number cannot be empty"));
    }

    let project_id = access.project_id();
    let released = match project_record(&state, &path.node_id, &project_id).await? {
        Some(_) => {
            state
                .versions()
                .release_node(&req.release_number, &path.node_id)
                .await?
        }
        None => false,
    };

    tracing::info!(
        user = access.session.username(),
        project = %project_id,
        node_id = %path.node_id,
        released,
        "Release requested"
    );

    Ok(Json(ApiResponse::success(ReleaseResponse {
        node_id: path.node_id,
        released,
    })))
}
