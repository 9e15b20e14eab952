use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::users::find_user;
use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{RoleGrantRequest, RoleGrantResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_accession_number;
use crate::types::{Role, RoleGrant, RoleSet};

pub async fn grant_roles(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RoleGrantRequest>,
) -> impl IntoResponse {
    validate_accession_number(&req.scope)?;
    if req.roles.is_empty() {
        return Err(ApiError::bad_request("At least one role is required"));
    }

    let roles = Role::parse_many(&req.roles).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Invalid role. Valid roles: {}",
            Role::ALL
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    let user = find_user(&state, &id)?;

    let now = Utc::now();
    for role in &roles {
        let grant = RoleGrant {
            user_id: user.id.clone(),
            scope: req.scope.clone(),
            role: *role,
            created_at: now,
        };
        state
            .store
            .grant_role(&grant)
            .api_err("Failed to grant role")?;
    }

    tracing::info!(
        username = %user.username,
        scope = %req.scope,
        roles = ?roles,
        "Granted roles"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RoleGrantResponse {
            scope: req.scope,
            roles: roles.into_iter().collect(),
        })),
    ))
}

pub async fn list_roles(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = find_user(&state, &id)?;

    let grants = state
        .store
        .list_user_role_grants(&user.id)
        .api_err("Failed to list role grants")?;

    let mut by_scope: BTreeMap<String, RoleSet> = BTreeMap::new();
    for grant in grants {
        by_scope.entry(grant.scope).or_default().insert(grant.role);
    }

    let responses: Vec<RoleGrantResponse> = by_scope
        .into_iter()
        .map(|(scope, roles)| RoleGrantResponse {
            scope,
            roles: roles.into_iter().collect(),
        })
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(responses)))
}

pub async fn revoke_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((id, scope, role)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let role = Role::parse(&role).ok_or_else(|| ApiError::bad_request("Invalid role"))?;
    let user = find_user(&state, &id)?;

    let removed = state
        .store
        .revoke_role(&user.id, &scope, role)
        .api_err("Failed to revoke role")?;

    if !removed {
        return Err(ApiError::not_found("Role grant not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
