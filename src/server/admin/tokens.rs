use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{TokenKind, TokenListParams, TokenResponse};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::types::Token;

fn find_token(state: &AppState, id: &str) -> Result<Token, ApiError> {
    state
        .store
        .get_token_by_id(id)
        .api_err("Failed to get token")?
        .or_not_found("Token not found")
}

fn matches_filter(token: &Token, params: &TokenListParams) -> bool {
    let kind_ok = match params.kind {
        Some(TokenKind::Admin) => token.is_admin,
        Some(TokenKind::User) => !token.is_admin,
        None => true,
    };
    kind_ok && !(params.active && token.is_expired(Utc::now()))
}

/// Pages over every token by id. Filters apply after paging, so a page may
/// come back short while `next_cursor` still advances.
pub async fn list_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<TokenListParams>,
) -> impl IntoResponse {
    let page = state
        .store
        .list_tokens(
            params.cursor.as_deref().unwrap_or_default(),
            DEFAULT_PAGE_SIZE + 1,
        )
        .api_err("Failed to list tokens")?;

    let (page, next_cursor, has_more) =
        paginate(page, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    let data = page
        .into_iter()
        .filter(|token| matches_filter(token, &params))
        .map(TokenResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(PaginatedResponse::new(data, next_cursor, has_more)))
}

pub async fn get_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let token = find_token(&state, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(TokenResponse::from(token))))
}

/// Revokes a token. The admin token making the request cannot revoke itself.
pub async fn delete_token(
    RequireAdmin(current): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let token = find_token(&state, &id)?;

    if token.id == current.id {
        return Err(ApiError::bad_request("Cannot delete current token"));
    }

    state
        .store
        .delete_token(&token.id)
        .api_err("Failed to delete token")?;

    tracing::info!(
        token_id = %token.id,
        user_id = token.user_id.as_deref().unwrap_or("-"),
        is_admin = token.is_admin,
        "Revoked token"
    );

    Ok(StatusCode::NO_CONTENT)
}
