mod programs;
mod roles;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Program routes
        .route("/programs", post(programs::create_program))
        .route("/programs", get(programs::list_programs))
        .route("/programs/{name}", get(programs::get_program))
        .route("/programs/{name}", delete(programs::delete_program))
        .route("/programs/{name}/projects", post(programs::create_project))
        .route("/programs/{name}/projects", get(programs::list_projects))
        // Token routes
        .route("/tokens", get(tokens::list_tokens))
        .route("/tokens/{id}", get(tokens::get_token))
        .route("/tokens/{id}", delete(tokens::delete_token))
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/tokens", get(users::list_user_tokens))
        .route("/users/{id}/tokens", post(users::create_user_token))
        // Role routes
        .route("/users/{id}/roles", post(roles::grant_roles))
        .route("/users/{id}/roles", get(roles::list_roles))
        .route(
            "/users/{id}/roles/{scope}/{role}",
            delete(roles::revoke_role),
        )
}
