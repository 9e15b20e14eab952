//! Project-scoped authorization.
//!
//! A request against `/{program}/{project}/...` is allowed when the caller
//! holds at least one of the handler's required roles on the program's or
//! the project's accession scope. Both lookups share one read transaction.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;

use super::{RequireUser, Session};
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::store::Store;
use crate::types::{Program, Project, Role, RoleSet, has_any_role};

/// Roles a handler accepts; holding any one of them is enough.
pub trait RoleRequirement: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

/// Read access to project data.
pub struct ReadAccess;

impl RoleRequirement for ReadAccess {
    const ROLES: &'static [Role] = &[Role::Member, Role::Read];
}

/// Creating or updating project data.
pub struct WriteAccess;

impl RoleRequirement for WriteAccess {
    const ROLES: &'static [Role] = &[Role::Create, Role::Update];
}

/// Releasing project data.
pub struct ReleaseAccess;

impl RoleRequirement for ReleaseAccess {
    const ROLES: &'static [Role] = &[Role::Release, Role::Admin];
}

#[derive(Debug, Error)]
pub enum ProjectAuthError {
    #[error("User {username} doesn't have {} access in {project}", describe_roles(.required))]
    MissingRole {
        username: String,
        required: Vec<Role>,
        project: String,
    },

    #[error("failed to resolve project scope: {0}")]
    Store(#[from] crate::error::Error),
}

fn describe_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|role| role.display_name())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Outcome of a successful project authorization.
#[derive(Debug, Clone)]
pub struct ProjectGrant {
    pub program: Option<Program>,
    pub project: Option<Project>,
    /// Union of the caller's roles on both scopes.
    pub roles: RoleSet,
}

/// Checks that `session` holds one of `required` on the program or project scope.
///
/// A program or project that does not exist contributes no roles.
pub fn authorize_for_project(
    store: &dyn Store,
    session: &Session,
    program: &str,
    project: &str,
    required: &[Role],
) -> Result<ProjectGrant, ProjectAuthError> {
    let scopes = store.resolve_project_scopes(program, project)?;

    if scopes.program.is_none() {
        tracing::debug!(program, "Program not found while authorizing");
    }
    if scopes.project.is_none() {
        tracing::debug!(project, "Project not found while authorizing");
    }

    let roles = session.roles_in(scopes.accession_numbers());

    if !has_any_role(&roles, required) {
        tracing::info!(
            user = session.username(),
            program,
            project,
            "Project access denied"
        );
        return Err(ProjectAuthError::MissingRole {
            username: session.username().to_string(),
            required: required.to_vec(),
            project: project.to_string(),
        });
    }

    Ok(ProjectGrant {
        program: scopes.program,
        project: scopes.project,
        roles,
    })
}

#[derive(Debug, Deserialize)]
pub struct ProjectPath {
    pub program: String,
    pub project: String,
}

/// Extractor guarding a `/{program}/{project}/...` handler with requirement `R`.
pub struct ProjectAccess<R> {
    pub session: Session,
    pub program: String,
    pub project: String,
    pub grant: ProjectGrant,
    _requirement: PhantomData<R>,
}

impl<R> ProjectAccess<R> {
    /// `{program}-{project}`, the key records are bound to on submission.
    #[must_use]
    pub fn project_id(&self) -> String {
        format!("{}-{}", self.program, self.project)
    }
}

impl<R: RoleRequirement> FromRequestParts<Arc<AppState>> for ProjectAccess<R> {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(session) = RequireUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Path(path) = Path::<ProjectPath>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let grant = authorize_for_project(
            state.store.as_ref(),
            &session,
            &path.program,
            &path.project,
            R::ROLES,
        )
        .map_err(|e| match e {
            ProjectAuthError::MissingRole { .. } => ApiError::forbidden(e.to_string()),
            ProjectAuthError::Store(err) => {
                tracing::error!("Failed to resolve project scope: {err}");
                ApiError::internal("Failed to resolve project")
            }
        })
        .map_err(IntoResponse::into_response)?;

        Ok(Self {
            session,
            program: path.program,
            project: path.project,
            grant,
            _requirement: PhantomData,
        })
    }
}
