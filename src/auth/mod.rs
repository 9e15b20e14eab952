mod helpers;
mod middleware;
mod project;
mod session;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireUser};
pub use project::{
    ProjectAccess, ProjectAuthError, ProjectGrant, ProjectPath, ReadAccess, ReleaseAccess,
    RoleRequirement, WriteAccess, authorize_for_project,
};
pub use session::Session;
pub use token::{TokenGenerator, issue_token, parse_token};
