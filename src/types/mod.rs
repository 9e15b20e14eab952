mod models;
mod role;

pub use models::*;
pub use role::{Role, RoleSet, has_any_role};
