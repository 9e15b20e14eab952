mod schema;
mod sqlite;

use std::collections::HashMap;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Program operations
    fn create_program(&self, program: &Program) -> Result<()>;
    fn get_program(&self, id: &str) -> Result<Option<Program>>;
    fn get_program_by_name(&self, name: &str) -> Result<Option<Program>>;
    fn list_programs(&self, cursor: &str, limit: i32) -> Result<Vec<Program>>;
    fn delete_program(&self, id: &str) -> Result<bool>;

    // Project operations
    fn create_project(&self, project: &Project) -> Result<()>;
    fn get_project_by_code(&self, code: &str) -> Result<Option<Project>>;
    fn list_program_projects(&self, program_id: &str) -> Result<Vec<Project>>;

    /// Looks up a program by name and a project by code inside one read transaction.
    /// Either side is `None` when no such entity exists.
    fn resolve_project_scopes(&self, program: &str, project: &str) -> Result<ProjectScopes>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Role grant operations
    fn grant_role(&self, grant: &RoleGrant) -> Result<()>;
    fn revoke_role(&self, user_id: &str, scope: &str, role: Role) -> Result<bool>;
    fn list_user_role_grants(&self, user_id: &str) -> Result<Vec<RoleGrant>>;

    /// Role sets keyed by accession scope, as carried by a session.
    fn user_scope_roles(&self, user_id: &str) -> Result<HashMap<String, RoleSet>> {
        let mut scopes: HashMap<String, RoleSet> = HashMap::new();
        for grant in self.list_user_role_grants(user_id)? {
            scopes.entry(grant.scope).or_default().insert(grant.role);
        }
        Ok(scopes)
    }

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
