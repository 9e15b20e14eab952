use std::collections::HashMap;

use crate::error::Result;
use crate::store::Store;
use crate::types::{RoleSet, Token, User};

/// The authenticated caller: identity plus role sets keyed by accession scope.
///
/// Built once per request by the `RequireUser` extractor and handed to
/// authorization checks explicitly.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: Token,
    pub projects: HashMap<String, RoleSet>,
}

impl Session {
    /// Loads the user's role grants from the store.
    pub fn load(store: &dyn Store, user: User, token: Token) -> Result<Self> {
        let projects = store.user_scope_roles(&user.id)?;
        Ok(Self {
            user,
            token,
            projects,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.user.username
    }

    /// Roles held on one scope; empty when the user has none there.
    #[must_use]
    pub fn roles_for(&self, scope: &str) -> RoleSet {
        self.projects.get(scope).cloned().unwrap_or_default()
    }

    /// Union of the roles held across several scopes.
    pub fn roles_in<'a>(&self, scopes: impl IntoIterator<Item = &'a str>) -> RoleSet {
        scopes
            .into_iter()
            .flat_map(|scope| self.roles_for(scope))
            .collect()
    }
}
