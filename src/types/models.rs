use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    /// Accession number used as the authorization scope key.
    pub dbgap_accession_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub program_id: String,
    pub code: String,
    pub dbgap_accession_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Token {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// One role held by a user on one accession scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrant {
    pub user_id: String,
    pub scope: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Result of resolving a program/project pair inside one read transaction.
#[derive(Debug, Clone, Default)]
pub struct ProjectScopes {
    pub program: Option<Program>,
    pub project: Option<Project>,
}

impl ProjectScopes {
    /// Accession numbers of whichever entities were found.
    pub fn accession_numbers(&self) -> impl Iterator<Item = &str> {
        self.program
            .iter()
            .map(|p| p.dbgap_accession_number.as_str())
            .chain(
                self.project
                    .iter()
                    .map(|p| p.dbgap_accession_number.as_str()),
            )
    }
}
