use serde::{Deserialize, Serialize};

use crate::types::{Program, Project, Role, Token};

#[derive(Debug, Deserialize)]
pub struct CreateProgramRequest {
    pub name: String,
    pub dbgap_accession_number: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub code: String,
    pub dbgap_accession_number: String,
}

#[derive(Debug, Serialize)]
pub struct ProgramResponse {
    #[serde(flatten)]
    pub program: Program,
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RoleGrantRequest {
    /// Accession number of a program or project.
    pub scope: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleGrantResponse {
    pub scope: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Which tokens an admin listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Admin,
    User,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenListParams {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub kind: Option<TokenKind>,
    /// Drops tokens whose expiry has passed.
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub program: String,
    pub project: String,
    pub username: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub release_number: String,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub node_id: String,
    pub released: bool,
}
