use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("invalid role: {0}")]
    InvalidRole(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the index service or interpreting its documents.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("index service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("index record not found: {did}")]
    NotFound { did: String },

    #[error("revision conflict on index record {did}")]
    Conflict { did: String },

    #[error("unauthorized against index service")]
    Unauthorized,

    #[error("malformed index document: {0}")]
    Malformed(String),

    #[error("invalid version attributes: {0}")]
    InvalidAttributes(String),

    #[error("entity {did} has {count} unversioned heads")]
    MultipleHeads { did: String, count: usize },
}

impl IndexError {
    /// Maps a non-success HTTP response from the index service to an error.
    pub fn from_response(status: u16, did: &str, body: &str) -> Self {
        match status {
            401 | 403 => IndexError::Unauthorized,
            404 => IndexError::NotFound {
                did: did.to_string(),
            },
            409 => IndexError::Conflict {
                did: did.to_string(),
            },
            _ => IndexError::Api {
                status,
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.to_string()
                },
            },
        }
    }
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;
