use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 64;
const MAX_ACCESSION_LEN: usize = 128;

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn validate_name(name: &str, entity: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("{entity} cannot exceed {MAX_NAME_LEN} characters"));
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(format!(
            "{entity} can only contain alphanumeric characters, hyphens, and underscores"
        ));
    }
    if name.starts_with('-') || name.starts_with('_') {
        return Err(format!("{entity} cannot start with a hyphen or underscore"));
    }
    Ok(())
}

pub fn validate_program_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Program name").map_err(ApiError::bad_request)
}

pub fn validate_project_code(code: &str) -> Result<(), ApiError> {
    validate_name(code, "Project code").map_err(ApiError::bad_request)
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if username.contains(char::is_whitespace) {
        return Err("Username cannot contain whitespace".to_string());
    }
    Ok(())
}

/// Accession numbers are opaque but must be non-blank and bounded.
pub fn validate_accession_number(accession: &str) -> Result<(), ApiError> {
    let trimmed = accession.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Accession number cannot be empty"));
    }
    if trimmed.len() != accession.len() || accession.len() > MAX_ACCESSION_LEN {
        return Err(ApiError::bad_request("Invalid accession number"));
    }
    Ok(())
}
