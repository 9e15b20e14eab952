use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateProgramRequest, CreateProjectRequest, PaginationParams, ProgramResponse,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::{
    validate_accession_number, validate_program_name, validate_project_code,
};
use crate::types::{Program, Project};

fn find_program(state: &AppState, name: &str) -> Result<Program, ApiError> {
    state
        .store
        .get_program_by_name(name)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")
}

pub async fn create_program(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProgramRequest>,
) -> impl IntoResponse {
    validate_program_name(&req.name)?;
    validate_accession_number(&req.dbgap_accession_number)?;

    let program = Program {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        dbgap_accession_number: req.dbgap_accession_number,
        created_at: Utc::now(),
    };

    match state.store.create_program(&program) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => return Err(ApiError::conflict("Program already exists")),
        Err(e) => {
            tracing::error!("Failed to create program: {e}");
            return Err(ApiError::internal("Failed to create program"));
        }
    }

    tracing::info!(program = %program.name, "Created program");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(program))))
}

pub async fn list_programs(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let programs = state
        .store
        .list_programs(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list programs")?;

    let (programs, next_cursor, has_more) =
        paginate(programs, DEFAULT_PAGE_SIZE as usize, |p| p.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        programs,
        next_cursor,
        has_more,
    )))
}

pub async fn get_program(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let program = find_program(&state, &name)?;
    let projects = state
        .store
        .list_program_projects(&program.id)
        .api_err("Failed to list projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ProgramResponse {
        program,
        projects,
    })))
}

pub async fn delete_program(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let program = find_program(&state, &name)?;

    state
        .store
        .delete_program(&program.id)
        .api_err("Failed to delete program")?;

    tracing::info!(program = %program.name, "Deleted program");
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn create_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    validate_project_code(&req.code)?;
    validate_accession_number(&req.dbgap_accession_number)?;

    let program = find_program(&state, &name)?;

    let project = Project {
        id: Uuid::new_v4().to_string(),
        program_id: program.id,
        code: req.code,
        dbgap_accession_number: req.dbgap_accession_number,
        created_at: Utc::now(),
    };

    match state.store.create_project(&project) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => return Err(ApiError::conflict("Project already exists")),
        Err(e) => {
            tracing::error!("Failed to create project: {e}");
            return Err(ApiError::internal("Failed to create project"));
        }
    }

    tracing::info!(program = %program.name, project = %project.code, "Created project");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn list_projects(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let program = find_program(&state, &name)?;
    let projects = state
        .store
        .list_program_projects(&program.id)
        .api_err("Failed to list projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}
