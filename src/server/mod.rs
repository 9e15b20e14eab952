mod admin;
pub mod dto;
pub mod response;
mod router;
mod submission;
pub mod validation;

pub use admin::admin_router;
pub use router::{AppState, create_router};
pub use submission::submission_router;
