//! # Sheepdog
//!
//! Project-scoped authorization and index versioning for a graph submission
//! service, usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! sheepdog = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use sheepdog::index::MemoryIndex;
//! use sheepdog::server::{AppState, create_router};
//! use sheepdog::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/sheepdog.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(MemoryIndex::new()),
//!     PathBuf::from("./data"),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `sheepdog` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod index;
pub mod server;
pub mod store;
pub mod types;
