mod client;
mod document;
mod http;
mod memory;
mod versioning;

pub use client::IndexService;
pub use document::{
    IndexDocument, NewVersion, PROJECT_METADATA_KEY, RELEASE_METADATA_KEY, Version,
};
pub use http::HttpIndexClient;
pub use memory::MemoryIndex;
pub use versioning::{IndexVersionHelper, ReleasePlan};
