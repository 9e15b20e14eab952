mod index;
mod server;

pub use index::{FileConfig, IndexConfig};
pub use server::ServerConfig;
