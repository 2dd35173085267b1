//! HTTP API server for filehub.
//!
//! A thin layer over [`filehub_registry::FileService`]:
//! - File search, lookup, rename and delete across both backends
//! - Bulk delete and JSON merge
//! - Raw-body uploads
//! - Health and stats

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
