//! The file registry engine.
//!
//! [`Registry`] presents the relational store, the document store and the
//! blob store as one collection of [`FileRecord`]s. [`MergeEngine`] and
//! [`BulkEngine`] build on it, and [`FileService`] bundles all three for the
//! HTTP layer.
//!
//! [`FileRecord`]: filehub_core::FileRecord

pub mod bulk;
pub mod error;
pub mod merge;
pub mod registry;
pub mod service;

pub use bulk::{BulkEngine, BulkResult};
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use merge::MergeEngine;
pub use registry::Registry;
pub use service::{FileService, Upload};
