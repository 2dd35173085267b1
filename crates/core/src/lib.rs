//! Core domain types and shared logic for filehub.
//!
//! This crate defines the canonical, backend-agnostic data model used across
//! all other crates:
//! - File records, their identity and backend origin
//! - Search filters with one semantics for both metadata backends
//! - Aggregate statistics
//! - JSON merge strategies (pure functions)
//! - Configuration types

pub mod config;
pub mod error;
pub mod file;
pub mod filter;
pub mod merge;
pub mod stats;

pub use error::{Error, Result};
pub use file::{Backend, FileId, FileKey, FileRecord, NewFile};
pub use filter::FileFilter;
pub use merge::MergeStrategy;
pub use stats::{AggregateStats, BackendStats};

/// Extension (lower-cased, no dot) that makes a file eligible for merging.
pub const MERGEABLE_EXTENSION: &str = "json";

/// Category assigned to uploads that do not name one.
pub const DEFAULT_CATEGORY: &str = "uncategorized";
