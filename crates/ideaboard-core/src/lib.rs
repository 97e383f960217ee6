//! # ideaboard-core
//!
//! Core types, traits, and abstractions for the ideaboard backend.
//!
//! This crate provides the domain models, request types, and repository
//! trait definitions that the database and API crates depend on.

pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
