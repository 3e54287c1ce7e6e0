//! # vpaper-core
//!
//! Core types, traits, and abstractions for virtualpaper.
//!
//! This crate provides the document, job and rule models plus the
//! collaborator traits that the other virtualpaper crates depend on.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
