//! # folio-core
//!
//! Core crate for Folio. Contains the error system, configuration schemas,
//! typed identifiers, pagination types and the traits implemented by the
//! cache and directory backends.
//!
//! This crate has **no** internal dependencies on other Folio crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorCode, ErrorKind};
pub use result::AppResult;
