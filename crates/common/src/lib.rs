//! SIGET Common Library
//!
//! Shared code for the SIGET record service including:
//! - Database entities, repository and transactional operations
//! - Ownership authorization helpers
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities (JWT, password hashing)
//! - PDF rendering client abstraction

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod pdf;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Valid activity rating range (inclusive)
pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;
