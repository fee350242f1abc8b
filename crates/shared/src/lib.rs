//! Shared types, errors, and configuration for the diary service.
//!
//! This crate provides common types used across all other crates:
//! - Typed identifiers for entries and users
//! - Application-wide error types
//! - Configuration management and connection-string normalization
//! - Session token verification

pub mod config;
pub mod connection;
pub mod error;
pub mod session;
pub mod types;


pub use config::AppConfig;
pub use connection::{ConnectionSettings, ConnectionStringError};
pub use error::{AppError, AppResult};
pub use session::{Claims, SessionError, SessionVerifier};
pub use types::{EntryId, UserId};
