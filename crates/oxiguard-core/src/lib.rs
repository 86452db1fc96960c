//! Oxiguard Core — shared types, error kinds, configuration, and utilities.
//!
//! This crate contains:
//! - **types**: user identity, permission levels, chat messages
//! - **error**: the enumerable `ErrorKind` every store error maps onto
//! - **config**: JSON config schema, loader, and env var overrides
//! - **utils**: data paths and string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::ErrorKind;
pub use types::{ChatMessage, ChatUser, Permission, PermissionParseError};
