//! Core error handling, credentials, and configuration for bbkit.
//!
//! This crate provides the foundational pieces shared by the Bitbucket
//! client and the command-line interface.

pub mod auth;
pub mod config;
pub mod error;

pub use auth::{basic_auth_header, require_authentication, Credentials};
pub use config::{ApiConfig, Config, FailurePolicy};
pub use error::{Error, Result};
