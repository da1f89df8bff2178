//! # clipforge-core
//!
//! Shared foundation for the clipforge workspace:
//!
//! - **Unified error type** ([`Error`]) with HTTP status mapping, so API
//!   handlers can return domain errors directly.
//! - **Application configuration** ([`config::Config`]) with serde defaults,
//!   JSON load/persist, and non-fatal validation warnings.

pub mod config;
pub mod error;

pub use error::{Error, Result};
