//! # Muddle Common Library
//!
//! Shared code for the muddle service including:
//! - Room, confusion and summary models
//! - Key-value store abstraction and its backends
//! - Configuration loading and data folder resolution
//! - Common error types

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use error::{Error, Result};
