//! # Orion Common Library
//!
//! Shared code for the Orion film ranking service:
//! - Database initialization and row models
//! - Preference tiers
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use db::models::Tier;
pub use error::{Error, Result};
