//! HTTP API handlers for orion-rank

pub mod error;
pub mod films;
pub mod health;
pub mod list;
pub mod ranking;
pub mod user;

pub use error::ApiError;
pub use health::health_routes;
pub use user::{UserId, USER_HEADER};
