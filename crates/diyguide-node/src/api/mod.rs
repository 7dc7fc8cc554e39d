//! HTTP API handlers.

pub mod credentials;
pub mod error;
pub mod guide;
pub mod health;
pub mod options;
