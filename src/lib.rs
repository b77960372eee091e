//! Client for the notifications and users REST API, with a query cache
//! that deduplicates fetches and invalidates by key prefix.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod mutation;
pub mod query;
pub mod retry;

pub use error::{ApiError, NormalizationWarning};
