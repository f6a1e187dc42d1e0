//! Shared building blocks for the replication monitoring services.
//!
//! - `config`: environment driven service and dashboard settings
//! - `errors`: the application error type and its HTTP mapping
//! - `models`: replication resources and dashboard document types
//! - `response`: the unified API response envelope
//! - `middleware`: request tracing middleware

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
