//! # Enclave Shared Library
//!
//! This crate contains the shared types, database layer, and business logic
//! used by the Enclave API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migration runner
//! - `models`: Database models (users, survey log)
//! - `auth`: Password hashing, JWT tokens, auth middleware, the stage gate
//! - `workflow`: The membership application/approval engine
//! - `notify`: Notification dispatcher contract and post-commit queue

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;
pub mod workflow;

/// Current version of the Enclave shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
