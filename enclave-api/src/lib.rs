//! # Enclave API Server Library
//!
//! This library provides the Enclave API server: the membership
//! application/approval workflow behind an HTTP surface.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `notifier`: HTTP delivery-gateway notifier
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod notifier;
pub mod routes;
