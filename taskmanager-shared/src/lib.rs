//! # Task Manager Shared Library
//!
//! Domain types and persistence used by the task manager API.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWTs, single-use tokens, authentication and
//!   project authorization
//! - `db`: connection pool and migrations
//! - `email`: message content rendering and delivery
//! - `models`: database models and queries

pub mod auth;
pub mod db;
pub mod email;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
