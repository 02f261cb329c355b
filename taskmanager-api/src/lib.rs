//! # Task Manager API Server Library
//!
//! Everything the server binary needs, exposed as a library so integration
//! tests can build the same router.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration loaded from the environment
//! - `cookies`: token cookie transport
//! - `error`: error type and HTTP response mapping
//! - `extract`: JSON body extractor with enveloped rejections
//! - `middleware`: authentication and security headers
//! - `response`: success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
