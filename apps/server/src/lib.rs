//! Registrar - people, courses and enrollments over a JSON HTTP API
//!
//! People are addressed by their full name, courses by numeric ID. Every
//! write that touches enrollments runs in a single store transaction.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

pub use error::{Error, Result};
