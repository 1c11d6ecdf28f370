//! HTTP middleware

pub mod metrics;
pub mod security;

pub use metrics::metrics_middleware;
pub use security::security_headers_middleware;
