//! HTTP middleware components.

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod security_headers;
pub mod trace_id;

pub use auth::{require_admin, require_auth};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use security_headers::security_headers_middleware;
pub use trace_id::trace_id;
