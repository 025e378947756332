pub mod api;
pub mod config;
pub mod errors;
pub mod lambda_error;
pub mod metrics;
pub mod telemetry;
pub mod tracing;

pub use api::*;
pub use config::*;
pub use errors::*;
pub use lambda_error::*;
pub use metrics::*;
