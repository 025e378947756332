pub mod handlers;
pub mod runtime;

pub use handlers::*;
