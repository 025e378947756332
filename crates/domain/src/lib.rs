pub mod errors;
pub mod item;

pub use errors::*;
pub use item::*;
