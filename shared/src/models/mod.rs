//! Data models
//!
//! Produced by the scale drivers and the virtual printer, consumed by whatever
//! sits on the other side of the event channels.

pub mod print_job;
pub mod recipe;
pub mod weight;

// Re-exports
pub use print_job::*;
pub use recipe::*;
pub use weight::*;
