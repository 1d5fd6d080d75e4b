//! Shared types for the mixing station
//!
//! Domain types, event payloads and the recipe text parser used by
//! `mix-scale`, `mix-printer` and `mix-station`. Nothing in here performs I/O.

pub mod error;
pub mod message;
pub mod models;
pub mod recipe;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{FaultKind, HardwareError};
pub use message::{PrinterEvent, ScaleEvent};
pub use models::{
    Ingredient, Layer, PrintJob, PrintJobStatus, PrinterState, RecipeDocument, RecipeMeta,
    ScaleConnectionState, WeightSample, WeightUnit,
};
pub use recipe::parse_recipe;
