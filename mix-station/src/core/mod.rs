//! Station core: configuration, background tasks and wiring

pub mod config;
pub mod station;
pub mod tasks;

pub use config::StationConfig;
pub use station::Station;
pub use tasks::{BackgroundTasks, TaskKind};
