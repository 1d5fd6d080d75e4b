//! Mixing station - scale and virtual printer bridge
//!
//! # Module layout
//!
//! ```text
//! mix-station/src/
//! ├── core/          # config, background tasks, station wiring
//! ├── utils/         # logging
//! ├── cli.rs         # clap definitions
//! └── commands.rs    # subcommand implementations
//! ```

pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;

pub use cli::{Cli, Command};
pub use crate::core::{BackgroundTasks, Station, StationConfig, TaskKind};
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env` and initialise logging from the environment
pub fn setup_environment() -> StationConfig {
    dotenv::dotenv().ok();
    let config = StationConfig::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );
    config
}
