//! # mix-printer
//!
//! Virtual network printer for legacy mixing software.
//!
//! ## Scope
//!
//! This crate turns a raw TCP print stream into jobs:
//! - Raw TCP listener (port 9100) with inactivity framing
//! - Windows-1252 decoding of the captured bytes
//! - Recipe extraction and a bounded job history
//! - Spool-file reading for the "print to file" path
//! - A raw print client for replaying captured jobs
//!
//! Nothing is ever printed on paper.
//!
//! ## Example
//!
//! ```ignore
//! use mix_printer::{PrinterServerConfig, VirtualPrinterServer};
//!
//! let server = VirtualPrinterServer::new(PrinterServerConfig::default());
//! let mut events = server.subscribe();
//! let addr = server.start().await?;
//! println!("listening on {addr}");
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

mod client;
mod encoding;
mod error;
mod history;
mod server;
mod spool;

// Re-exports
pub use client::RawPrintClient;
pub use encoding::{decode_spool, decode_windows_1252, to_windows_1252};
pub use error::{PrintError, PrintResult};
pub use history::{HISTORY_CAPACITY, JobHistory};
pub use server::{PrinterServerConfig, VirtualPrinterServer};
pub use spool::{read_recipe_file, read_spool_text};
