//! # mix-scale
//!
//! Scale drivers for the mixing station.
//!
//! ## Variants
//!
//! - [`HidScaleDriver`] - USB-HID weighing devices (usage page 0x8D), with
//!   hot-plug detection. Real device access needs the `hid` feature.
//! - [`SerialScaleDriver`] - RS-232 scales speaking MT-SICS or Toledo
//!   continuous output.
//! - [`MockScaleDriver`] - simulated scale for demos and tests.
//!
//! All variants implement [`ScaleDriver`] and publish [`ScaleEvent`]s on a
//! broadcast channel. Pick one from configuration with [`create_driver`].
//!
//! ## Example
//!
//! ```ignore
//! use mix_scale::{ScaleConfig, ScaleMode, create_driver};
//!
//! let driver = create_driver(&ScaleConfig::new(ScaleMode::Serial));
//! let mut events = driver.subscribe();
//! driver.start(250.0).await;
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```
//!
//! [`ScaleEvent`]: shared::ScaleEvent

mod driver;
mod error;
mod events;
pub mod hid;
pub mod mock;
pub mod serial;

// Re-exports
pub use driver::{ScaleConfig, ScaleDriver, ScaleMode, SerialProtocol, create_driver};
pub use error::{ScaleError, ScaleResult};
pub use hid::HidScaleDriver;
pub use mock::MockScaleDriver;
pub use serial::SerialScaleDriver;
