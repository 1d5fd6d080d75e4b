//! Hardware fault payloads
//!
//! Faults travel to consumers inside [`ScaleEvent`](crate::ScaleEvent) and
//! [`PrinterEvent`](crate::PrinterEvent). Protocol decode misses and recipe
//! parse misses are normal outcomes and never become a `HardwareError`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a hardware fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Driver/binding missing or no matching hardware attached. Recoverable.
    DeviceUnavailable,
    /// Device or socket failed after a successful connection
    ConnectionFault,
}

impl FaultKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceUnavailable => "device_unavailable",
            Self::ConnectionFault => "connection_fault",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Advisory hardware error surfaced to consumers
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct HardwareError {
    pub kind: FaultKind,
    pub message: String,
}

impl HardwareError {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn device_unavailable(message: impl Into<String>) -> Self {
        Self::new(FaultKind::DeviceUnavailable, message)
    }

    pub fn connection_fault(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ConnectionFault, message)
    }
}
