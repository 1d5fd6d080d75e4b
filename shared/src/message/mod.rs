//! Event types published by the hardware core
//!
//! Each component owns one broadcast channel, so events of one kind arrive in
//! production order. Nothing is promised about ordering between the scale
//! channel and the printer channel.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HardwareError;
use crate::models::{PrintJob, PrinterState, RecipeDocument, ScaleConnectionState, WeightSample};

/// Events emitted by a scale driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ScaleEvent {
    Weight(WeightSample),
    StateChanged(ScaleConnectionState),
    HardwareError(HardwareError),
}

impl ScaleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Weight(_) => "weight",
            Self::StateChanged(_) => "state_changed",
            Self::HardwareError(_) => "hardware_error",
        }
    }
}

impl fmt::Display for ScaleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events emitted by the virtual printer server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PrinterEvent {
    StatusChanged {
        state: PrinterState,
        job_count: usize,
    },
    JobCompleted(PrintJob),
    RecipeDetected(RecipeDocument),
    HardwareError(HardwareError),
}

impl PrinterEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "status_changed",
            Self::JobCompleted(_) => "job_completed",
            Self::RecipeDetected(_) => "recipe_detected",
            Self::HardwareError(_) => "hardware_error",
        }
    }
}

impl fmt::Display for PrinterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_event_json_shape() {
        let event = ScaleEvent::StateChanged(ScaleConnectionState::Connecting);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["data"], "connecting");
    }

    #[test]
    fn test_printer_status_json_shape() {
        let event = PrinterEvent::StatusChanged {
            state: PrinterState::Receiving,
            job_count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["data"]["state"], "receiving");
        assert_eq!(json["data"]["job_count"], 3);
        assert_eq!(event.to_string(), "status_changed");
    }
}
