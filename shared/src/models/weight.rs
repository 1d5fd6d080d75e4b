//! Weight Model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::now_millis;

/// A single normalized reading from a scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    /// Always grams, whatever unit the device reported
    pub weight_grams: f64,
    /// Unix milliseconds at decode time
    pub timestamp_ms: i64,
    pub stable: bool,
}

impl WeightSample {
    /// Create a sample stamped with the current time
    pub fn new(weight_grams: f64, stable: bool) -> Self {
        Self {
            weight_grams,
            timestamp_ms: now_millis(),
            stable,
        }
    }
}

/// Connection state of one scale driver instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ScaleConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Units a scale may report in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Gram,
    Kilogram,
    Ounce,
    Pound,
}

impl WeightUnit {
    pub const GRAMS_PER_OUNCE: f64 = 28.3495;
    pub const GRAMS_PER_POUND: f64 = 453.592;

    /// Parse a unit token as printed by ASCII scale firmwares (`g`, `kg`, `oz`, `lb`)
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim().to_ascii_lowercase().as_str() {
            "g" | "gr" => Some(Self::Gram),
            "kg" => Some(Self::Kilogram),
            "oz" => Some(Self::Ounce),
            "lb" | "lbs" => Some(Self::Pound),
            _ => None,
        }
    }

    /// Grams per one unit
    pub fn factor(&self) -> f64 {
        match self {
            Self::Gram => 1.0,
            Self::Kilogram => 1000.0,
            Self::Ounce => Self::GRAMS_PER_OUNCE,
            Self::Pound => Self::GRAMS_PER_POUND,
        }
    }

    pub fn to_grams(&self, value: f64) -> f64 {
        value * self.factor()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ounce => "oz",
            Self::Pound => "lb",
        }
    }
}
