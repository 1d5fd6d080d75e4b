//! USB-HID weighing report decoder
//!
//! Report layout (HID Point-of-Sale usage tables, page 0x8D):
//!
//! ```text
//! [report_id, status, unit, exponent (i8), weight_lsb, weight_msb]
//! ```

use shared::WeightUnit;
use shared::util::round_tenth;

/// Minimum report length carrying a weight
pub const REPORT_LEN: usize = 6;

/// Scale status codes (byte 1)
pub mod status {
    pub const FAULT: u8 = 0x01;
    pub const STABLE_ZERO: u8 = 0x02;
    pub const IN_MOTION: u8 = 0x03;
    pub const STABLE: u8 = 0x04;
    pub const UNDER_ZERO: u8 = 0x05;
    pub const OVER_WEIGHT: u8 = 0x06;
    pub const REQUIRES_CALIBRATION: u8 = 0x07;
    pub const REQUIRES_REZEROING: u8 = 0x08;
}

/// Unit codes (byte 2)
pub mod unit {
    pub const GRAM: u8 = 0x02;
    pub const KILOGRAM: u8 = 0x03;
    pub const OUNCE: u8 = 0x0B;
    pub const POUND: u8 = 0x0C;
}

/// One decoded report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HidReading {
    pub weight_grams: f64,
    pub stable: bool,
}

fn unit_from_code(code: u8) -> WeightUnit {
    match code {
        unit::GRAM => WeightUnit::Gram,
        unit::KILOGRAM => WeightUnit::Kilogram,
        unit::OUNCE => WeightUnit::Ounce,
        unit::POUND => WeightUnit::Pound,
        other => {
            tracing::debug!(code = other, "Unknown HID unit code, assuming grams");
            WeightUnit::Gram
        }
    }
}

/// Decode a raw input report. Short reports yield `None`.
pub fn decode_report(report: &[u8]) -> Option<HidReading> {
    if report.len() < REPORT_LEN {
        tracing::debug!(len = report.len(), "Dropping short HID report");
        return None;
    }

    let status = report[1];
    let unit = unit_from_code(report[2]);
    let exponent = report[3] as i8;
    let raw = u16::from_le_bytes([report[4], report[5]]);

    let magnitude = f64::from(raw) * 10f64.powi(i32::from(exponent));
    Some(HidReading {
        weight_grams: round_tenth(unit.to_grams(magnitude)),
        stable: status == status::STABLE,
    })
}
