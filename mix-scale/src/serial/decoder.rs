//! ASCII scale line decoders
//!
//! Lines are tried against MT-SICS, then Toledo continuous output, then a
//! generic "number with optional unit" fallback. First match wins.

use std::sync::LazyLock;

use regex::Regex;
use shared::WeightUnit;

/// `S S     123.4 g` / `D S  -0,5 kg` / `S D   12.0 g`
static SICS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([SD])\s+([SDI+\-])\s+([+\-]?\s*\d+(?:[.,]\d+)?)\s*([A-Za-z]+)?\s*$")
        .expect("SICS pattern")
});

/// `ST,GS,+  123.4 g` / `US,NT,-0001.20kg`
static TOLEDO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:ST|US|GS|NT)\s*,\s*)+([+\-]?\s*\d+(?:[.,]\d+)?)\s*([A-Za-z]+)?\s*$",
    )
    .expect("Toledo pattern")
});

static GENERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([+\-]?\d+(?:[.,]\d+)?)\s*(kg|g|oz|lb)?").expect("generic pattern")
});

/// Which decoder accepted a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    Sics,
    Toledo,
    Generic,
}

/// One decoded line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialReading {
    pub weight_grams: f64,
    pub stable: bool,
    pub format: LineFormat,
}

/// Run the decoder cascade over one trimmed line
pub fn decode_line(line: &str) -> Option<SerialReading> {
    decode_sics(line)
        .or_else(|| decode_toledo(line))
        .or_else(|| decode_generic(line))
}

fn decode_sics(line: &str) -> Option<SerialReading> {
    let caps = SICS_RE.captures(line)?;
    let weight = to_grams(parse_number(&caps[3])?, caps.get(4).map(|m| m.as_str()));
    Some(SerialReading {
        weight_grams: weight,
        // a dynamic status token overrides a stable command token
        stable: &caps[1] == "S" && &caps[2] != "D",
        format: LineFormat::Sics,
    })
}

fn decode_toledo(line: &str) -> Option<SerialReading> {
    let caps = TOLEDO_RE.captures(line)?;
    let weight = to_grams(parse_number(&caps[1])?, caps.get(2).map(|m| m.as_str()));
    Some(SerialReading {
        weight_grams: weight,
        stable: line.to_ascii_uppercase().contains("ST"),
        format: LineFormat::Toledo,
    })
}

fn decode_generic(line: &str) -> Option<SerialReading> {
    let caps = GENERIC_RE.captures(line)?;
    let weight = to_grams(parse_number(&caps[1])?, caps.get(2).map(|m| m.as_str()));
    Some(SerialReading {
        weight_grams: weight,
        stable: true,
        format: LineFormat::Generic,
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse().ok()
}

fn to_grams(value: f64, unit: Option<&str>) -> f64 {
    match unit.and_then(WeightUnit::from_symbol) {
        Some(unit) => unit.to_grams(value),
        None => {
            if let Some(symbol) = unit {
                tracing::trace!(symbol, "Unknown unit token, assuming grams");
            }
            value
        }
    }
}
