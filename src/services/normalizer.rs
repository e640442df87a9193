//! Value normalization
//!
//! Converts raw statistics-API values into the stored scale. Source series
//! reported in millions or billions are rescaled to hundred-million units,
//! and every stored row carries the same canonical display label.

use crate::error::{AppError, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Token the statistics API uses for "no observation on this date"
pub const MISSING_MARKER: &str = ".";

/// Display label for the hundred-million scale
pub const CANONICAL_DISPLAY_UNIT: &str = "\u{4ebf}(100 million)";

/// Unit assumed for series without a catalog entry
pub const DEFAULT_SERIES_UNIT: &str = "number";

/// A normalized value ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedValue {
    pub value: Option<Decimal>,
    pub display_unit: &'static str,
}

/// Parse a raw API value, mapping the missing marker to `None`
pub fn parse_raw_value(raw: &str) -> Result<Option<Decimal>> {
    let trimmed = raw.trim();
    if trimmed == MISSING_MARKER {
        return Ok(None);
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(Some)
        .map_err(|_| AppError::InvalidNumericFormat {
            value: raw.to_string(),
        })
}

/// Rescale a value according to the unit its series is reported in
///
/// A rescale that overflows the decimal range is an invalid value.
pub fn normalize(raw_value: Option<Decimal>, source_unit: &str) -> Result<NormalizedValue> {
    let value = match raw_value {
        Some(v) => {
            let scaled = match source_unit {
                "Millions" => v.checked_mul(Decimal::new(1, 2)),
                "Billions" => v.checked_mul(Decimal::TEN),
                _ => Some(v),
            };
            let scaled = scaled.ok_or_else(|| AppError::InvalidNumericFormat {
                value: v.to_string(),
            })?;
            Some(scaled.normalize())
        }
        None => None,
    };

    Ok(NormalizedValue {
        value,
        display_unit: CANONICAL_DISPLAY_UNIT,
    })
}

/// Parse and normalize in one step
pub fn normalize_raw(raw: &str, source_unit: &str) -> Result<NormalizedValue> {
    normalize(parse_raw_value(raw)?, source_unit)
}
