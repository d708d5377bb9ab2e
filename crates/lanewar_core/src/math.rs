//! Fixed-point math utilities for deterministic simulation.
//!
//! Every fractional gameplay quantity (lane positions, speeds, HP,
//! resources, remaining production time) is a [`Fixed`]. Floating-point
//! results can differ between CPUs and compiler settings; fixed-point
//! results cannot, so two runs from the same state always agree.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-readable fixed-point values.
///
/// Config files and snapshot views carry decimals like `1.25`. Never used
/// on state that has to round-trip exactly.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal number.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize from a decimal number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of range")))
    }
}

/// Build an exact-as-possible fixed-point value from an integer ratio.
///
/// Tables use this instead of float literals so the stored bits never
/// depend on float parsing. Usable in `const` and `static` items.
#[must_use]
pub const fn ratio(numerator: i32, denominator: i32) -> Fixed {
    Fixed::from_bits(((numerator as i64) << 32) / denominator as i64)
}

/// Whole-number fixed-point constant.
#[must_use]
pub const fn whole(n: i32) -> Fixed {
    ratio(n, 1)
}

/// Absolute distance between two lane coordinates.
#[must_use]
pub fn distance(a: Fixed, b: Fixed) -> Fixed {
    (a - b).abs()
}

/// Linear interpolation between the previous and current position.
///
/// `alpha` is the scheduler's fractional accumulator in `[0, 1)`.
#[must_use]
pub fn interpolate(previous: Fixed, current: Fixed, alpha: Fixed) -> Fixed {
    previous + (current - previous) * alpha
}

/// Convert a duration in seconds (e.g. `1.875`) to whole ticks, rounding
/// half away from zero.
#[must_use]
pub fn seconds_to_ticks(seconds: Fixed, ticks_per_second: u32) -> u32 {
    let ticks = (seconds * Fixed::from_num(ticks_per_second)).round();
    ticks.max(Fixed::ZERO).to_num::<u32>()
}
