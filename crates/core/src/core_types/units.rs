//! Semantic temperature types for configuration boundaries
//!
//! The physics kernels work on raw `f64` Kelvin values for speed. These
//! newtypes exist where temperatures cross an API boundary in a unit a caller
//! might confuse, such as the Celsius values used to describe an initial
//! snowpack.
//!
//! Conversion uses the SI offset of 273.15 K. The physics melts and freezes at
//! [`FREEZE`](crate::core_types::constants::FREEZE) (273.16 K, the triple
//! point), so 0°C converts to 0.01 K below the model's melting point.
//!
//! # Usage
//! ```
//! use snobal_core::core_types::units::{Celsius, Kelvin};
//!
//! let temp = Celsius::new(-5.0);
//! let kelvin: Kelvin = temp.into();
//! assert!((*kelvin - 268.15).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Celsius to Kelvin conversion offset (0°C = 273.15 K)
const CELSIUS_KELVIN_OFFSET: f64 = 273.15;

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(f64);

impl Celsius {
    /// Water freezing point
    pub const FREEZING: Celsius = Celsius(0.0);

    /// Create a new Celsius temperature. Asserts value >= absolute zero (-273.15°C).
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(
            value >= -CELSIUS_KELVIN_OFFSET,
            "Celsius::new: value is below absolute zero (-273.15°C)"
        );
        Celsius(value)
    }

    /// Convert to Kelvin using the 273.15 K offset
    ///
    /// Not the model's melting point; compare against `FREEZE` in Kelvin.
    #[inline]
    #[must_use]
    pub fn to_kelvin(self) -> Kelvin {
        Kelvin(self.0 + CELSIUS_KELVIN_OFFSET)
    }
}

impl Deref for Celsius {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl From<Celsius> for Kelvin {
    fn from(c: Celsius) -> Kelvin {
        c.to_kelvin()
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°C", self.0)
    }
}

/// Temperature in Kelvin (absolute scale)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kelvin(f64);

impl Kelvin {
    /// Create a new Kelvin temperature. Asserts value >= absolute zero (0 K).
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(value >= 0.0, "Kelvin::new: value is below absolute zero (0 K)");
        Kelvin(value)
    }

    /// Convert to Celsius
    #[inline]
    #[must_use]
    pub fn to_celsius(self) -> Celsius {
        Celsius(self.0 - CELSIUS_KELVIN_OFFSET)
    }
}

impl Deref for Kelvin {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl From<Kelvin> for Celsius {
    fn from(k: Kelvin) -> Celsius {
        k.to_celsius()
    }
}

impl From<Kelvin> for f64 {
    fn from(k: Kelvin) -> f64 {
        k.0
    }
}

impl fmt::Display for Kelvin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} K", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_freezing() {
        let k = Celsius::FREEZING.to_kelvin();
        assert_eq!(*k, 273.15);
        assert_eq!(*k.to_celsius(), 0.0);
    }

    #[test]
    fn test_celsius_zero_sits_below_model_freezing() {
        use crate::core_types::constants::FREEZE;

        let gap = FREEZE - *Celsius::FREEZING.to_kelvin();
        assert!((gap - 0.01).abs() < 1e-9, "gap was {gap}");
        assert_eq!(*Kelvin::new(FREEZE).to_celsius(), FREEZE - 273.15);
    }

    #[test]
    #[should_panic(expected = "below absolute zero")]
    fn test_kelvin_rejects_negative() {
        let _ = Kelvin::new(-1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Celsius::new(-5.0).to_string(), "-5.00°C");
        assert_eq!(Kelvin::new(268.15).to_string(), "268.15 K");
    }
}
