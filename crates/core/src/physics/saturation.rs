//! Saturation vapor pressure over water and ice
//!
//! Goff-Gratch style correlations as tabulated in the Smithsonian
//! Meteorological Tables. Both functions are pure; they fail only for
//! non-physical temperatures or a non-finite evaluation, which indicates a
//! unit or programming defect upstream rather than bad environmental data.
//!
//! # Scientific References
//! - List, R.J. (1949). "Smithsonian Meteorological Tables", 6th ed.
//! - Goff, J.A. and Gratch, S. (1946). "Low-pressure properties of water from
//!   -160 to 212 F", Trans. Am. Soc. Heat. Vent. Eng., 52, 95-122

use crate::core_types::constants::{BOIL, FREEZE, SEA_LEVEL};
use std::fmt;

/// Non-recoverable failure of a saturation-pressure evaluation
///
/// The embedding layer decides the exit policy: the grid driver aborts the
/// batch, the C ABI returns an error code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaturationError {
    /// Temperature at or below absolute zero
    InvalidTemperature {
        /// Which correlation was evaluated
        function: &'static str,
        /// Offending temperature (K)
        temperature: f64,
    },
    /// The log/pow evaluation produced a non-finite value
    NumericDomain {
        /// Which correlation was evaluated
        function: &'static str,
        /// Input temperature (K)
        temperature: f64,
    },
}

impl SaturationError {
    /// Saturation failures always indicate a defect, never bad forcing data
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SaturationError::InvalidTemperature { .. } | SaturationError::NumericDomain { .. }
        )
    }
}

impl fmt::Display for SaturationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaturationError::InvalidTemperature {
                function,
                temperature,
            } => write!(
                f,
                "{function}: input temperature {temperature} K is not above absolute zero"
            ),
            SaturationError::NumericDomain {
                function,
                temperature,
            } => write!(
                f,
                "{function}: bad return from log or pow at {temperature} K"
            ),
        }
    }
}

impl std::error::Error for SaturationError {}

fn check_temperature(function: &'static str, tk: f64) -> Result<(), SaturationError> {
    // NaN fails the comparison and is rejected with the same error
    if tk > 0.0 {
        Ok(())
    } else {
        Err(SaturationError::InvalidTemperature {
            function,
            temperature: tk,
        })
    }
}

fn check_finite(function: &'static str, tk: f64, value: f64) -> Result<f64, SaturationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SaturationError::NumericDomain {
            function,
            temperature: tk,
        })
    }
}

/// Saturation vapor pressure over water (Pa)
///
/// # Arguments
/// * `tk` - Temperature (K), must be > 0
///
/// # Errors
/// [`SaturationError`] when `tk <= 0` or the correlation is not finite.
pub fn satw(tk: f64) -> Result<f64, SaturationError> {
    check_temperature("satw", tk)?;

    let ratio = BOIL / tk;
    let exponent = -7.90298 * (ratio - 1.0) + 5.02808 * ratio.log10()
        - 1.3816e-7 * (10.0_f64.powf(1.1344e1 * (1.0 - tk / BOIL)) - 1.0)
        + 8.1328e-3 * (10.0_f64.powf(-3.49149 * (ratio - 1.0)) - 1.0)
        + SEA_LEVEL.log10();

    check_finite("satw", tk, 10.0_f64.powf(exponent))
}

/// Saturation vapor pressure over ice (Pa)
///
/// Above freezing this is the saturation pressure over water.
///
/// # Arguments
/// * `tk` - Temperature (K), must be > 0
///
/// # Errors
/// [`SaturationError`] when `tk <= 0` or the correlation is not finite.
pub fn sati(tk: f64) -> Result<f64, SaturationError> {
    check_temperature("sati", tk)?;

    if tk > FREEZE {
        return satw(tk);
    }

    let ratio = FREEZE / tk;
    let exponent = -9.09718 * (ratio - 1.0) - 3.56654 * ratio.log10()
        + 8.76793e-1 * (1.0 - tk / FREEZE)
        + 6.1071_f64.log10();

    // Correlation is in hPa
    check_finite("sati", tk, 10.0_f64.powf(exponent) * 1.0e2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_satw_at_boiling_is_sea_level() {
        let e = satw(BOIL).unwrap();
        assert_relative_eq!(e, SEA_LEVEL, max_relative = 1e-9);
    }

    #[test]
    fn test_satw_at_freezing() {
        // ~611 Pa at the triple point
        let e = satw(FREEZE).unwrap();
        assert!((e - 611.0).abs() < 2.0, "satw(FREEZE) was {e}");
    }

    #[test]
    fn test_sati_at_freezing_matches_reference() {
        let e = sati(FREEZE).unwrap();
        assert_relative_eq!(e, 610.71, max_relative = 1e-9);
    }

    #[test]
    fn test_sati_above_freezing_equals_satw() {
        for tk in [273.17, 275.0, 283.15, 300.0] {
            assert_eq!(sati(tk).unwrap(), satw(tk).unwrap());
        }
    }

    #[test]
    fn test_ice_below_water_when_supercooled() {
        let tk = 263.15;
        assert!(sati(tk).unwrap() < satw(tk).unwrap());
    }

    #[test]
    fn test_monotonic_in_temperature() {
        let mut last = 0.0;
        for i in 0..60 {
            let tk = 230.0 + f64::from(i);
            let e = sati(tk).unwrap();
            assert!(e > last, "sati not increasing at {tk}");
            last = e;
        }
    }

    #[test]
    fn test_non_positive_temperature_is_fatal() {
        let err = satw(0.0).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            SaturationError::InvalidTemperature { function: "satw", .. }
        ));

        assert!(matches!(
            sati(-10.0),
            Err(SaturationError::InvalidTemperature { function: "sati", .. })
        ));
        assert!(sati(f64::NAN).is_err());
    }
}
