//! Bulk-transfer turbulent fluxes with Monin-Obukhov stability correction
//!
//! Computes sensible heat flux, latent heat flux, and mass flux at a snow
//! surface from temperature and humidity at the surface and at one height,
//! plus wind speed at one height. The three measurement heights need not be
//! equal.
//!
//! # Physics Implementation
//!
//! The neutral logarithmic profiles are corrected by regime-dependent ψ
//! functions evaluated at `z / L`, where the Obukhov length `L` depends on the
//! fluxes themselves:
//! ```text
//! L   = u*³ ρ / (k g (H / (T cp) + 0.61 E))
//! u*  = k u / (ln((zu - d0) / z0) - ψm(zu / L))
//! E   = (qa - qs) k u* ρ / (ln((zq - d0) / z0) - ψv(zq / L))
//! H   = (Ta - Ts) k u* ρ cp / (ln((za - d0) / z0) - ψh(za / L))
//! ```
//! `L` is iterated to a fixed point starting from neutral stability. Fluxes
//! are positive toward the surface.
//!
//! # Scientific References
//! - Brutsaert, W. (1982). "Evaporation Into the Atmosphere", D. Reidel,
//!   chapter 4.2, equations 4.25, 4.33', 4.34', 4.35', 4.92 and 5.3

use super::saturation::{sati, satw, SaturationError};
use crate::core_types::constants::{
    gas_den, lh_fus, lh_vap, spec_hum, vir_temp, CP_AIR, DALR, FREEZE, GRAVITY, MOL_AIR,
    VON_KARMAN,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Maximum number of Obukhov-length iterations
pub const MAX_ITERATIONS: u32 = 50;

/// Absolute and relative convergence threshold on successive Obukhov lengths
pub const CONVERGENCE_THRESHOLD: f64 = 1.0e-5;

/// Vapor pressures may exceed saturation by this much (Pa) before rejection
pub const SATURATION_TOLERANCE: f64 = 25.0;

/// Paeschke's constant for the displacement height (eq. 5.3)
const PAESCHKE: f64 = 7.35;

/// Ratio of sensible to momentum φ functions
const AH: f64 = 1.0;

/// Ratio of latent to momentum φ functions
const AV: f64 = 1.0;

/// Stable-regime ψ slope
const BETA_S: f64 = 5.2;

/// Unstable-regime ψ coefficient
const BETA_U: f64 = 16.0;

/// Buoyancy contribution of water vapor relative to heat
const VAPOR_BUOYANCY: f64 = 0.61;

/// Which transfer profile a ψ function corrects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxKind {
    /// Momentum (wind profile)
    Momentum,
    /// Sensible heat (temperature profile)
    Sensible,
    /// Latent heat (humidity profile)
    Latent,
}

/// Stability correction ψ (Brutsaert eq. 4.92)
///
/// # Arguments
/// * `zeta` - Height divided by the Obukhov length
/// * `kind` - Profile being corrected
///
/// # Returns
/// - Stable (`zeta > 0`): `-5.2 zeta`, with `zeta` capped at 1
/// - Unstable (`zeta < 0`): the Businger-Dyer integral forms
/// - Neutral (`zeta == 0`, or NaN): 0
pub fn psi(zeta: f64, kind: FluxKind) -> f64 {
    if zeta > 0.0 {
        -BETA_S * zeta.min(1.0)
    } else if zeta < 0.0 {
        let x = (1.0 - BETA_U * zeta).sqrt().sqrt();
        match kind {
            FluxKind::Momentum => {
                2.0 * ((1.0 + x) / 2.0).ln() + ((1.0 + x * x) / 2.0).ln() - 2.0 * x.atan()
                    + std::f64::consts::FRAC_PI_2
            }
            FluxKind::Sensible | FluxKind::Latent => 2.0 * ((1.0 + x * x) / 2.0).ln(),
        }
    } else {
        0.0
    }
}

/// Point inputs to the turbulent-flux solver
///
/// Heights are above the snow surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TurbulentInputs {
    /// Air pressure (Pa)
    pub press: f64,
    /// Air temperature at height `za` (K)
    pub ta: f64,
    /// Surface temperature (K)
    pub ts: f64,
    /// Height of the air temperature measurement (m)
    pub za: f64,
    /// Vapor pressure at height `zq` (Pa)
    pub ea: f64,
    /// Vapor pressure at the surface (Pa)
    pub es: f64,
    /// Height of the humidity measurement (m)
    pub zq: f64,
    /// Wind speed at height `zu` (m/s)
    pub u: f64,
    /// Height of the wind measurement (m)
    pub zu: f64,
    /// Roughness length (m)
    pub z0: f64,
}

impl fmt::Display for TurbulentInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P_a={:.3} T_a={:.3} T_s={:.3} z_a={:.3} e_a={:.3} e_s={:.3} z_q={:.3} u={:.3} z_u={:.3} z_0={:.5}",
            self.press,
            self.ta,
            self.ts,
            self.za,
            self.ea,
            self.es,
            self.zq,
            self.u,
            self.zu,
            self.z0
        )
    }
}

/// Solver output
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TurbulentFluxes {
    /// Sensible heat flux, positive toward the surface (W/m²)
    pub h: f64,
    /// Latent heat flux, positive toward the surface (W/m²)
    pub le: f64,
    /// Mass flux, positive toward the surface (kg/(m² s))
    pub e: f64,
    /// Obukhov-length iterations performed (0 for neutral stability)
    pub iterations: u32,
    /// Difference between the last two Obukhov-length estimates (m)
    pub residual: f64,
    /// Final Obukhov length (m), infinite for neutral stability
    pub obukhov_length: f64,
}

/// Why the solver refused its inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidInput {
    /// Roughness length not positive, or a height not above it
    Heights,
    /// A temperature not in Kelvin
    Temperatures,
    /// A vapor pressure not positive or not below the air pressure
    Pressures,
    /// A vapor pressure above saturation by more than the tolerance
    Supersaturated {
        /// Surface vapor pressure (Pa)
        es: f64,
        /// Saturation bound for `es` (Pa)
        es_sat: f64,
        /// Air vapor pressure (Pa)
        ea: f64,
        /// Saturation bound for `ea` (Pa)
        ea_sat: f64,
    },
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInput::Heights => write!(f, "measurement heights not above roughness length"),
            InvalidInput::Temperatures => write!(f, "temperatures are not in K"),
            InvalidInput::Pressures => {
                write!(f, "vapor pressures not positive or not below air pressure")
            }
            InvalidInput::Supersaturated {
                es,
                es_sat,
                ea,
                ea_sat,
            } => write!(
                f,
                "vapor pressure exceeded saturation pressure (e_s={es:.3} e_s_sat={es_sat:.3} e_a={ea:.3} e_a_sat={ea_sat:.3})"
            ),
        }
    }
}

/// Turbulent-flux solver failure
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurbulenceError {
    /// Inputs rejected before any physics was attempted
    InvalidInput {
        /// Which check failed
        reason: InvalidInput,
        /// The rejected inputs
        inputs: TurbulentInputs,
    },
    /// Iteration cap reached; `fluxes` holds the last iterate
    NonConvergent {
        /// Fluxes from the final iteration
        fluxes: TurbulentFluxes,
        /// The solver inputs
        inputs: TurbulentInputs,
    },
    /// Saturation pressure could not be evaluated
    Saturation(SaturationError),
}

impl TurbulenceError {
    /// Whether the failure is a defect rather than bad point data
    pub fn is_fatal(&self) -> bool {
        match self {
            TurbulenceError::Saturation(e) => e.is_fatal(),
            TurbulenceError::InvalidInput { .. } | TurbulenceError::NonConvergent { .. } => false,
        }
    }

    /// Last-iterate fluxes of a non-convergent solve
    pub fn approximate_fluxes(&self) -> Option<&TurbulentFluxes> {
        match self {
            TurbulenceError::NonConvergent { fluxes, .. } => Some(fluxes),
            _ => None,
        }
    }
}

impl fmt::Display for TurbulenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurbulenceError::InvalidInput { reason, inputs } => {
                write!(f, "invalid turbulent-flux inputs: {reason} [{inputs}]")
            }
            TurbulenceError::NonConvergent { fluxes, inputs } => write!(
                f,
                "turbulent fluxes did not converge after {} iterations, last difference {} [{inputs}]",
                fluxes.iterations, fluxes.residual
            ),
            TurbulenceError::Saturation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TurbulenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TurbulenceError::Saturation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SaturationError> for TurbulenceError {
    fn from(e: SaturationError) -> Self {
        TurbulenceError::Saturation(e)
    }
}

fn reject(reason: InvalidInput, inputs: &TurbulentInputs) -> TurbulenceError {
    debug!(%reason, %inputs, "turbulent-flux inputs rejected");
    TurbulenceError::InvalidInput {
        reason,
        inputs: *inputs,
    }
}

/// Validate inputs, returning vapor pressures clamped to saturation
fn validate(inputs: &TurbulentInputs) -> Result<(f64, f64), TurbulenceError> {
    let TurbulentInputs {
        press,
        ta,
        ts,
        za,
        ea,
        es,
        zq,
        zu,
        z0,
        ..
    } = *inputs;

    if z0 <= 0.0 || zq <= z0 || zu <= z0 || za <= z0 {
        return Err(reject(InvalidInput::Heights, inputs));
    }

    if ta <= 0.0 || ts <= 0.0 {
        return Err(reject(InvalidInput::Temperatures, inputs));
    }

    if ea <= 0.0 || es <= 0.0 || press <= 0.0 || ea >= press || es >= press {
        return Err(reject(InvalidInput::Pressures, inputs));
    }

    let es_sat = sati(ts)?;
    let ea_sat = satw(ta)?;
    if es - SATURATION_TOLERANCE > es_sat || ea - SATURATION_TOLERANCE > ea_sat {
        return Err(reject(
            InvalidInput::Supersaturated {
                es,
                es_sat,
                ea,
                ea_sat,
            },
            inputs,
        ));
    }

    Ok((ea.min(ea_sat), es.min(es_sat)))
}

/// Solve for sensible heat, latent heat, and mass flux at a point
///
/// # Arguments
/// * `inputs` - Point meteorology and surface state, heights above the surface
///
/// # Returns
/// Converged fluxes with the iteration count and final residual.
///
/// # Errors
/// - [`TurbulenceError::InvalidInput`] for non-physical heights, temperatures
///   or pressures; no fluxes are produced.
/// - [`TurbulenceError::NonConvergent`] when the iteration cap is reached; the
///   last iterate is carried in the error.
/// - [`TurbulenceError::Saturation`] if a saturation pressure cannot be
///   evaluated.
pub fn turbulent_fluxes(inputs: &TurbulentInputs) -> Result<TurbulentFluxes, TurbulenceError> {
    let (ea, es) = validate(inputs)?;

    let TurbulentInputs {
        press,
        ts,
        za,
        zq,
        u,
        zu,
        z0,
        ..
    } = *inputs;
    let k = VON_KARMAN;

    // Displacement plane height, eq. 5.3 & 5.4
    let d0 = 2.0 * PAESCHKE * z0 / 3.0;

    let ltsm = ((zu - d0) / z0).ln();
    let ltsh = ((za - d0) / z0).ln();
    let ltsv = ((zq - d0) / z0).ln();

    let qa = spec_hum(ea, press);
    let qs = spec_hum(es, press);

    // Potential temperature
    let ta = inputs.ta + DALR * za;

    // Air density at the virtual temperature of the geometric-mean state
    let dens = gas_den(
        press,
        MOL_AIR,
        vir_temp((ta * ts).sqrt(), (ea * es).sqrt(), press),
    );

    // Neutral stability: all ψ terms are zero
    let mut ustar = k * u / ltsm;
    let mut factor = k * ustar * dens;
    let mut e = (qa - qs) * factor * AV / ltsv;
    let mut h = (ta - ts) * factor * CP_AIR * AH / ltsh;

    let mut iterations = 0_u32;
    let mut residual = 0.0;
    let mut lo = f64::INFINITY;

    if inputs.ta != ts {
        loop {
            let last = lo;

            // Eq. 4.25 without the minus sign, since H is positive toward the surface
            lo = ustar * ustar * ustar * dens
                / (k * GRAVITY * (h / (ta * CP_AIR) + VAPOR_BUOYANCY * e));

            // Friction velocity, eq. 4.34'
            ustar = k * u / (ltsm - psi(zu / lo, FluxKind::Momentum));

            // Evaporative flux, eq. 4.33'
            factor = k * ustar * dens;
            e = (qa - qs) * factor * AV / (ltsv - psi(zq / lo, FluxKind::Latent));

            // Sensible heat flux, eq. 4.35' with sign reversed
            h = (ta - ts) * factor * AH * CP_AIR / (ltsh - psi(za / lo, FluxKind::Sensible));

            residual = last - lo;
            trace!(iteration = iterations, lo, residual, "obukhov length update");

            let unconverged = residual.abs() > CONVERGENCE_THRESHOLD
                && (residual / lo).abs() > CONVERGENCE_THRESHOLD;
            if !unconverged {
                break;
            }
            iterations += 1;
            if iterations >= MAX_ITERATIONS {
                break;
            }
        }
    }

    // Sublimation below freezing, evaporation above
    let mut xlh = lh_vap(ts);
    if ts <= FREEZE {
        xlh += lh_fus(ts);
    }

    let fluxes = TurbulentFluxes {
        h,
        le: xlh * e,
        e,
        iterations,
        residual,
        obukhov_length: lo,
    };

    if iterations >= MAX_ITERATIONS {
        debug!(residual, %inputs, "turbulent fluxes did not converge");
        return Err(TurbulenceError::NonConvergent {
            fluxes,
            inputs: *inputs,
        });
    }

    Ok(fluxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stable_inputs() -> TurbulentInputs {
        TurbulentInputs {
            press: 75_000.0,
            ta: 268.15,
            ts: 263.15,
            za: 3.0,
            ea: 300.0,
            es: sati(263.15).unwrap(),
            zq: 3.0,
            u: 3.0,
            zu: 5.0,
            z0: 0.001,
        }
    }

    #[test]
    fn test_psi_neutral_is_zero() {
        for kind in [FluxKind::Momentum, FluxKind::Sensible, FluxKind::Latent] {
            assert_eq!(psi(0.0, kind), 0.0);
        }
    }

    #[test]
    fn test_psi_stable_is_linear_and_capped() {
        assert_relative_eq!(psi(0.5, FluxKind::Momentum), -2.6);
        assert_relative_eq!(psi(0.5, FluxKind::Sensible), -2.6);
        assert_eq!(psi(1.0, FluxKind::Latent), psi(7.0, FluxKind::Latent));
        assert_relative_eq!(psi(3.0, FluxKind::Momentum), -BETA_S);
    }

    #[test]
    fn test_psi_unstable_forms() {
        let m = psi(-1.0, FluxKind::Momentum);
        let h = psi(-1.0, FluxKind::Sensible);
        assert!(m > 0.0 && h > 0.0);
        assert!(h > m, "heat correction should exceed momentum correction");
        assert_eq!(h, psi(-1.0, FluxKind::Latent));
        assert_relative_eq!(m, 1.1156, epsilon = 1e-3);
    }

    #[test]
    fn test_equal_temperatures_are_neutral() {
        let inputs = TurbulentInputs {
            press: 75_000.0,
            ta: 273.15,
            ts: 273.15,
            za: 2.0,
            ea: 400.0,
            es: sati(273.15).unwrap(),
            zq: 2.0,
            u: 2.0,
            zu: 5.0,
            z0: 0.005,
        };

        let fluxes = turbulent_fluxes(&inputs).unwrap();
        assert_eq!(fluxes.iterations, 0);
        assert_eq!(fluxes.residual, 0.0);
        assert!(fluxes.obukhov_length.is_infinite());
        assert!(fluxes.h != 0.0, "lapse correction gives a small sensible flux");
        assert!(fluxes.le != 0.0 && fluxes.e != 0.0);

        // Drier air than the surface: mass leaves the surface
        assert!(fluxes.e < 0.0);
    }

    #[test]
    fn test_stable_case_converges() {
        let fluxes = turbulent_fluxes(&stable_inputs()).unwrap();
        assert!(fluxes.iterations > 0 && fluxes.iterations < MAX_ITERATIONS);
        assert!(
            fluxes.residual.abs() <= CONVERGENCE_THRESHOLD
                || (fluxes.residual / fluxes.obukhov_length).abs() <= CONVERGENCE_THRESHOLD,
            "residual {} at L = {}",
            fluxes.residual,
            fluxes.obukhov_length
        );
        assert!(fluxes.obukhov_length > 0.0, "stable air has a positive Obukhov length");

        // Warm air over cold snow heats the surface
        assert!(fluxes.h > 0.0);
    }

    #[test]
    fn test_identical_inputs_give_identical_fluxes() {
        let mut unstable = stable_inputs();
        unstable.ta = 258.15;
        unstable.ea = 150.0;
        unstable.ts = 268.15;
        unstable.es = sati(268.15).unwrap();

        for inputs in [stable_inputs(), unstable] {
            let first = turbulent_fluxes(&inputs).unwrap();
            let second = turbulent_fluxes(&inputs).unwrap();
            assert_eq!(first.h.to_bits(), second.h.to_bits());
            assert_eq!(first.le.to_bits(), second.le.to_bits());
            assert_eq!(first.e.to_bits(), second.e.to_bits());
            assert_eq!(first.residual.to_bits(), second.residual.to_bits());
            assert_eq!(first.iterations, second.iterations);
        }
    }

    #[test]
    fn test_non_convergence_carries_last_iterate() {
        let fluxes = turbulent_fluxes(&stable_inputs()).unwrap();
        let err = TurbulenceError::NonConvergent {
            fluxes: TurbulentFluxes {
                iterations: MAX_ITERATIONS,
                ..fluxes
            },
            inputs: stable_inputs(),
        };

        assert!(!err.is_fatal());
        let approx = err.approximate_fluxes().unwrap();
        assert_eq!(approx.h, fluxes.h);
        assert_eq!(approx.iterations, MAX_ITERATIONS);
        assert!(err.to_string().contains("did not converge"));

        let rejected = TurbulenceError::InvalidInput {
            reason: InvalidInput::Heights,
            inputs: stable_inputs(),
        };
        assert!(rejected.approximate_fluxes().is_none());
    }

    #[test]
    fn test_unstable_case_converges_with_heat_loss() {
        let mut inputs = stable_inputs();
        inputs.ta = 258.15;
        inputs.ea = 150.0;
        inputs.ts = 268.15;
        inputs.es = sati(268.15).unwrap();

        let fluxes = turbulent_fluxes(&inputs).unwrap();
        assert!(fluxes.h < 0.0);
        assert!(fluxes.e < 0.0);
        assert!(fluxes.iterations < MAX_ITERATIONS);
    }

    #[test]
    fn test_sublimation_uses_fusion_heat() {
        let fluxes = turbulent_fluxes(&stable_inputs()).unwrap();
        let ts = stable_inputs().ts;
        assert_relative_eq!(
            fluxes.le,
            (lh_vap(ts) + lh_fus(ts)) * fluxes.e,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_rejects_height_below_roughness() {
        let mut inputs = stable_inputs();
        inputs.za = inputs.z0;
        assert!(matches!(
            turbulent_fluxes(&inputs),
            Err(TurbulenceError::InvalidInput {
                reason: InvalidInput::Heights,
                ..
            })
        ));

        let mut inputs = stable_inputs();
        inputs.z0 = 0.0;
        assert!(matches!(
            turbulent_fluxes(&inputs),
            Err(TurbulenceError::InvalidInput {
                reason: InvalidInput::Heights,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_bad_temperatures_and_pressures() {
        let mut inputs = stable_inputs();
        inputs.ts = -1.0;
        assert!(matches!(
            turbulent_fluxes(&inputs),
            Err(TurbulenceError::InvalidInput {
                reason: InvalidInput::Temperatures,
                ..
            })
        ));

        let mut inputs = stable_inputs();
        inputs.ea = inputs.press;
        assert!(matches!(
            turbulent_fluxes(&inputs),
            Err(TurbulenceError::InvalidInput {
                reason: InvalidInput::Pressures,
                ..
            })
        ));
    }

    #[test]
    fn test_supersaturation_tolerance() {
        let base = stable_inputs();
        let es_sat = sati(base.ts).unwrap();

        // Within tolerance: accepted and clamped to saturation
        let mut within = base;
        within.es = es_sat + 20.0;
        let clamped = turbulent_fluxes(&within).unwrap();
        let exact = turbulent_fluxes(&base).unwrap();
        assert_eq!(clamped, exact);

        // Beyond tolerance: rejected
        let mut beyond = base;
        beyond.es = es_sat + 30.0;
        let err = turbulent_fluxes(&beyond).unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(
            err,
            TurbulenceError::InvalidInput {
                reason: InvalidInput::Supersaturated { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_nan_temperature_surfaces_as_fatal() {
        let mut inputs = stable_inputs();
        inputs.ta = f64::NAN;
        let err = turbulent_fluxes(&inputs).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_display_mentions_inputs() {
        let mut inputs = stable_inputs();
        inputs.zu = 0.0;
        let msg = turbulent_fluxes(&inputs).unwrap_err().to_string();
        assert!(msg.contains("roughness length"));
        assert!(msg.contains("z_u=0.000"));
    }
}
