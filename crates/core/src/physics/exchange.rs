//! Surface energy exchange terms
//!
//! The energy-balance orchestrator only sees the [`SurfaceExchange`] trait.
//! [`SnobalExchange`] is the standard two-layer snowcover parameterization;
//! alternative radiation or conduction schemes plug in by implementing the
//! trait.
//!
//! # Scientific References
//! - Marks, D. and Dozier, J. (1992). "Climate and energy exchange at the snow
//!   surface in the alpine region of the Sierra Nevada", Water Resources
//!   Research, 28(11), 3043-3054
//! - Anderson, E.A. (1976). "A point energy and mass balance model of a snow
//!   cover", NOAA Technical Report NWS 19

use super::saturation::{sati, SaturationError};
use super::turbulence::{self, TurbulenceError, TurbulentFluxes, TurbulentInputs};
use crate::core_types::constants::{
    cp_ice, cp_water, diffus, kts, lh_sub, lh_vap, FREEZE, KT_MOISTSAND, MOL_H2O, RGAS,
    SNOW_EMISSIVITY, STEF_BOLTZ,
};
use crate::core_types::{PointMeteorology, Precipitation, SnowState};
use tracing::warn;

/// Energy exchange terms consumed by the point energy balance
///
/// Every method is a pure function of its arguments. Heat fluxes are in W/m²
/// and positive toward the snowcover.
pub trait SurfaceExchange: Send + Sync {
    /// Net allwave radiation at the snow surface
    fn net_radiation(&self, state: &SnowState, met: &PointMeteorology) -> f64;

    /// Conduction from the soil into the lowest snow layer
    ///
    /// # Arguments
    /// * `rho` - Snow density (kg/m³)
    /// * `t_snow` - Snow layer temperature (K)
    /// * `t_ground` - Soil temperature (K)
    /// * `z_snow` - Snow layer thickness (m)
    /// * `z_ground` - Depth of the soil temperature measurement (m)
    /// * `p_a` - Air pressure (Pa)
    ///
    /// # Errors
    /// [`SaturationError`] if a temperature is non-physical.
    fn ground_conduction(
        &self,
        rho: f64,
        t_snow: f64,
        t_ground: f64,
        z_snow: f64,
        z_ground: f64,
        p_a: f64,
    ) -> Result<f64, SaturationError>;

    /// Conduction from the lower snow layer into the surface layer
    ///
    /// # Errors
    /// [`SaturationError`] if a temperature is non-physical.
    fn snow_conduction(
        &self,
        rho_surface: f64,
        rho_lower: f64,
        t_surface: f64,
        t_lower: f64,
        z_surface: f64,
        z_lower: f64,
        p_a: f64,
    ) -> Result<f64, SaturationError>;

    /// Heat advected by precipitation over `time_step` seconds
    fn advection(&self, state: &SnowState, precip: &Precipitation, time_step: f64) -> f64;

    /// Sensible and latent heat exchange with the atmosphere
    ///
    /// # Errors
    /// See [`turbulence::turbulent_fluxes`].
    fn turbulent_fluxes(
        &self,
        inputs: &TurbulentInputs,
    ) -> Result<TurbulentFluxes, TurbulenceError> {
        turbulence::turbulent_fluxes(inputs)
    }
}

/// Standard snowcover exchange parameterization
#[derive(Debug, Clone, Copy, Default)]
pub struct SnobalExchange;

/// Effective thermal conductivity including vapor diffusion (W/(m K))
///
/// # Arguments
/// * `k` - Dry thermal conductivity (W/(m K))
/// * `t` - Temperature (K)
/// * `p` - Air pressure (Pa)
fn effective_conductivity(k: f64, t: f64, p: f64) -> Result<f64, SaturationError> {
    // Vaporization above freezing, sublimation below
    let lh = if t > FREEZE { lh_vap(t) } else { lh_sub(t) };

    let e = sati(t)?;

    // Change in saturation vapor density with temperature
    let q = MOL_H2O / RGAS;
    let drho_dt = e * q / (t * t) * (lh * q / t - 1.0);

    Ok(k + lh * diffus(p, t) * drho_dt)
}

/// Steady-state heat transfer between two layers in series
///
/// Positive when heat flows from layer 2 into layer 1.
fn series_transfer(k1: f64, k2: f64, t1: f64, t2: f64, d1: f64, d2: f64) -> f64 {
    2.0 * k1 * k2 * (t2 - t1) / (k2 * d1 + k1 * d2)
}

impl SurfaceExchange for SnobalExchange {
    fn net_radiation(&self, state: &SnowState, met: &PointMeteorology) -> f64 {
        met.s_n + SNOW_EMISSIVITY * (met.i_lw - STEF_BOLTZ * state.t_s_0.powi(4))
    }

    fn ground_conduction(
        &self,
        rho: f64,
        t_snow: f64,
        t_ground: f64,
        z_snow: f64,
        z_ground: f64,
        p_a: f64,
    ) -> Result<f64, SaturationError> {
        let t_snow = if t_snow > FREEZE {
            warn!(t_snow, "snow temperature above freezing, capped for conduction");
            FREEZE
        } else {
            t_snow
        };

        let k_snow = effective_conductivity(kts(rho), t_snow, p_a)?;
        let k_ground = effective_conductivity(KT_MOISTSAND, t_ground, p_a)?;

        Ok(series_transfer(
            k_snow, k_ground, t_snow, t_ground, z_snow, z_ground,
        ))
    }

    fn snow_conduction(
        &self,
        rho_surface: f64,
        rho_lower: f64,
        t_surface: f64,
        t_lower: f64,
        z_surface: f64,
        z_lower: f64,
        p_a: f64,
    ) -> Result<f64, SaturationError> {
        if t_surface == t_lower {
            return Ok(0.0);
        }

        let k_surface = effective_conductivity(kts(rho_surface), t_surface, p_a)?;
        let k_lower = effective_conductivity(kts(rho_lower), t_lower, p_a)?;

        Ok(series_transfer(
            k_surface, k_lower, t_surface, t_lower, z_surface, z_lower,
        ))
    }

    fn advection(&self, state: &SnowState, precip: &Precipitation, time_step: f64) -> f64 {
        if !precip.is_falling() || time_step <= 0.0 {
            return 0.0;
        }

        let t_rain = precip.t_rain();
        let t_snow = precip.t_snow();

        let rain_heat = cp_water(t_rain) * precip.m_rain() * (t_rain - state.t_s_0);
        let snow_heat = cp_ice(t_snow) * precip.m_snow() * (t_snow - state.t_s_0);

        (rain_heat + snow_heat) / time_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const P_A: f64 = 75_000.0;

    #[test]
    fn test_net_radiation_balance() {
        let state = SnowState {
            t_s_0: 270.0,
            ..SnowState::default()
        };
        let met = PointMeteorology {
            i_lw: 250.0,
            s_n: 100.0,
            ..PointMeteorology::default()
        };

        let r_n = SnobalExchange.net_radiation(&state, &met);
        let expected = 100.0 + 0.98 * (250.0 - 5.67032e-8 * 270.0_f64.powi(4));
        assert_relative_eq!(r_n, expected, max_relative = 1e-12);

        // Emission from a snow surface at 270 K exceeds 250 W/m² incoming
        assert!(r_n < 100.0);
    }

    #[test]
    fn test_effective_conductivity_exceeds_dry_value() {
        let k = kts(300.0);
        let keff = effective_conductivity(k, 265.0, P_A).unwrap();
        assert!(keff > k);
    }

    #[test]
    fn test_ground_conduction_flows_warm_to_cold() {
        let g = SnobalExchange
            .ground_conduction(300.0, 263.15, 273.15, 0.5, 0.5, P_A)
            .unwrap();
        assert!(g > 0.0, "warm soil should heat the snow, got {g}");

        let g = SnobalExchange
            .ground_conduction(300.0, 272.0, 268.0, 0.5, 0.5, P_A)
            .unwrap();
        assert!(g < 0.0);
    }

    #[test]
    fn test_ground_conduction_caps_snow_temperature() {
        let capped = SnobalExchange
            .ground_conduction(300.0, 280.0, 275.0, 0.5, 0.5, P_A)
            .unwrap();
        let at_freezing = SnobalExchange
            .ground_conduction(300.0, FREEZE, 275.0, 0.5, 0.5, P_A)
            .unwrap();
        assert_eq!(capped, at_freezing);
    }

    #[test]
    fn test_snow_conduction_zero_for_equal_temperatures() {
        let g = SnobalExchange
            .snow_conduction(250.0, 250.0, 265.0, 265.0, 0.25, 1.0, P_A)
            .unwrap();
        assert_eq!(g, 0.0);

        let g = SnobalExchange
            .snow_conduction(250.0, 250.0, 260.0, 268.0, 0.25, 1.0, P_A)
            .unwrap();
        assert!(g > 0.0, "warmer lower layer should heat the surface");
    }

    #[test]
    fn test_conduction_rejects_non_physical_temperature() {
        let err = SnobalExchange
            .ground_conduction(300.0, 263.0, 0.0, 0.5, 0.5, P_A)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_advection() {
        let state = SnowState {
            t_s_0: 268.0,
            ..SnowState::default()
        };

        assert_eq!(
            SnobalExchange.advection(&state, &Precipitation::default(), 3600.0),
            0.0
        );

        // Warm rain adds heat
        let rain = Precipitation {
            m_pp: 5.0,
            percent_snow: 0.0,
            rho_snow: 0.0,
            t_pp: 276.0,
        };
        let m = SnobalExchange.advection(&state, &rain, 3600.0);
        let expected = cp_water(276.0) * 5.0 * (276.0 - 268.0) / 3600.0;
        assert_relative_eq!(m, expected, max_relative = 1e-12);

        // Cold snow removes heat
        let snow = Precipitation {
            m_pp: 5.0,
            percent_snow: 1.0,
            rho_snow: 100.0,
            t_pp: 260.0,
        };
        assert!(SnobalExchange.advection(&state, &snow, 3600.0) < 0.0);

        // Snow without a density is advected as rain, as it is added
        let undefined = Precipitation {
            rho_snow: 0.0,
            t_pp: 276.0,
            ..snow
        };
        let m = SnobalExchange.advection(&state, &undefined, 3600.0);
        assert_relative_eq!(m, expected, max_relative = 1e-12);
    }
}
