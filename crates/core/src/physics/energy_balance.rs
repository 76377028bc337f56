//! Point energy budget for a two-layer snowcover
//!
//! Two stages per call:
//! 1. Turbulent exchange: normalize heights to the snow surface, bound the
//!    vapor pressures by saturation, and run the bulk-transfer solver.
//! 2. Budget assembly: combine net radiation, turbulent fluxes, conduction and
//!    advection into the surface-layer and whole-pack energy changes.
//!
//! Without an active snowcover every term is zero and no exchange term is
//! evaluated.

use super::exchange::SurfaceExchange;
use super::saturation::{sati, SaturationError};
use super::turbulence::{TurbulenceError, TurbulentFluxes, TurbulentInputs};
use crate::config::ModelParams;
use crate::core_types::{PointMeteorology, Precipitation, SnowState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instantaneous energy budget at a point (W/m², positive toward the snow)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyBudget {
    /// Net allwave radiation
    pub r_n: f64,
    /// Sensible heat flux
    pub h: f64,
    /// Latent heat flux
    pub l_v_e: f64,
    /// Mass flux by evaporation or condensation (kg/(m² s))
    pub e: f64,
    /// Conduction from the soil into the pack
    pub g: f64,
    /// Conduction into the surface layer
    pub g_0: f64,
    /// Advected heat from precipitation
    pub m: f64,
    /// Energy change of the whole pack
    pub delta_q: f64,
    /// Energy change of the surface layer
    pub delta_q_0: f64,
}

/// Recoverable or fatal failure of a point computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointError {
    /// A saturation pressure could not be evaluated; never recoverable
    Saturation(SaturationError),
    /// The turbulent-flux solver rejected its inputs or did not converge
    Turbulence(TurbulenceError),
}

impl PointError {
    /// Whether the batch must stop rather than skip this cell
    pub fn is_fatal(&self) -> bool {
        match self {
            PointError::Saturation(e) => e.is_fatal(),
            PointError::Turbulence(e) => e.is_fatal(),
        }
    }
}

impl fmt::Display for PointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointError::Saturation(e) => write!(f, "{e}"),
            PointError::Turbulence(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PointError::Saturation(e) => Some(e),
            PointError::Turbulence(e) => Some(e),
        }
    }
}

impl From<SaturationError> for PointError {
    fn from(e: SaturationError) -> Self {
        PointError::Saturation(e)
    }
}

impl From<TurbulenceError> for PointError {
    fn from(e: TurbulenceError) -> Self {
        match e {
            TurbulenceError::Saturation(inner) => PointError::Saturation(inner),
            other => PointError::Turbulence(other),
        }
    }
}

/// Solver inputs for the current surface, with heights above the snow
///
/// Air vapor pressure above saturation is silently lowered to it.
///
/// # Errors
/// [`PointError::Saturation`] if a saturation pressure cannot be evaluated.
pub fn turbulent_inputs(
    state: &SnowState,
    met: &PointMeteorology,
    params: &ModelParams,
) -> Result<TurbulentInputs, PointError> {
    let (rel_z_t, rel_z_u) = if params.relative_heights {
        (params.z_t, params.z_u)
    } else {
        (params.z_t - state.z_s, params.z_u - state.z_s)
    };

    let e_s = sati(state.t_s_0)?;
    let sat_vp = sati(met.t_a)?;
    let e_a = met.e_a.min(sat_vp);

    Ok(TurbulentInputs {
        press: state.p_a,
        ta: met.t_a,
        ts: state.t_s_0,
        za: rel_z_t,
        ea: e_a,
        es: e_s,
        zq: rel_z_t,
        u: met.u,
        zu: rel_z_u,
        z0: state.z_0,
    })
}

/// Stage A: sensible heat, latent heat and mass flux at the snow surface
///
/// # Errors
/// [`PointError::Turbulence`] carrying every solver input when the solver
/// rejects them or does not converge; [`PointError::Saturation`] on a
/// saturation-pressure failure.
pub fn turbulent_exchange<E: SurfaceExchange + ?Sized>(
    state: &SnowState,
    met: &PointMeteorology,
    params: &ModelParams,
    exchange: &E,
) -> Result<TurbulentFluxes, PointError> {
    let inputs = turbulent_inputs(state, met, params)?;
    Ok(exchange.turbulent_fluxes(&inputs)?)
}

/// Stage B: full point energy budget
///
/// # Arguments
/// * `state` - Current snowcover
/// * `met` - Forcing at this instant
/// * `precip` - Precipitation for the data step
/// * `precip_step` - Seconds over which `precip` is spread
/// * `params` - Site geometry
/// * `exchange` - Exchange parameterization
///
/// # Errors
/// As [`turbulent_exchange`], plus saturation failures in conduction.
pub fn energy_balance<E: SurfaceExchange + ?Sized>(
    state: &SnowState,
    met: &PointMeteorology,
    precip: &Precipitation,
    precip_step: f64,
    params: &ModelParams,
    exchange: &E,
) -> Result<EnergyBudget, PointError> {
    if !state.has_snowcover() {
        return Ok(EnergyBudget::default());
    }

    let r_n = exchange.net_radiation(state, met);

    let fluxes = turbulent_exchange(state, met, params, exchange)?;

    let (g, g_0) = if state.layer_count == 1 {
        let g = exchange.ground_conduction(
            state.rho,
            state.t_s_0,
            met.t_g,
            state.z_s_0,
            params.z_g,
            state.p_a,
        )?;
        (g, g)
    } else {
        let g = exchange.ground_conduction(
            state.rho,
            state.t_s_l,
            met.t_g,
            state.z_s_l,
            params.z_g,
            state.p_a,
        )?;
        let g_0 = exchange.snow_conduction(
            state.rho,
            state.rho,
            state.t_s_0,
            state.t_s_l,
            state.z_s_0,
            state.z_s_l,
            state.p_a,
        )?;
        (g, g_0)
    };

    let m = exchange.advection(state, precip, precip_step);

    Ok(assemble(r_n, &fluxes, g, g_0, m, state.layer_count))
}

/// Surface and whole-pack budgets from the individual terms
pub fn assemble(
    r_n: f64,
    fluxes: &TurbulentFluxes,
    g: f64,
    g_0: f64,
    m: f64,
    layer_count: u8,
) -> EnergyBudget {
    let delta_q_0 = r_n + fluxes.h + fluxes.le + g_0 + m;
    let delta_q = if layer_count == 1 {
        delta_q_0
    } else {
        delta_q_0 + g - g_0
    };

    EnergyBudget {
        r_n,
        h: fluxes.h,
        l_v_e: fluxes.le,
        e: fluxes.e,
        g,
        g_0,
        m,
        delta_q,
        delta_q_0,
    }
}
