//! Snowcover layer bookkeeping
//!
//! Splits the pack into a thin surface layer and a lower bulk layer, and keeps
//! the derived masses, cold contents and liquid-water capacity consistent with
//! depth, density and temperature.
//!
//! # Layer Model
//!
//! - `m_s <= min_mass`: no snowcover, every term zero
//! - `z_s <= max_z_s_0`: one layer holding the whole pack
//! - otherwise: surface layer of `max_z_s_0`, lower layer holding the rest
//!
//! A lower layer lighter than `min_mass` is folded into the surface layer.

use crate::config::ModelParams;
use crate::core_types::constants::{cp_ice, FREEZE, MIN_SNOW_TEMP, RHO_ICE, RHO_W0};
use crate::core_types::SnowState;

/// Temperature assigned to an absent lower layer (K)
pub const EMPTY_LAYER_TEMP: f64 = MIN_SNOW_TEMP + FREEZE;

/// Energy needed to bring a layer to freezing (J/m², ≤ 0)
///
/// # Arguments
/// * `temp` - Layer temperature (K)
/// * `mass` - Layer specific mass (kg/m²)
#[inline]
pub fn cold_content(temp: f64, mass: f64) -> f64 {
    if temp < FREEZE {
        cp_ice(temp) * mass * (temp - FREEZE)
    } else {
        0.0
    }
}

/// Density of the ice matrix once liquid water is removed (kg/m³)
///
/// # Arguments
/// * `rho` - Bulk snow density including liquid water (kg/m³)
/// * `h2o_vol` - Liquid water volume fraction
#[inline]
pub fn dry_snow_density(rho: f64, h2o_vol: f64) -> f64 {
    (rho - h2o_vol * RHO_W0) / (1.0 - h2o_vol * RHO_W0 / RHO_ICE)
}

/// Liquid water a snowcover can retain (kg/m²)
///
/// # Arguments
/// * `depth` - Snowcover depth (m)
/// * `rho_dry` - Dry snow density (kg/m³)
/// * `max_h2o_vol` - Maximum liquid water volume fraction
#[inline]
pub fn h2o_left(depth: f64, rho_dry: f64, max_h2o_vol: f64) -> f64 {
    max_h2o_vol * depth * RHO_W0 * (RHO_ICE - rho_dry) / RHO_ICE
}

/// Partition the pack into layers from its depth and density
///
/// Sets `layer_count`, the layer depths and the layer masses. The total mass
/// `m_s` must already be current.
pub fn calc_layers(state: &mut SnowState, max_z_s_0: f64, min_mass: f64) {
    if state.m_s <= min_mass {
        state.layer_count = 0;
        state.z_s = 0.0;
        state.z_s_0 = 0.0;
        state.z_s_l = 0.0;
    } else if state.z_s <= max_z_s_0 {
        state.layer_count = 1;
        state.z_s_0 = state.z_s;
        state.z_s_l = 0.0;
    } else {
        state.layer_count = 2;
        state.z_s_0 = max_z_s_0;
        state.z_s_l = state.z_s - max_z_s_0;

        if state.z_s_l * state.rho <= min_mass {
            state.layer_count = 1;
            state.z_s_0 = state.z_s;
            state.z_s_l = 0.0;
        }
    }

    state.m_s_0 = state.rho * state.z_s_0;
    state.m_s_l = state.rho * state.z_s_l;
}

/// Zero every snowcover term, keeping site values (`z_0`, `p_a`)
pub fn clear_snowcover(state: &mut SnowState) {
    *state = SnowState {
        z_0: state.z_0,
        p_a: state.p_a,
        ..SnowState::default()
    };
}

/// Refresh cold contents and the average temperature from layer temperatures
fn refresh_thermal(state: &mut SnowState) {
    state.cc_s_0 = cold_content(state.t_s_0, state.m_s_0);

    if state.layer_count == 2 {
        state.cc_s_l = cold_content(state.t_s_l, state.m_s_l);
        state.t_s = (state.t_s_0 * state.m_s_0 + state.t_s_l * state.m_s_l) / state.m_s;
    } else {
        state.t_s_l = EMPTY_LAYER_TEMP;
        state.cc_s_l = 0.0;
        state.t_s = state.t_s_0;
    }

    state.cc_s = state.cc_s_0 + state.cc_s_l;
}

/// Derive all layer quantities from depth, density, temperatures and saturation
///
/// Runs at the start of every step so a persisted record only needs the
/// primary variables to be trusted.
pub fn init_snow(state: &mut SnowState, params: &ModelParams, min_mass: f64) {
    state.m_s = state.rho * state.z_s;
    calc_layers(state, params.max_z_s_0, min_mass);

    if state.layer_count == 0 {
        clear_snowcover(state);
        return;
    }

    refresh_thermal(state);

    state.h2o_vol = state.h2o_sat * params.max_h2o_vol;
    let rho_dry = dry_snow_density(state.rho, state.h2o_vol);
    state.h2o_max = h2o_left(state.z_s, rho_dry, params.max_h2o_vol);
    state.h2o = state.h2o_sat * state.h2o_max;
    state.h2o_total = 0.0;
}

/// Initialize a snowcover from depth, density, surface and average temperature
///
/// The lower-layer temperature is whatever makes the mass-weighted average
/// equal `t_s`, never above freezing.
pub fn cold_start(state: &mut SnowState, params: &ModelParams, min_mass: f64) {
    state.m_s = state.rho * state.z_s;
    calc_layers(state, params.max_z_s_0, min_mass);

    if state.layer_count == 2 {
        state.t_s_l =
            ((state.t_s * state.m_s - state.t_s_0 * state.m_s_0) / state.m_s_l).min(FREEZE);
    }

    init_snow(state, params, min_mass);
}

/// Re-partition after the pack mass or depth changed
///
/// Layer temperatures follow the snow: a new lower layer starts at the
/// surface temperature, and merging layers takes the mass-weighted average.
/// Liquid water in excess of capacity is returned as runoff (kg/m²) and
/// removed from the pack.
pub fn adjust_layers(state: &mut SnowState, params: &ModelParams, min_mass: f64) -> f64 {
    let previous_count = state.layer_count;
    let t_avg = if state.m_s > 0.0 && previous_count == 2 {
        (state.t_s_0 * state.m_s_0 + state.t_s_l * state.m_s_l) / (state.m_s_0 + state.m_s_l)
    } else {
        state.t_s_0
    };

    if state.rho > 0.0 {
        state.z_s = state.m_s / state.rho;
    }
    calc_layers(state, params.max_z_s_0, min_mass);

    if state.layer_count == 0 {
        let runoff = state.m_s.max(0.0);
        clear_snowcover(state);
        return runoff;
    }

    match (previous_count, state.layer_count) {
        (2, 1) => state.t_s_0 = t_avg,
        (0 | 1, 2) => state.t_s_l = state.t_s_0,
        _ => {}
    }
    refresh_thermal(state);

    let rho_dry = ((state.m_s - state.h2o) / state.z_s).max(0.0);
    state.h2o_max = h2o_left(state.z_s, rho_dry, params.max_h2o_vol);

    let runoff = (state.h2o - state.h2o_max).max(0.0);
    if runoff > 0.0 {
        state.h2o -= runoff;
        state.m_s -= runoff;
        state.z_s = state.m_s / state.rho;
        calc_layers(state, params.max_z_s_0, min_mass);
        if state.layer_count == 0 {
            let rest = state.m_s.max(0.0);
            clear_snowcover(state);
            return runoff + rest;
        }
        refresh_thermal(state);
    }

    state.h2o_sat = if state.h2o_max > 0.0 {
        (state.h2o / state.h2o_max).min(1.0)
    } else {
        0.0
    };
    state.h2o_vol = state.h2o_sat * params.max_h2o_vol;
    state.h2o_total = state.h2o;

    runoff
}
