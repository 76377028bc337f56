//! Per-cell snowpack state
//!
//! A `SnowState` is owned by exactly one cell for the lifetime of a run and is
//! mutated in place by every time step. Nothing in it is shared between cells.

use serde::{Deserialize, Serialize};

/// Physical state of a two-layer snowcover at a point
///
/// Layer 0 is the thin surface (active) layer; layer `l` is the lower bulk
/// layer, present only when the pack is deeper than the active-layer limit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SnowState {
    /// Roughness length (m)
    pub z_0: f64,
    /// Total snow depth (m)
    pub z_s: f64,
    /// Surface layer depth (m)
    pub z_s_0: f64,
    /// Lower layer depth (m)
    pub z_s_l: f64,
    /// Average snowcover density (kg/m³)
    pub rho: f64,
    /// Surface layer temperature (K)
    pub t_s_0: f64,
    /// Lower layer temperature (K)
    pub t_s_l: f64,
    /// Average snowcover temperature (K)
    pub t_s: f64,
    /// Specific mass of the snowcover (kg/m²)
    pub m_s: f64,
    /// Specific mass of the surface layer (kg/m²)
    pub m_s_0: f64,
    /// Specific mass of the lower layer (kg/m²)
    pub m_s_l: f64,
    /// Cold content of the snowcover (J/m²)
    pub cc_s: f64,
    /// Cold content of the surface layer (J/m²)
    pub cc_s_0: f64,
    /// Cold content of the lower layer (J/m²)
    pub cc_s_l: f64,
    /// Liquid water content (kg/m²)
    pub h2o: f64,
    /// Maximum liquid water the pack can retain (kg/m²)
    pub h2o_max: f64,
    /// Liquid water as a fraction of `h2o_max` (0-1)
    pub h2o_sat: f64,
    /// Liquid water as a volume fraction of the pack
    pub h2o_vol: f64,
    /// Liquid water plus pending rain (kg/m²)
    pub h2o_total: f64,
    /// Number of active layers: 0 (no snowcover), 1 or 2
    pub layer_count: u8,
    /// Air pressure at the site (Pa)
    pub p_a: f64,
}

impl SnowState {
    /// Whether an active snowcover exists
    #[inline]
    pub fn has_snowcover(&self) -> bool {
        self.layer_count > 0
    }
}

/// Running energy-budget averages and mass totals
///
/// The `_bar` terms are time-weighted averages since the last output point;
/// the `_sum` terms are accumulated mass totals (kg/m²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergySums {
    /// Net allwave radiation (W/m²)
    pub r_n_bar: f64,
    /// Sensible heat flux (W/m²)
    pub h_bar: f64,
    /// Latent heat flux (W/m²)
    pub l_v_e_bar: f64,
    /// Ground conduction to the snowcover (W/m²)
    pub g_bar: f64,
    /// Conduction into the surface layer (W/m²)
    pub g_0_bar: f64,
    /// Advected heat from precipitation (W/m²)
    pub m_bar: f64,
    /// Change in snowcover energy (W/m²)
    pub delta_q_bar: f64,
    /// Change in surface layer energy (W/m²)
    pub delta_q_0_bar: f64,
    /// Evaporation/sublimation mass, positive toward the surface (kg/m²)
    pub e_s_sum: f64,
    /// Melted mass (kg/m²)
    pub melt_sum: f64,
    /// Predicted runoff (kg/m²)
    pub ro_pred_sum: f64,
}

impl EnergySums {
    /// Zero every average and total
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
