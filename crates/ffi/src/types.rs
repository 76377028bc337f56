//! FFI-exposed data types.
//!
//! Plain `#[repr(C)]` mirrors of the core forcing, configuration and per-cell
//! record types. All temperatures are Kelvin, all masses kg/m², all depths m.

use snobal_core::config::{ModelParams, TimestepConfig, TimestepLevel};
use snobal_core::core_types::{EnergySums, PointMeteorology, Precipitation, SnowState};
use snobal_core::CellRecord;

/// Meteorological forcing at one instant.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnobalMet {
    /// Incoming longwave radiation (W/m²)
    pub i_lw: f64,
    /// Air temperature (K)
    pub t_a: f64,
    /// Vapor pressure (Pa)
    pub e_a: f64,
    /// Wind speed (m/s)
    pub u: f64,
    /// Ground temperature at the soil depth (K)
    pub t_g: f64,
    /// Net shortwave radiation (W/m²)
    pub s_n: f64,
}

impl From<SnobalMet> for PointMeteorology {
    fn from(m: SnobalMet) -> Self {
        Self {
            i_lw: m.i_lw,
            t_a: m.t_a,
            e_a: m.e_a,
            u: m.u,
            t_g: m.t_g,
            s_n: m.s_n,
        }
    }
}

/// Precipitation over one data interval.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnobalPrecip {
    /// Total precipitation mass (kg/m²)
    pub m_pp: f64,
    /// Fraction falling as snow (0-1)
    pub percent_snow: f64,
    /// Density of the new snow (kg/m³)
    pub rho_snow: f64,
    /// Precipitation temperature (K)
    pub t_pp: f64,
}

impl From<SnobalPrecip> for Precipitation {
    fn from(p: SnobalPrecip) -> Self {
        Self {
            m_pp: p.m_pp,
            percent_snow: p.percent_snow,
            rho_snow: p.rho_snow,
            t_pp: p.t_pp,
        }
    }
}

/// Site geometry and the sub-step hierarchy, flattened.
///
/// Obtain defaults from `snobal_params_default` and override fields.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnobalParams {
    /// Wind measurement height (m)
    pub z_u: f64,
    /// Air temperature and humidity measurement height (m)
    pub z_t: f64,
    /// Soil temperature depth (m)
    pub z_g: f64,
    /// Heights are above the snow surface rather than the ground
    pub relative_heights: bool,
    /// Maximum surface-layer depth (m)
    pub max_z_s_0: f64,
    /// Maximum liquid-water volume fraction
    pub max_h2o_vol: f64,
    /// Input data interval (s)
    pub data_step: f64,
    /// Normal level mass threshold (kg/m²)
    pub normal_threshold: f64,
    /// Normal level step (s)
    pub normal_step: f64,
    /// Medium level mass threshold (kg/m²)
    pub medium_threshold: f64,
    /// Medium level step (s)
    pub medium_step: f64,
    /// Small level mass threshold (kg/m²), also the minimum snowcover mass
    pub small_threshold: f64,
    /// Small level step (s)
    pub small_step: f64,
}

impl Default for SnobalParams {
    fn default() -> Self {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        Self {
            z_u: params.z_u,
            z_t: params.z_t,
            z_g: params.z_g,
            relative_heights: params.relative_heights,
            max_z_s_0: params.max_z_s_0,
            max_h2o_vol: params.max_h2o_vol,
            data_step: steps.data_step,
            normal_threshold: steps.normal.threshold,
            normal_step: steps.normal.time_step,
            medium_threshold: steps.medium.threshold,
            medium_step: steps.medium.time_step,
            small_threshold: steps.small.threshold,
            small_step: steps.small.time_step,
        }
    }
}

impl SnobalParams {
    pub(crate) fn split(&self) -> (ModelParams, TimestepConfig) {
        let params = ModelParams {
            z_u: self.z_u,
            z_t: self.z_t,
            z_g: self.z_g,
            relative_heights: self.relative_heights,
            max_z_s_0: self.max_z_s_0,
            max_h2o_vol: self.max_h2o_vol,
        };
        let steps = TimestepConfig {
            data_step: self.data_step,
            normal: TimestepLevel {
                threshold: self.normal_threshold,
                time_step: self.normal_step,
            },
            medium: TimestepLevel {
                threshold: self.medium_threshold,
                time_step: self.medium_step,
            },
            small: TimestepLevel {
                threshold: self.small_threshold,
                time_step: self.small_step,
            },
        };
        (params, steps)
    }
}

/// Snowcover state of one cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnobalSnowState {
    pub z_0: f64,
    pub z_s: f64,
    pub z_s_0: f64,
    pub z_s_l: f64,
    pub rho: f64,
    pub t_s_0: f64,
    pub t_s_l: f64,
    pub t_s: f64,
    pub m_s: f64,
    pub m_s_0: f64,
    pub m_s_l: f64,
    pub cc_s: f64,
    pub cc_s_0: f64,
    pub cc_s_l: f64,
    pub h2o: f64,
    pub h2o_max: f64,
    pub h2o_sat: f64,
    pub h2o_vol: f64,
    pub h2o_total: f64,
    /// 0 = no snowcover, 1 = surface layer only, 2 = both layers
    pub layer_count: u8,
    pub p_a: f64,
}

/// Running averages and totals of one cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnobalEnergySums {
    pub r_n_bar: f64,
    pub h_bar: f64,
    pub l_v_e_bar: f64,
    pub g_bar: f64,
    pub g_0_bar: f64,
    pub m_bar: f64,
    pub delta_q_bar: f64,
    pub delta_q_0_bar: f64,
    pub e_s_sum: f64,
    pub melt_sum: f64,
    pub ro_pred_sum: f64,
}

/// Everything persisted for one cell between calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnobalCellRecord {
    /// Cells with `masked == false` are never touched
    pub masked: bool,
    /// Ground elevation (m)
    pub elevation: f64,
    /// Model time (s)
    pub current_time: f64,
    /// Time covered by the current averages (s)
    pub time_since_out: f64,
    pub state: SnobalSnowState,
    pub sums: SnobalEnergySums,
}

macro_rules! mirror {
    ($ffi:ty, $core:ty, { $($field:ident),* $(,)? }) => {
        impl From<$ffi> for $core {
            fn from(v: $ffi) -> Self {
                Self { $($field: v.$field),* }
            }
        }

        impl From<$core> for $ffi {
            fn from(v: $core) -> Self {
                Self { $($field: v.$field),* }
            }
        }
    };
}

mirror!(SnobalSnowState, SnowState, {
    z_0, z_s, z_s_0, z_s_l, rho, t_s_0, t_s_l, t_s, m_s, m_s_0, m_s_l,
    cc_s, cc_s_0, cc_s_l, h2o, h2o_max, h2o_sat, h2o_vol, h2o_total,
    layer_count, p_a,
});

mirror!(SnobalEnergySums, EnergySums, {
    r_n_bar, h_bar, l_v_e_bar, g_bar, g_0_bar, m_bar, delta_q_bar,
    delta_q_0_bar, e_s_sum, melt_sum, ro_pred_sum,
});

impl From<SnobalCellRecord> for CellRecord {
    fn from(r: SnobalCellRecord) -> Self {
        Self {
            masked: r.masked,
            elevation: r.elevation,
            current_time: r.current_time,
            time_since_out: r.time_since_out,
            state: r.state.into(),
            sums: r.sums.into(),
        }
    }
}

impl From<CellRecord> for SnobalCellRecord {
    fn from(r: CellRecord) -> Self {
        Self {
            masked: r.masked,
            elevation: r.elevation,
            current_time: r.current_time,
            time_since_out: r.time_since_out,
            state: r.state.into(),
            sums: r.sums.into(),
        }
    }
}
