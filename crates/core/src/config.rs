//! Batch-wide model parameters
//!
//! Both structs are read-only for the duration of a batch and shared by
//! reference across every worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Site measurement geometry and snowcover limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Wind measurement height (m)
    pub z_u: f64,
    /// Air temperature and humidity measurement height (m)
    pub z_t: f64,
    /// Depth of the soil temperature measurement (m)
    pub z_g: f64,
    /// Heights are above the snow surface rather than above the ground
    pub relative_heights: bool,
    /// Maximum thickness of the surface (active) layer (m)
    pub max_z_s_0: f64,
    /// Maximum liquid water content as a volume fraction
    pub max_h2o_vol: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            z_u: 5.0,
            z_t: 5.0,
            z_g: 0.5,
            relative_heights: false,
            max_z_s_0: 0.25,
            max_h2o_vol: 0.01,
        }
    }
}

impl ModelParams {
    /// Check the parameters describe a physical site
    ///
    /// # Errors
    /// [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("z_u", self.z_u), ("z_t", self.z_t), ("z_g", self.z_g)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !(self.max_z_s_0.is_finite() && self.max_z_s_0 > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "max_z_s_0",
                value: self.max_z_s_0,
            });
        }
        if !(0.0..1.0).contains(&self.max_h2o_vol) {
            return Err(ConfigError::OutOfRange {
                field: "max_h2o_vol",
                value: self.max_h2o_vol,
            });
        }
        Ok(())
    }
}

/// One level of the timestep hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepLevel {
    /// Smallest layer mass for which this level is fine enough (kg/m²)
    pub threshold: f64,
    /// Step length (s)
    pub time_step: f64,
}

/// Mass-threshold timestep subdivision
///
/// The data step is used while every layer is heavier than `normal.threshold`;
/// thinner packs drop to progressively shorter steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepConfig {
    /// Interval between the two forcing samples of a batch (s)
    pub data_step: f64,
    /// Normal run timestep
    pub normal: TimestepLevel,
    /// Medium run timestep
    pub medium: TimestepLevel,
    /// Small run timestep; its threshold is also the no-snowcover mass
    pub small: TimestepLevel,
}

impl Default for TimestepConfig {
    fn default() -> Self {
        Self {
            data_step: 3600.0,
            normal: TimestepLevel {
                threshold: 60.0,
                time_step: 3600.0,
            },
            medium: TimestepLevel {
                threshold: 10.0,
                time_step: 900.0,
            },
            small: TimestepLevel {
                threshold: 1.0,
                time_step: 60.0,
            },
        }
    }
}

impl TimestepConfig {
    /// Mass below which a pack is treated as no snowcover (kg/m²)
    #[inline]
    pub fn min_snow_mass(&self) -> f64 {
        self.small.threshold
    }

    /// Step length given the lightest active layer's mass (kg/m²)
    pub fn step_for(&self, min_layer_mass: f64) -> f64 {
        let step = if min_layer_mass > self.normal.threshold {
            self.data_step
        } else if min_layer_mass > self.medium.threshold {
            self.normal.time_step
        } else if min_layer_mass > self.small.threshold {
            self.medium.time_step
        } else {
            self.small.time_step
        };
        step.min(self.data_step)
    }

    /// Check thresholds decrease and steps divide one another
    ///
    /// # Errors
    /// [`ConfigError`] describing the first inconsistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let data = TimestepLevel {
            threshold: f64::MAX,
            time_step: self.data_step,
        };
        let levels = [
            ("data", data),
            ("normal", self.normal),
            ("medium", self.medium),
            ("small", self.small),
        ];

        for (name, level) in levels {
            if !(level.time_step.is_finite() && level.time_step > 0.0) {
                return Err(ConfigError::NonPositive {
                    field: name,
                    value: level.time_step,
                });
            }
            if !(level.threshold.is_finite() && level.threshold > 0.0) {
                return Err(ConfigError::NonPositive {
                    field: name,
                    value: level.threshold,
                });
            }
        }

        for pair in levels.windows(2) {
            let (coarse_name, coarse) = pair[0];
            let (fine_name, fine) = pair[1];
            if fine.threshold >= coarse.threshold || fine.time_step > coarse.time_step {
                return Err(ConfigError::LevelsOutOfOrder {
                    coarse: coarse_name,
                    fine: fine_name,
                });
            }
            let ratio = coarse.time_step / fine.time_step;
            if (ratio - ratio.round()).abs() > 1e-9 {
                return Err(ConfigError::UnevenSubdivision {
                    coarse: coarse_name,
                    fine: fine_name,
                });
            }
        }

        Ok(())
    }
}

/// Rejected batch configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A length, step or threshold that must be positive
    NonPositive {
        /// Field name
        field: &'static str,
        /// Supplied value
        value: f64,
    },
    /// A fraction outside its valid range
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Supplied value
        value: f64,
    },
    /// A finer timestep level is not finer than the coarser one
    LevelsOutOfOrder {
        /// Coarser level
        coarse: &'static str,
        /// Finer level
        fine: &'static str,
    },
    /// A coarser step is not a whole multiple of the finer one
    UnevenSubdivision {
        /// Coarser level
        coarse: &'static str,
        /// Finer level
        fine: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            ConfigError::OutOfRange { field, value } => {
                write!(f, "{field} must be in [0, 1), got {value}")
            }
            ConfigError::LevelsOutOfOrder { coarse, fine } => write!(
                f,
                "{fine} timestep must have a smaller threshold and step than {coarse}"
            ),
            ConfigError::UnevenSubdivision { coarse, fine } => {
                write!(f, "{coarse} timestep is not a whole multiple of {fine}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
