//! Per-cell integration context
//!
//! Everything one cell's step reads or writes, gathered into a value owned by
//! the task processing that cell. Configuration is borrowed read-only from the
//! batch; state, sums and clocks are private copies written back afterwards.

use crate::config::{ModelParams, TimestepConfig};
use crate::core_types::{EnergySums, PointMeteorology, Precipitation, SnowState};

/// Private working set for one cell's data step
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    /// Snowcover state, mutated in place
    pub state: SnowState,
    /// Running averages and totals
    pub sums: EnergySums,
    /// Model time (s)
    pub current_time: f64,
    /// Time covered by the current averages (s)
    pub time_since_out: f64,
    /// Forcing at the start of the data interval
    pub input1: PointMeteorology,
    /// Forcing at the end of the data interval
    pub input2: PointMeteorology,
    /// Precipitation during the data interval
    pub precip: Precipitation,
    /// Site geometry, shared by the batch
    pub params: &'a ModelParams,
    /// Timestep hierarchy, shared by the batch
    pub timestep: &'a TimestepConfig,
}

impl<'a> CellContext<'a> {
    /// Context with zeroed sums and clocks
    pub fn new(
        state: SnowState,
        input1: PointMeteorology,
        input2: PointMeteorology,
        precip: Precipitation,
        params: &'a ModelParams,
        timestep: &'a TimestepConfig,
    ) -> Self {
        Self {
            state,
            sums: EnergySums::default(),
            current_time: 0.0,
            time_since_out: 0.0,
            input1,
            input2,
            precip,
            params,
            timestep,
        }
    }
}
