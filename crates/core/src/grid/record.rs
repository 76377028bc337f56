//! Per-cell persisted record and per-batch forcing arrays

use super::driver::BatchError;
use crate::core_types::{EnergySums, PointMeteorology, Precipitation, SnowState};
use serde::{Deserialize, Serialize};

/// Everything that must survive between data steps for one cell
///
/// The driver reads and writes exactly this; nothing else is carried over.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellRecord {
    /// Whether the cell is processed; inactive cells are never touched
    pub masked: bool,
    /// Ground elevation (m), sets the air pressure
    pub elevation: f64,
    /// Model time (s)
    pub current_time: f64,
    /// Time covered by the current averages (s)
    pub time_since_out: f64,
    /// Snowcover state
    pub state: SnowState,
    /// Running averages and totals
    pub sums: EnergySums,
}

/// Forcing for one batch, one entry per cell
#[derive(Debug, Clone, Copy)]
pub struct BatchInputs<'a> {
    /// Meteorology at the start of the data interval
    pub input1: &'a [PointMeteorology],
    /// Meteorology at the end of the data interval
    pub input2: &'a [PointMeteorology],
    /// Precipitation during the data interval
    pub precip: &'a [Precipitation],
}

impl BatchInputs<'_> {
    pub(crate) fn check_len(&self, cells: usize) -> Result<(), BatchError> {
        for (field, actual) in [
            ("input1", self.input1.len()),
            ("input2", self.input2.len()),
            ("precip", self.precip.len()),
        ] {
            if actual != cells {
                return Err(BatchError::LengthMismatch {
                    field,
                    expected: cells,
                    actual,
                });
            }
        }
        Ok(())
    }
}
