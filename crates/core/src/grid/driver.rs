//! Parallel batch driver over independent cells
//!
//! Every active cell is processed by exactly one rayon task, which copies the
//! cell's persisted record into a private [`CellContext`], runs the time
//! integrator and writes the result back to the same index. Cells never read
//! each other's state, so results do not depend on the worker count.

use super::record::{BatchInputs, CellRecord};
use crate::config::{ConfigError, ModelParams, TimestepConfig};
use crate::core_types::constants::{hystat, GRAVITY, MOL_AIR, SEA_LEVEL, STD_AIRTMP, STD_LAPSE};
use crate::core_types::{PointMeteorology, Precipitation};
use crate::physics::{layers, PointError, SnobalExchange, SurfaceExchange};
use crate::solver::{CellContext, ReferenceIntegrator, StepOutcome, TimeIntegrator};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fmt;
use tracing::{error, info};

/// A cell whose step failed without stopping the batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellFailure {
    /// Index of the cell in the batch arrays
    pub index: usize,
    /// What went wrong
    pub error: PointError,
}

/// Outcome of a completed batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Active cells that were stepped (including failures)
    pub processed: usize,
    /// Inactive cells left untouched
    pub skipped: usize,
    /// Cells whose step failed, in index order
    pub failures: Vec<CellFailure>,
}

impl BatchReport {
    /// Whether every active cell stepped cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Failure of the batch as a whole
#[derive(Debug, Clone, PartialEq)]
pub enum BatchError {
    /// An input array does not have one entry per cell
    LengthMismatch {
        /// Which input
        field: &'static str,
        /// Number of cells
        expected: usize,
        /// Entries supplied
        actual: usize,
    },
    /// The worker pool could not be created
    ThreadPool(String),
    /// Batch configuration rejected
    InvalidParams(ConfigError),
    /// A non-recoverable error in one cell; other cells may have been updated
    Fatal {
        /// Lowest index with a fatal error
        index: usize,
        /// The error
        error: PointError,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::LengthMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "{field} has {actual} entries, expected one per cell ({expected})"
            ),
            BatchError::ThreadPool(msg) => write!(f, "failed to build worker pool: {msg}"),
            BatchError::InvalidParams(e) => write!(f, "invalid parameters: {e}"),
            BatchError::Fatal { index, error } => {
                write!(f, "fatal error processing cell {index}: {error}")
            }
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::InvalidParams(e) => Some(e),
            BatchError::Fatal { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigError> for BatchError {
    fn from(e: ConfigError) -> Self {
        BatchError::InvalidParams(e)
    }
}

/// Applies one data step to every active cell of a batch
///
/// Configuration is fixed at construction and shared read-only by all
/// workers.
#[derive(Debug, Clone)]
pub struct GridDriver<I = ReferenceIntegrator, E = SnobalExchange> {
    params: ModelParams,
    timestep: TimestepConfig,
    workers: usize,
    integrator: I,
    exchange: E,
}

impl GridDriver {
    /// Driver with the standard integrator and exchange terms
    ///
    /// # Arguments
    /// * `params` - Site geometry and snowcover limits
    /// * `timestep` - Data interval and sub-step hierarchy
    /// * `workers` - Worker threads per batch; 0 uses rayon's default
    ///
    /// # Errors
    /// [`BatchError::InvalidParams`] if either configuration is rejected.
    pub fn new(
        params: ModelParams,
        timestep: TimestepConfig,
        workers: usize,
    ) -> Result<Self, BatchError> {
        Self::with_components(
            params,
            timestep,
            workers,
            ReferenceIntegrator,
            SnobalExchange,
        )
    }
}

impl<I: TimeIntegrator, E: SurfaceExchange> GridDriver<I, E> {
    /// Driver with a custom integrator and exchange parameterization
    ///
    /// # Errors
    /// [`BatchError::InvalidParams`] if either configuration is rejected.
    pub fn with_components(
        params: ModelParams,
        timestep: TimestepConfig,
        workers: usize,
        integrator: I,
        exchange: E,
    ) -> Result<Self, BatchError> {
        params.validate()?;
        timestep.validate()?;
        Ok(Self {
            params,
            timestep,
            workers,
            integrator,
            exchange,
        })
    }

    /// Site geometry shared by every cell
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Timestep hierarchy shared by every cell
    pub fn timestep(&self) -> &TimestepConfig {
        &self.timestep
    }

    /// Step a single cell in place
    ///
    /// On the first step the snowcover is cold-initialized and the running
    /// sums zeroed; otherwise layer quantities are re-derived from the
    /// persisted record. Air pressure always follows from elevation. The
    /// record is written back even when the step fails.
    ///
    /// # Errors
    /// The [`PointError`] raised by the integrator.
    pub fn run_cell(
        &self,
        record: &mut CellRecord,
        input1: &PointMeteorology,
        input2: &PointMeteorology,
        precip: &Precipitation,
        first_step: bool,
    ) -> Result<StepOutcome, PointError> {
        let min_mass = self.timestep.min_snow_mass();

        let mut state = record.state;
        let mut sums = record.sums;
        let mut time_since_out = record.time_since_out;

        if first_step {
            layers::cold_start(&mut state, &self.params, min_mass);
            sums.reset();
            time_since_out = 0.0;
        } else {
            layers::init_snow(&mut state, &self.params, min_mass);
        }

        state.p_a = hystat(
            SEA_LEVEL,
            STD_AIRTMP,
            STD_LAPSE,
            record.elevation / 1000.0,
            GRAVITY,
            MOL_AIR,
        );

        let mut ctx = CellContext {
            state,
            sums,
            current_time: record.current_time,
            time_since_out,
            input1: *input1,
            input2: *input2,
            precip: *precip,
            params: &self.params,
            timestep: &self.timestep,
        };

        let result = self.integrator.step(&mut ctx, &self.exchange);

        record.state = ctx.state;
        record.sums = ctx.sums;
        record.current_time = ctx.current_time;
        record.time_since_out = ctx.time_since_out;

        result
    }

    /// Step every active cell of a batch
    ///
    /// Inactive cells are left byte-for-byte unchanged. A recoverable failure
    /// is logged with the cell index and collected into the report; the batch
    /// carries on.
    ///
    /// # Errors
    /// - [`BatchError::LengthMismatch`] if an input array is the wrong length
    /// - [`BatchError::ThreadPool`] if the worker pool cannot be built
    /// - [`BatchError::Fatal`] if any cell raised a non-recoverable error
    pub fn run_batch(
        &self,
        records: &mut [CellRecord],
        inputs: &BatchInputs<'_>,
        first_step: bool,
    ) -> Result<BatchReport, BatchError> {
        inputs.check_len(records.len())?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| BatchError::ThreadPool(e.to_string()))?;

        let active = records.iter().filter(|r| r.masked).count();
        info!(
            cells = records.len(),
            active,
            workers = pool.current_num_threads(),
            first_step,
            "Starting batch"
        );

        let failures: Vec<CellFailure> = pool.install(|| {
            records
                .par_iter_mut()
                .enumerate()
                .filter(|(_, record)| record.masked)
                .filter_map(|(index, record)| {
                    self.run_cell(
                        record,
                        &inputs.input1[index],
                        &inputs.input2[index],
                        &inputs.precip[index],
                        first_step,
                    )
                    .err()
                    .map(|error| CellFailure { index, error })
                })
                .collect()
        });

        if let Some(fatal) = failures.iter().find(|f| f.error.is_fatal()) {
            error!(index = fatal.index, error = %fatal.error, "Fatal error processing cell");
            return Err(BatchError::Fatal {
                index: fatal.index,
                error: fatal.error,
            });
        }

        for failure in &failures {
            error!(index = failure.index, error = %failure.error, "Error processing cell");
        }

        info!(
            processed = active,
            failed = failures.len(),
            "Batch complete"
        );

        Ok(BatchReport {
            processed: active,
            skipped: records.len() - active,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::SnowState;

    fn record(masked: bool) -> CellRecord {
        CellRecord {
            masked,
            elevation: 2000.0,
            state: SnowState {
                z_0: 0.005,
                z_s: 1.0,
                rho: 300.0,
                t_s_0: 265.15,
                t_s: 266.15,
                ..SnowState::default()
            },
            ..CellRecord::default()
        }
    }

    fn met() -> PointMeteorology {
        PointMeteorology {
            i_lw: 250.0,
            t_a: 268.15,
            e_a: 300.0,
            u: 3.0,
            t_g: 272.15,
            s_n: 200.0,
        }
    }

    #[test]
    fn test_rejects_invalid_params() {
        let params = ModelParams {
            z_u: 0.0,
            ..ModelParams::default()
        };
        assert!(matches!(
            GridDriver::new(params, TimestepConfig::default(), 1),
            Err(BatchError::InvalidParams(ConfigError::NonPositive { field: "z_u", .. }))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let driver = GridDriver::new(ModelParams::default(), TimestepConfig::default(), 1).unwrap();
        let mut records = vec![record(true); 3];
        let met = vec![met(); 3];
        let short = vec![Precipitation::default(); 2];

        let err = driver
            .run_batch(
                &mut records,
                &BatchInputs {
                    input1: &met,
                    input2: &met,
                    precip: &short,
                },
                true,
            )
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::LengthMismatch {
                field: "precip",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_run_cell_sets_pressure_and_advances_clock() {
        let driver = GridDriver::new(ModelParams::default(), TimestepConfig::default(), 1).unwrap();
        let mut cell = record(true);

        driver
            .run_cell(&mut cell, &met(), &met(), &Precipitation::default(), true)
            .unwrap();

        assert!(cell.state.p_a < SEA_LEVEL && cell.state.p_a > 75_000.0);
        assert_eq!(cell.current_time, 3600.0);
        assert_eq!(cell.state.layer_count, 2);
    }

    #[test]
    fn test_bad_cell_does_not_stop_batch() {
        let driver = GridDriver::new(ModelParams::default(), TimestepConfig::default(), 2).unwrap();
        let mut records = vec![record(true); 4];

        // Roughness length of zero is rejected by the flux solver
        records[2].state.z_0 = 0.0;

        let met = vec![met(); 4];
        let precip = vec![Precipitation::default(); 4];
        let report = driver
            .run_batch(
                &mut records,
                &BatchInputs {
                    input1: &met,
                    input2: &met,
                    precip: &precip,
                },
                true,
            )
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert!(!report.failures[0].error.is_fatal());
        assert_eq!(records[3].current_time, 3600.0);
    }
}
