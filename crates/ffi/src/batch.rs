use snobal_core::core_types::{PointMeteorology, Precipitation};
use snobal_core::{BatchInputs, CellRecord, GridDriver};
use std::slice;

use crate::error::{DefaultSnobalError, SnobalErrorCode};
use crate::helpers::{clear_last_error, track_error};
use crate::types::{SnobalCellRecord, SnobalMet, SnobalParams, SnobalPrecip};

/// Default site and timestep parameters.
///
/// Heights of 5 m, a 0.25 m surface layer, 1% liquid-water holding capacity,
/// an hourly data interval and 60/15/1-minute sub-step levels.
#[no_mangle]
pub extern "C" fn snobal_params_default() -> SnobalParams {
    SnobalParams::default()
}

/// Advance every active cell by one data interval.
///
/// Cells are processed in parallel and independently. Cells with
/// `masked == false` are left unchanged. A cell whose step fails with a
/// recoverable error keeps its partially updated record and is counted in
/// `failures_out`; the rest of the batch continues.
///
/// # Arguments
/// * `n` - Number of cells; every array holds exactly `n` entries
/// * `nthreads` - Worker threads, 0 for one per core
/// * `first_step` - Cold-start every cell and zero its averages
/// * `input1` - Forcing at the start of the interval
/// * `input2` - Forcing at the end of the interval
/// * `precip` - Precipitation during the interval
/// * `params` - Site and timestep parameters
/// * `records` - Per-cell records, updated in place
/// * `failures_out` - Receives the number of failed cells (may be null)
///
/// # Returns
/// - `Ok` when the batch completed, even if some cells failed
/// - `NullPointer` if a required pointer is null
/// - `InvalidParameter` if `params` is rejected
/// - `ThreadPool` if the worker pool cannot be created
/// - `Fatal` if a cell hit a non-recoverable error; records may be partially
///   updated
///
/// # Safety
/// - `input1`, `input2`, `precip` and `records` must each point to `n`
///   valid, initialized elements
/// - `records` must not alias any of the input arrays
/// - `params` must point to a valid `SnobalParams`
/// - `failures_out` must be null or valid for writes
#[no_mangle]
pub unsafe extern "C" fn snobal_run_batch(
    n: usize,
    nthreads: u32,
    first_step: bool,
    input1: *const SnobalMet,
    input2: *const SnobalMet,
    precip: *const SnobalPrecip,
    params: *const SnobalParams,
    records: *mut SnobalCellRecord,
    failures_out: *mut usize,
) -> SnobalErrorCode {
    for (name, is_null) in [
        ("input1", input1.is_null()),
        ("input2", input2.is_null()),
        ("precip", precip.is_null()),
        ("params", params.is_null()),
        ("records", records.is_null()),
    ] {
        if is_null {
            return track_error(&DefaultSnobalError::null_pointer(name));
        }
    }

    let (model_params, timestep) = (*params).split();
    let driver = match GridDriver::new(model_params, timestep, nthreads as usize) {
        Ok(driver) => driver,
        Err(e) => return track_error(&DefaultSnobalError::from(&e)),
    };

    let input1: Vec<PointMeteorology> = slice::from_raw_parts(input1, n)
        .iter()
        .map(|&m| m.into())
        .collect();
    let input2: Vec<PointMeteorology> = slice::from_raw_parts(input2, n)
        .iter()
        .map(|&m| m.into())
        .collect();
    let precip: Vec<Precipitation> = slice::from_raw_parts(precip, n)
        .iter()
        .map(|&p| p.into())
        .collect();

    let out = slice::from_raw_parts_mut(records, n);
    let mut cells: Vec<CellRecord> = out.iter().map(|&r| r.into()).collect();

    let result = driver.run_batch(
        &mut cells,
        &BatchInputs {
            input1: &input1,
            input2: &input2,
            precip: &precip,
        },
        first_step,
    );

    // Written back even on a fatal error: other cells may have stepped
    for (dst, src) in out.iter_mut().zip(cells) {
        *dst = src.into();
    }

    match result {
        Ok(report) => {
            if !failures_out.is_null() {
                *failures_out = report.failures.len();
            }
            clear_last_error();
            SnobalErrorCode::Ok
        }
        Err(e) => track_error(&DefaultSnobalError::from(&e)),
    }
}
