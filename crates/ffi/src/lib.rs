//! C ABI for the snowpack energy-balance model
//!
//! A single batch entry point steps an array of independent cells across one
//! data interval. Errors are reported as [`SnobalErrorCode`] values with a
//! per-thread diagnostic message available from `snobal_get_last_error`.
//!
//! The C header `SnobalFFI.h` is generated by the build script.

mod batch;
mod error;
mod helpers;
mod types;

pub use batch::{snobal_params_default, snobal_run_batch};
pub use error::{snobal_get_last_error, snobal_get_last_error_code, SnobalErrorCode};
pub use types::{
    SnobalCellRecord, SnobalEnergySums, SnobalMet, SnobalParams, SnobalPrecip, SnobalSnowState,
};
