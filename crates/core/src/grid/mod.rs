//! Batch processing of independent cells
//!
//! A batch is a flat array of [`CellRecord`]s with matching forcing arrays.
//! [`GridDriver`] steps every active cell across one data interval in
//! parallel and reports per-cell failures.

pub mod driver;
pub mod record;

// Re-export main types
pub use driver::{BatchError, BatchReport, CellFailure, GridDriver};
pub use record::{BatchInputs, CellRecord};
