//! Snowcover time integration
//!
//! The core abstraction is the `TimeIntegrator` trait, which advances one
//! cell's private `CellContext` across a data interval. `ReferenceIntegrator`
//! is the standard implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use snobal_core::solver::{CellContext, ReferenceIntegrator, TimeIntegrator};
//! use snobal_core::physics::SnobalExchange;
//!
//! let mut ctx = CellContext::new(state, input1, input2, precip, &params, &timestep);
//! let outcome = ReferenceIntegrator.step(&mut ctx, &SnobalExchange)?;
//! ```

mod context;
mod reference;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

// Re-exports
pub use context::CellContext;
pub use r#trait::{StepOutcome, TimeIntegrator};
pub use reference::ReferenceIntegrator;
