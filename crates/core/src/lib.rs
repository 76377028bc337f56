//! Snowpack Energy Balance Core Library
//!
//! A two-layer point snowcover model driven by meteorological forcing. Each
//! data interval is split into sub-steps sized to the thinnest layer, and
//! every sub-step solves the surface energy balance: net radiation,
//! stability-corrected turbulent exchange, conduction into the ground and
//! between layers, and advection by precipitation.
//!
//! ## Layout
//!
//! - [`core_types`]: physical constants, forcing and snowcover state
//! - [`physics`]: saturation pressure, turbulent fluxes, layer bookkeeping
//!   and the point energy balance
//! - [`solver`]: per-cell time integration over one data interval
//! - [`grid`]: parallel driver over many independent cells
//! - [`config`]: site parameters and the sub-step hierarchy

pub mod config;
pub mod core_types;
pub mod grid;
pub mod physics;
pub mod solver;

// Re-export core types
pub use config::{ConfigError, ModelParams, TimestepConfig, TimestepLevel};
pub use core_types::{EnergySums, PointMeteorology, Precipitation, SnowState};

// Re-export physics and driver types
pub use grid::{BatchError, BatchInputs, BatchReport, CellFailure, CellRecord, GridDriver};
pub use physics::{EnergyBudget, PointError, SnobalExchange, SurfaceExchange};
pub use solver::{CellContext, ReferenceIntegrator, StepOutcome, TimeIntegrator};
