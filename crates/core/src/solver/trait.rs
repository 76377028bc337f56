//! Time integrator trait definition
//!
//! A `TimeIntegrator` advances one cell across one data interval. The grid
//! driver owns the loop over cells; the integrator owns everything inside a
//! cell's step, calling the point energy balance once per sub-step.

use super::context::CellContext;
use crate::physics::{EnergyBudget, PointError, SurfaceExchange};
use serde::{Deserialize, Serialize};

/// Summary of one data step for one cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Number of sub-steps the data interval was divided into
    pub sub_steps: u32,
    /// Budget of the final sub-step
    pub budget: EnergyBudget,
    /// Mass melted during the step (kg/m²)
    pub melt: f64,
    /// Mass leaving the pack as runoff during the step (kg/m²)
    pub runoff: f64,
    /// Net evaporation/condensation mass, positive toward the surface (kg/m²)
    pub evaporation: f64,
    /// Energy left once the whole snowcover had melted (J/m²)
    pub unused_energy: f64,
}

/// Advances a cell's snowcover across one data interval
pub trait TimeIntegrator: Send + Sync {
    /// Advance `ctx` by `ctx.timestep.data_step` seconds
    ///
    /// On error the context holds whatever partial update had been applied.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The cell's private state, forcing and configuration
    /// * `exchange` - Surface exchange parameterization
    ///
    /// # Errors
    ///
    /// The first [`PointError`] raised by any sub-step.
    fn step(
        &self,
        ctx: &mut CellContext<'_>,
        exchange: &dyn SurfaceExchange,
    ) -> Result<StepOutcome, PointError>;
}
