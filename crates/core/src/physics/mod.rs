//! Point physics for a two-layer snowcover

pub mod energy_balance;
pub mod exchange;
pub mod layers;
pub mod saturation;
pub mod turbulence;

pub use energy_balance::{
    energy_balance, turbulent_exchange, turbulent_inputs, EnergyBudget, PointError,
};
pub use exchange::{SnobalExchange, SurfaceExchange};
pub use saturation::{sati, satw, SaturationError};
pub use turbulence::{
    psi, turbulent_fluxes, FluxKind, InvalidInput, TurbulenceError, TurbulentFluxes,
    TurbulentInputs,
};
