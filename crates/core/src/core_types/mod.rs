//! Core types and physical constants

pub mod constants;
pub mod meteorology;
pub mod snow_state;
pub mod units;

pub use meteorology::{PointMeteorology, Precipitation};
pub use snow_state::{EnergySums, SnowState};
pub use units::{Celsius, Kelvin};
