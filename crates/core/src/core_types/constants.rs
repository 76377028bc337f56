//! Environmental physics constants and closed-form helpers
//!
//! Fixed values used throughout the snowpack physics. They are inputs to the
//! formulas, not tunable parameters.
//!
//! # Scientific References
//! - Brutsaert, W. (1982). "Evaporation Into the Atmosphere", D. Reidel, 299 pp.
//! - Anderson, E.A. (1976). "A point energy and mass balance model of a snow cover",
//!   NOAA Technical Report NWS 19
//! - List, R.J. (1949). "Smithsonian Meteorological Tables"

/// Boiling temperature of water at sea level (K)
pub const BOIL: f64 = 373.15;

/// Freezing temperature of water (K)
pub const FREEZE: f64 = 273.16;

/// Standard sea-level air pressure (Pa)
pub const SEA_LEVEL: f64 = 1.013246e5;

/// Standard gravitational acceleration (m/s²)
pub const GRAVITY: f64 = 9.80665;

/// Molecular weight of dry air (kg/kmol)
pub const MOL_AIR: f64 = 28.9644;

/// Molecular weight of water vapor (kg/kmol)
pub const MOL_H2O: f64 = 18.0153;

/// Universal gas constant (J / (kmol K))
pub const RGAS: f64 = 8.31432e3;

/// Specific heat of dry air at constant pressure (J/(kg K))
pub const CP_AIR: f64 = 1.005e3;

/// Von Karman constant
pub const VON_KARMAN: f64 = 0.41;

/// Dry adiabatic lapse rate (K/m)
pub const DALR: f64 = GRAVITY / CP_AIR;

/// Standard sea-level air temperature (K)
pub const STD_AIRTMP: f64 = 2.88e2;

/// Standard atmospheric lapse rate (K/km, negative: temperature falls with height)
pub const STD_LAPSE: f64 = -6.5;

/// Stefan-Boltzmann constant (W/(m² K⁴))
pub const STEF_BOLTZ: f64 = 5.67032e-8;

/// Longwave emissivity of snow
pub const SNOW_EMISSIVITY: f64 = 0.98;

/// Density of water at 0°C (kg/m³)
pub const RHO_W0: f64 = 1000.0;

/// Density of ice (kg/m³)
pub const RHO_ICE: f64 = 917.0;

/// Specific heat of water at 0°C (J/(kg K))
pub const CP_W0: f64 = 4217.7;

/// Thermal conductivity of moist sand (J/(m s K))
pub const KT_MOISTSAND: f64 = 1.65;

/// Lowest snow temperature the layer model will carry (°C)
pub const MIN_SNOW_TEMP: f64 = -75.0;

/// Calories to Joules
pub const CAL_TO_J: f64 = 4.186798188;

/// Ratio of molecular weights of water vapor and dry air
const EPSILON: f64 = MOL_H2O / MOL_AIR;

/// Specific humidity from vapor pressure and air pressure
///
/// # Arguments
/// * `e` - Vapor pressure (Pa)
/// * `p` - Air pressure (Pa)
///
/// # Returns
/// Specific humidity (kg/kg)
#[inline]
pub fn spec_hum(e: f64, p: f64) -> f64 {
    EPSILON * e / (p - (1.0 - EPSILON) * e)
}

/// Ideal-gas density (kg/m³)
///
/// # Arguments
/// * `p` - Pressure (Pa)
/// * `m` - Molecular weight (kg/kmol)
/// * `t` - Temperature (K)
#[inline]
pub fn gas_den(p: f64, m: f64, t: f64) -> f64 {
    p * m / (RGAS * t)
}

/// Virtual temperature of moist air (K)
///
/// # Arguments
/// * `t` - Air temperature (K)
/// * `e` - Vapor pressure (Pa)
/// * `p` - Air pressure (Pa)
#[inline]
pub fn vir_temp(t: f64, e: f64, p: f64) -> f64 {
    t / (1.0 - (1.0 - EPSILON) * (e / p))
}

/// Hydrostatic pressure at height `h` above a reference level
///
/// Uses the standard-atmosphere barometric formula, falling back to the
/// isothermal form when the lapse rate is zero.
///
/// # Arguments
/// * `pb` - Pressure at the reference level (Pa)
/// * `tb` - Temperature at the reference level (K)
/// * `lapse` - Lapse rate (K/km)
/// * `h_km` - Height above the reference level (km)
/// * `g` - Gravitational acceleration (m/s²)
/// * `m` - Molecular weight of air (kg/kmol)
///
/// # Returns
/// Pressure at height (Pa)
pub fn hystat(pb: f64, tb: f64, lapse: f64, h_km: f64, g: f64, m: f64) -> f64 {
    if lapse == 0.0 {
        pb * (-g * m * h_km * 1.0e3 / (RGAS * tb)).exp()
    } else {
        pb * (tb / (tb + lapse * h_km)).powf(g * m / (RGAS * lapse * 1.0e-3))
    }
}

/// Latent heat of vaporization (J/kg) at temperature `t` (K)
#[inline]
pub fn lh_vap(t: f64) -> f64 {
    2.5e6 - 2.95573e3 * (t - FREEZE)
}

/// Latent heat of fusion (J/kg) at temperature `t` (K)
#[inline]
pub fn lh_fus(t: f64) -> f64 {
    3.336e5 + 1.6667e2 * (FREEZE - t)
}

/// Latent heat of sublimation (J/kg) at temperature `t` (K)
#[inline]
pub fn lh_sub(t: f64) -> f64 {
    lh_vap(t) + lh_fus(t)
}

/// Specific heat of ice (J/(kg K)) at temperature `t` (K)
#[inline]
pub fn cp_ice(t: f64) -> f64 {
    CAL_TO_J * (0.024928 + 0.00176 * t) / 0.001
}

/// Specific heat of liquid water (J/(kg K)) at temperature `t` (K)
#[inline]
pub fn cp_water(t: f64) -> f64 {
    CP_W0 - 2.55 * (t - FREEZE)
}

/// Diffusion coefficient of water vapor in air (m²/s)
///
/// # Arguments
/// * `p` - Air pressure (Pa)
/// * `t` - Temperature (K)
#[inline]
pub fn diffus(p: f64, t: f64) -> f64 {
    0.65 * (SEA_LEVEL / p) * (t / FREEZE).powi(14) * (0.01 * 0.01)
}

/// Thermal conductivity of snow (J/(m s K)) from its density (kg/m³)
///
/// Yen (1965), as given by Anderson (1976).
#[inline]
pub fn kts(rho: f64) -> f64 {
    let rho_gcc = rho / 1000.0;
    CAL_TO_J * 0.0077 * rho_gcc * rho_gcc * 100.0
}
