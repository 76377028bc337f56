//! Point forcing records
//!
//! One `PointMeteorology` sample describes the atmosphere above a cell at one
//! instant. The driver supplies two per data step (start and end of the
//! interval); both are read-only to the physics.

use super::constants::FREEZE;
use serde::{Deserialize, Serialize};

/// Meteorological forcing at a point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointMeteorology {
    /// Incoming thermal (longwave) radiation (W/m²)
    pub i_lw: f64,
    /// Air temperature (K)
    pub t_a: f64,
    /// Vapor pressure of air (Pa)
    pub e_a: f64,
    /// Wind speed (m/s)
    pub u: f64,
    /// Soil temperature at the ground measurement depth (K)
    pub t_g: f64,
    /// Net shortwave radiation (W/m²)
    pub s_n: f64,
}

impl PointMeteorology {
    /// Linear blend toward `other`
    ///
    /// `fraction` = 0 returns `self`, 1 returns `other`.
    pub fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        let lerp = |a: f64, b: f64| a + (b - a) * fraction;
        Self {
            i_lw: lerp(self.i_lw, other.i_lw),
            t_a: lerp(self.t_a, other.t_a),
            e_a: lerp(self.e_a, other.e_a),
            u: lerp(self.u, other.u),
            t_g: lerp(self.t_g, other.t_g),
            s_n: lerp(self.s_n, other.s_n),
        }
    }
}

/// Precipitation falling during one data step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Precipitation {
    /// Total precipitation mass (kg/m²)
    pub m_pp: f64,
    /// Fraction of the mass falling as snow (0-1)
    pub percent_snow: f64,
    /// Density of the falling snow (kg/m³)
    pub rho_snow: f64,
    /// Precipitation temperature (K)
    pub t_pp: f64,
}

impl Precipitation {
    /// Whether any precipitation falls this step
    #[inline]
    pub fn is_falling(&self) -> bool {
        self.m_pp > 0.0
    }

    /// Mass falling as snow (kg/m²)
    ///
    /// Snow without a positive density cannot form a layer and counts as rain.
    #[inline]
    pub fn m_snow(&self) -> f64 {
        if self.rho_snow > 0.0 {
            self.m_pp * self.percent_snow.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Mass falling as rain, including snow without a density (kg/m²)
    #[inline]
    pub fn m_rain(&self) -> f64 {
        self.m_pp - self.m_snow()
    }

    /// Temperature of the snow component, never above freezing (K)
    #[inline]
    pub fn t_snow(&self) -> f64 {
        self.t_pp.min(FREEZE)
    }

    /// Temperature of the rain component, never below freezing (K)
    #[inline]
    pub fn t_rain(&self) -> f64 {
        self.t_pp.max(FREEZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_endpoints_and_midpoint() {
        let a = PointMeteorology {
            i_lw: 200.0,
            t_a: 260.0,
            e_a: 200.0,
            u: 2.0,
            t_g: 272.0,
            s_n: 0.0,
        };
        let b = PointMeteorology {
            i_lw: 300.0,
            t_a: 270.0,
            e_a: 300.0,
            u: 4.0,
            t_g: 272.0,
            s_n: 400.0,
        };

        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 1.0), b);

        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.t_a, 265.0);
        assert_eq!(mid.s_n, 200.0);
    }

    #[test]
    fn test_precipitation_partition() {
        let p = Precipitation {
            m_pp: 10.0,
            percent_snow: 0.25,
            rho_snow: 100.0,
            t_pp: 274.0,
        };

        assert!(p.is_falling());
        assert_eq!(p.m_snow(), 2.5);
        assert_eq!(p.m_rain(), 7.5);
        assert_eq!(p.t_snow(), FREEZE);
        assert_eq!(p.t_rain(), 274.0);
        assert!(!Precipitation::default().is_falling());
    }

    #[test]
    fn test_snow_without_density_falls_as_rain() {
        let p = Precipitation {
            m_pp: 4.0,
            percent_snow: 1.0,
            rho_snow: 0.0,
            t_pp: 270.0,
        };

        assert_eq!(p.m_snow(), 0.0);
        assert_eq!(p.m_rain(), 4.0);
    }
}
