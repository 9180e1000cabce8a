use nalgebra::Vector3;

use crate::error::ConfigError;
use crate::tables::Table1;

/// Horizontal wind: constant, or an altitude profile stored as its
/// `u` (east-ish) / `v` (north-ish) components so interpolation never
/// wraps through the 0/360 direction seam.
#[derive(Debug, Clone, PartialEq)]
pub enum WindModel {
    Constant { speed: f64, direction_deg: f64 },
    Profile { u: Table1, v: Table1 },
}

impl Default for WindModel {
    fn default() -> Self {
        WindModel::Constant {
            speed: 0.0,
            direction_deg: 0.0,
        }
    }
}

impl WindModel {
    /// Build a profile from altitude [m], speed [m/s] and direction [deg] columns.
    pub fn profile(altitude: Vec<f64>, speed: &[f64], direction_deg: &[f64]) -> Result<Self, ConfigError> {
        let (u, v): (Vec<f64>, Vec<f64>) = speed
            .iter()
            .zip(direction_deg)
            .map(|(ws, wd)| {
                let (s, c) = wd.to_radians().sin_cos();
                (-ws * s, -ws * c)
            })
            .unzip();
        Ok(WindModel::Profile {
            u: Table1::new("wind u", altitude.clone(), u)?,
            v: Table1::new("wind v", altitude, v)?,
        })
    }

    /// Wind speed [m/s] and direction [deg] at `altitude`.
    pub fn at(&self, altitude: f64) -> (f64, f64) {
        match self {
            WindModel::Constant { speed, direction_deg } => (*speed, *direction_deg),
            WindModel::Profile { u, v } => {
                let (wu, wv) = (u.interp(altitude), v.interp(altitude));
                (wu.hypot(wv), wu.atan2(wv).to_degrees() + 180.0)
            }
        }
    }
}

/// Launch point and initial ground-relative velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchSite {
    /// `[lat_deg, lon_deg, alt_m]`
    pub position_llh: Vector3<f64>,
    pub velocity_ned: Vector3<f64>,
}

impl Default for LaunchSite {
    fn default() -> Self {
        Self {
            position_llh: Vector3::zeros(),
            velocity_ned: Vector3::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn profile_recovers_speed_and_direction() {
        let w = WindModel::profile(vec![0.0, 1000.0], &[4.0, 10.0], &[90.0, 270.0]).unwrap();
        let (s, d) = w.at(0.0);
        assert_relative_eq!(s, 4.0, epsilon = 1e-12);
        assert_relative_eq!(d, 90.0, epsilon = 1e-9);
        let (s, d) = w.at(5000.0);
        assert_relative_eq!(s, 10.0, epsilon = 1e-12);
        assert_relative_eq!(d, 270.0, epsilon = 1e-9);
    }

    #[test]
    fn opposing_winds_cancel_midway() {
        let w = WindModel::profile(vec![0.0, 1000.0], &[5.0, 5.0], &[0.0, 180.0]).unwrap();
        let (s, _) = w.at(500.0);
        assert!(s < 1e-9, "expected calm, got {s}");
    }
}
