use nalgebra::Vector3;

use crate::error::SimError;
use crate::tables::{Table1, Table2};

// ---------------------------------------------------------------------------
// Coefficient sources
// ---------------------------------------------------------------------------

/// Axial force coefficient: constant or tabulated against Mach.
#[derive(Debug, Clone, PartialEq)]
pub enum AxialCoefficient {
    Constant(f64),
    Mach(Table1),
}

/// Normal force coefficient: constant or tabulated on a Mach x |angle| [deg] grid.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalCoefficient {
    Constant(f64),
    MachAngle(Table2),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AeroModel {
    pub body_area: f64, // m^2
    pub axial: AxialCoefficient,
    pub axial_multiplier: f64,
    pub normal: NormalCoefficient,
    pub normal_multiplier: f64,
    pub ballistic_coefficient: f64, // kg/m^2
}

impl AeroModel {
    pub fn axial_coefficient(&self, mach: f64) -> f64 {
        let ca = match &self.axial {
            AxialCoefficient::Constant(c) => *c,
            AxialCoefficient::Mach(t) => t.interp(mach),
        };
        ca * self.axial_multiplier
    }

    /// Normal coefficient for one plane, signed like `angle` (radians).
    pub fn normal_coefficient(&self, mach: f64, angle: f64) -> Result<f64, SimError> {
        let deg = angle.to_degrees();
        let sign = if deg.abs() < 1e-9 { 0.0 } else { deg.signum() };
        let magnitude = match &self.normal {
            NormalCoefficient::Constant(c) => *c,
            NormalCoefficient::MachAngle(t) => t.lookup(mach, deg.abs())?,
        };
        Ok(sign * magnitude * self.normal_multiplier)
    }

    /// Body-frame aerodynamic force `[-Fa, -Fn_yaw, -Fn_pitch]` (N).
    ///
    /// `aoa` is `[alpha, beta, gamma]` as produced by
    /// [`angle_of_attack`](crate::physics::coordinates::angle_of_attack).
    pub fn body_force(&self, mach: f64, dynamic_pressure: f64, aoa: &Vector3<f64>) -> Result<Vector3<f64>, SimError> {
        let qs = dynamic_pressure * self.body_area;
        let axial = self.axial_coefficient(mach) * qs;
        let normal_pitch = self.normal_coefficient(mach, aoa.x)? * qs;
        let normal_yaw = self.normal_coefficient(mach, aoa.y)? * qs;
        Ok(Vector3::new(-axial, -normal_yaw, -normal_pitch))
    }

    /// Body-frame force with no normal component, for a vehicle flying at
    /// zero angle of attack.
    pub fn axial_force(&self, mach: f64, dynamic_pressure: f64) -> Vector3<f64> {
        Vector3::new(-self.axial_coefficient(mach) * dynamic_pressure * self.body_area, 0.0, 0.0)
    }

    /// Drag deceleration magnitude `q / beta` for ballistic flight (m/s^2).
    pub fn ballistic_deceleration(&self, dynamic_pressure: f64) -> f64 {
        if self.ballistic_coefficient > 0.0 {
            dynamic_pressure / self.ballistic_coefficient
        } else {
            0.0
        }
    }
}

/// Ballistic drag acceleration in NED, opposite the air-relative velocity.
pub fn ballistic_drag_ned(vel_air_ned: &Vector3<f64>, deceleration: f64) -> Vector3<f64> {
    let speed = vel_air_ned.norm();
    if speed > 1e-9 {
        -deceleration * vel_air_ned / speed
    } else {
        Vector3::zeros()
    }
}

pub fn dynamic_pressure(density: f64, airspeed: f64) -> f64 {
    0.5 * density * airspeed * airspeed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model(normal: NormalCoefficient) -> AeroModel {
        AeroModel {
            body_area: 0.1,
            axial: AxialCoefficient::Mach(Table1::new("CA", vec![0.0, 1.0, 2.0], vec![0.3, 0.5, 0.4]).unwrap()),
            axial_multiplier: 1.0,
            normal,
            normal_multiplier: 2.0,
            ballistic_coefficient: 200.0,
        }
    }

    fn cn_grid() -> NormalCoefficient {
        // CN = 0.1 * angle_deg at every Mach
        let machs = vec![0.0, 5.0];
        let angles = vec![0.0, 10.0, 20.0];
        let values = vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        NormalCoefficient::MachAngle(Table2::new("CN", machs, angles, values).unwrap())
    }

    #[test]
    fn axial_coefficient_clamps_above_table() {
        let m = model(NormalCoefficient::Constant(0.0));
        assert_relative_eq!(m.axial_coefficient(0.5), 0.4);
        assert_relative_eq!(m.axial_coefficient(9.0), 0.4);
    }

    #[test]
    fn normal_force_takes_sign_of_angle() {
        let m = model(cn_grid());
        let up = m.normal_coefficient(1.0, 5f64.to_radians()).unwrap();
        let down = m.normal_coefficient(1.0, -5f64.to_radians()).unwrap();
        assert_relative_eq!(up, 1.0, epsilon = 1e-12);
        assert_relative_eq!(down, -1.0, epsilon = 1e-12);
        assert_eq!(m.normal_coefficient(1.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn normal_lookup_outside_grid_fails() {
        let m = model(cn_grid());
        assert!(m.normal_coefficient(6.0, 0.1).is_err());
        assert!(m.normal_coefficient(1.0, 30f64.to_radians()).is_err());
    }

    #[test]
    fn body_force_components() {
        let m = model(cn_grid());
        let aoa = Vector3::new(10f64.to_radians(), 0.0, 10f64.to_radians());
        let f = m.body_force(1.0, 1000.0, &aoa).unwrap();
        assert_relative_eq!(f.x, -0.5 * 1000.0 * 0.1, epsilon = 1e-9);
        assert_eq!(f.y, 0.0);
        assert_relative_eq!(f.z, -2.0 * 1000.0 * 0.1, epsilon = 1e-9);
    }

    #[test]
    fn ballistic_drag_opposes_air_velocity() {
        let v = Vector3::new(30.0, -40.0, 0.0);
        let d = ballistic_drag_ned(&v, 2.0);
        assert_relative_eq!(d, Vector3::new(-1.2, 1.6, 0.0), epsilon = 1e-12);
        assert_eq!(ballistic_drag_ned(&Vector3::zeros(), 2.0), Vector3::zeros());
    }
}
