use nalgebra::{Matrix3, Unit, UnitQuaternion, Vector3};

use crate::physics::coordinates::Attitude;
use crate::tables::Table1;

/// Where the commanded attitude comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttitudeSource {
    /// Fixed azimuth/elevation/roll (radians).
    Constant(Attitude),
    /// Tables in degrees against mission time. Without a roll table the
    /// constant roll (radians) is used.
    Table {
        azimuth: Table1,
        elevation: Table1,
        roll: Option<Table1>,
        roll_constant: f64,
    },
}

/// Prescribed attitude plus navigation misalignment and gyro drift.
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeProgram {
    pub source: AttitudeSource,
    /// Fixed navigation-to-body misalignment.
    pub navi_offset: UnitQuaternion<f64>,
    /// Constant gyro bias (rad/s, body axes).
    pub gyro_bias: Vector3<f64>,
}

impl AttitudeProgram {
    pub fn constant(attitude: Attitude) -> Self {
        Self {
            source: AttitudeSource::Constant(attitude),
            navi_offset: UnitQuaternion::identity(),
            gyro_bias: Vector3::zeros(),
        }
    }

    /// Offset from yaw/pitch/roll misalignment in degrees, `Rz * Ry * Rx`.
    pub fn with_offsets_deg(mut self, yaw: f64, pitch: f64, roll: f64) -> Self {
        self.navi_offset = UnitQuaternion::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians());
        self
    }

    /// Gyro bias in deg/h.
    pub fn with_gyro_bias_deg_per_hour(mut self, bias: Vector3<f64>) -> Self {
        self.gyro_bias = bias.map(|b| b.to_radians() / 3600.0);
        self
    }

    /// Commanded attitude at mission time `t`.
    pub fn target(&self, t: f64) -> Attitude {
        match &self.source {
            AttitudeSource::Constant(a) => *a,
            AttitudeSource::Table {
                azimuth,
                elevation,
                roll,
                roll_constant,
            } => Attitude::new(
                azimuth.interp(t).to_radians(),
                elevation.interp(t).to_radians(),
                roll.as_ref().map_or(*roll_constant, |r| r.interp(t).to_radians()),
            ),
        }
    }

    /// Navigation-to-body rotation after `t` seconds of drift.
    pub fn navi_to_body(&self, t: f64) -> UnitQuaternion<f64> {
        let drift = match Unit::try_new(self.gyro_bias, 0.0) {
            Some(axis) => UnitQuaternion::from_axis_angle(&axis, self.gyro_bias.norm() * t),
            None => UnitQuaternion::identity(),
        };
        self.navi_offset * drift
    }

    /// Realized NED -> body DCM: the commanded attitude seen through the
    /// drifted navigation frame.
    pub fn ned_to_body(&self, t: f64, target: &Attitude) -> Matrix3<f64> {
        self.navi_to_body(t).to_rotation_matrix().into_inner() * target.to_dcm()
    }
}
