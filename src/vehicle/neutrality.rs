use nalgebra::Vector3;

use crate::error::SimError;
use crate::tables::{Table1, Table2};

/// Station tables for trimming the thrust vector against aerodynamic moments.
///
/// Stations are measured along the body axis in the STA convention (aft
/// positive); the solver flips them to body +X by subtracting the offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Neutrality {
    pub cg: Table1,         // time [s] -> CG station [m]
    pub controller: Table1, // time [s] -> gimbal station [m]
    pub cp: Table2,         // Mach x |angle| [deg] -> CP station [m]
    pub cg_offset: Vector3<f64>,
    pub cp_offset: Vector3<f64>,
    pub controller_offset: Vector3<f64>,
}

/// Longitudinal stations resolved for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stations {
    pub cg: f64,
    pub controller: f64,
    pub cp_pitch: f64,
    pub cp_yaw: f64,
}

impl Neutrality {
    /// `alpha` and `beta` in radians.
    pub fn stations(&self, t: f64, mach: f64, alpha: f64, beta: f64) -> Result<Stations, SimError> {
        Ok(Stations {
            cg: self.cg.interp(t) - self.cg_offset.x,
            controller: self.controller.interp(t) - self.controller_offset.x,
            cp_pitch: self.cp.lookup(mach, alpha.to_degrees().abs())? - self.cp_offset.x,
            cp_yaw: self.cp.lookup(mach, beta.to_degrees().abs())? - self.cp_offset.x,
        })
    }
}
