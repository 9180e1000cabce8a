use nalgebra::Vector3;

use crate::vehicle::neutrality::{Neutrality, Stations};

// ---------------------------------------------------------------------------
// Thrust vector trim for moment neutrality
// ---------------------------------------------------------------------------

/// Body-frame thrust and the gimbal angles that produced it (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GimbalSolution {
    pub thrust_body: Vector3<f64>,
    pub pitch: f64,
    pub yaw: f64,
}

impl GimbalSolution {
    /// Thrust along body +X, no deflection.
    pub fn axial(thrust: f64) -> Self {
        Self {
            thrust_body: Vector3::new(thrust, 0.0, 0.0),
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

/// Deflect the thrust so its moment about the CG cancels the aerodynamic
/// moment in both planes.
///
/// Falls back to axial thrust whenever no real deflection exists (the
/// required sine leaves (-1, 1) or a solved angle reaches ±90°).
pub fn trim(thrust: f64, aero_body: &Vector3<f64>, stations: &Stations, n: &Neutrality) -> GimbalSolution {
    if !(thrust > 0.0) {
        return GimbalSolution::axial(thrust);
    }

    // Thrust lever arm, CG to controller
    let dxt = stations.controller - stations.cg;
    let dyt = n.cg_offset.y - n.controller_offset.y;
    let dzt = n.cg_offset.z - n.controller_offset.z;

    // Aero lever arm, CP to CG
    let dxp_yaw = stations.cg - stations.cp_yaw;
    let dxp_pitch = stations.cg - stations.cp_pitch;
    let dyp = n.cp_offset.y - n.cg_offset.y;
    let dzp = n.cp_offset.z - n.cg_offset.z;

    let f = aero_body;
    let sin_yaw = (-f.y * dxp_yaw + f.x * dyp) / thrust / dxt.hypot(dyt);
    let sin_pitch = (-f.z * dxp_pitch + f.x * dzp) / thrust / dxt.hypot(dzt);
    if !(sin_yaw.abs() < 1.0 && sin_pitch.abs() < 1.0) {
        return GimbalSolution::axial(thrust);
    }

    let yaw0 = sin_yaw.asin() - dyt.atan2(dxt);
    let pitch = sin_pitch.asin() - dzt.atan2(dxt);
    let half = std::f64::consts::FRAC_PI_2;
    if !(yaw0.abs() < half && pitch.abs() < half) {
        return GimbalSolution::axial(thrust);
    }

    let yaw = (yaw0.tan() * pitch.cos()).atan();
    GimbalSolution {
        thrust_body: Vector3::new(
            thrust * yaw.cos() * pitch.cos(),
            -thrust * yaw.sin(),
            -thrust * yaw.cos() * pitch.sin(),
        ),
        pitch,
        yaw,
    }
}
