use nalgebra::{Matrix3, Vector3};

use crate::dynamics::state::G0;
use crate::physics::coordinates::eci_to_llh;

/// Instantaneous impact point under a flat Earth with constant gravity and
/// no drag, as `[lat_deg, lon_deg, alt_m]`.
///
/// `llh` and `dcm_eci_to_ned` describe the current position, `vel_ned` is
/// the ground-relative velocity. Returns `None` when the fall time has no
/// real solution (only possible below the surface).
pub fn impact_point(
    t: f64,
    pos_eci: &Vector3<f64>,
    llh: &Vector3<f64>,
    vel_ned: &Vector3<f64>,
    dcm_eci_to_ned: &Matrix3<f64>,
) -> Option<Vector3<f64>> {
    let h = llh.z;
    let v_up = -vel_ned.z;
    let disc = v_up * v_up + 2.0 * h * G0;
    if disc < 0.0 {
        return None;
    }
    let tau = (v_up + disc.sqrt()) / G0;

    let offset_ned = Vector3::new(vel_ned.x * tau, vel_ned.y * tau, h);
    let pos = pos_eci + dcm_eci_to_ned.transpose() * offset_ned;
    Some(eci_to_llh(&pos, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::coordinates::{dcm_eci_to_ned, llh_to_eci, surface_distance};

    fn iip(llh: Vector3<f64>, vel_ned: Vector3<f64>) -> Option<Vector3<f64>> {
        let pos = llh_to_eci(&llh, 0.0);
        impact_point(0.0, &pos, &llh, &vel_ned, &dcm_eci_to_ned(&llh, 0.0))
    }

    #[test]
    fn hovering_vehicle_lands_below_itself() {
        let llh = Vector3::new(35.0, 139.0, 5_000.0);
        let p = iip(llh, Vector3::zeros()).unwrap();
        assert!((p.x - 35.0).abs() < 1e-6 && (p.y - 139.0).abs() < 1e-6, "{p:?}");
        assert!(p.z.abs() < 1.0, "impact altitude {}", p.z);
    }

    #[test]
    fn range_matches_flat_earth_ballistics() {
        let llh = Vector3::new(0.0, 0.0, 1_000.0);
        let (vn, vup) = (100.0, 50.0);
        let p = iip(llh, Vector3::new(vn, 0.0, -vup)).unwrap();
        let tau = (vup + (vup * vup + 2.0 * 1_000.0 * G0).sqrt()) / G0;
        let range = surface_distance(&llh, &p);
        assert!((range - vn * tau).abs() / (vn * tau) < 1e-3, "range {} vs {}", range, vn * tau);
        assert!(p.x > 0.0, "should land north, got {p:?}");
    }

    #[test]
    fn no_impact_point_deep_underground() {
        assert!(iip(Vector3::new(0.0, 0.0, -1_000.0), Vector3::zeros()).is_none());
    }
}
