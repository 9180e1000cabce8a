use nalgebra::Vector3;

use crate::physics::coordinates::{WGS84_A, WGS84_B};

// ---------------------------------------------------------------------------
// Oblate-Earth gravity (ECI), normalized J2 zonal term
// ---------------------------------------------------------------------------

pub const MU_EARTH: f64 = 3.986_004_418e14; // m^3/s^2
pub const C20_NORMALIZED: f64 = -0.484_165_371_736e-3;

/// Gravitational acceleration in ECI for a position in ECI (m).
///
/// Radius is clamped to the polar radius so a vehicle that has sunk below
/// the ellipsoid (after impact) never sees a singular field.
pub fn gravity_eci(pos: &Vector3<f64>) -> Vector3<f64> {
    let r_raw = pos.norm();
    let ir = if r_raw > 0.0 { pos / r_raw } else { Vector3::zeros() };
    let r = r_raw.max(WGS84_B);

    let irz = ir.z;
    let p20 = 5.0_f64.sqrt() * (3.0 * irz * irz - 1.0) * 0.5;
    let p20_dash = 5.0_f64.sqrt() * 3.0 * irz;

    let a_r2 = (WGS84_A / r).powi(2);
    let mu_r2 = MU_EARTH / (r * r);
    let g_ir = -mu_r2 * (1.0 + C20_NORMALIZED * a_r2 * (3.0 * p20 + irz * p20_dash));
    let g_iz = mu_r2 * a_r2 * C20_NORMALIZED * p20_dash;

    g_ir * ir + Vector3::new(0.0, 0.0, g_iz)
}
