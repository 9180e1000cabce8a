use std::f64::consts::PI;

use nalgebra::Vector3;
use serde::Serialize;

use crate::physics::coordinates::WGS84_A;
use crate::physics::gravity::MU_EARTH;

/// Classical Keplerian orbital elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeplerianElements {
    pub sma: f64,       // semi-major axis, m (negative for hyperbolic)
    pub ecc: f64,       // eccentricity
    pub inc: f64,       // inclination, rad
    pub raan: f64,      // right ascension of ascending node, rad
    pub argp: f64,      // argument of perigee, rad
    pub true_anom: f64, // true anomaly, rad
}

impl KeplerianElements {
    /// Osculating elements of an ECI state.
    pub fn from_state_vector(pos: &Vector3<f64>, vel: &Vector3<f64>) -> Self {
        let mu = MU_EARTH;
        let r = pos.norm();
        let v = vel.norm();

        let h = pos.cross(vel);
        let h_mag = h.norm();
        let n = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = n.norm();

        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();

        // Vis-viva; undefined exactly on the parabola
        let energy = 0.5 * v * v - mu / r;
        let sma = if energy.abs() > 1e-12 { -mu / (2.0 * energy) } else { f64::INFINITY };

        let inc = if h_mag > 0.0 { (h.z / h_mag).clamp(-1.0, 1.0).acos() } else { 0.0 };

        let raan = if n_mag > 1e-10 {
            let a = (n.x / n_mag).clamp(-1.0, 1.0).acos();
            if n.y < 0.0 { 2.0 * PI - a } else { a }
        } else {
            0.0
        };

        let argp = if n_mag > 1e-10 && ecc > 1e-10 {
            let w = (n.dot(&e_vec) / (n_mag * ecc)).clamp(-1.0, 1.0).acos();
            if e_vec.z < 0.0 { 2.0 * PI - w } else { w }
        } else {
            0.0
        };

        let true_anom = if ecc > 1e-10 {
            let nu = (e_vec.dot(pos) / (ecc * r)).clamp(-1.0, 1.0).acos();
            if pos.dot(vel) < 0.0 { 2.0 * PI - nu } else { nu }
        } else {
            0.0
        };

        Self { sma, ecc, inc, raan, argp, true_anom }
    }

    /// Semi-latus rectum (m).
    pub fn semi_latus_rectum(&self) -> f64 {
        self.sma * (1.0 - self.ecc * self.ecc)
    }

    pub fn perigee_radius(&self) -> f64 {
        self.semi_latus_rectum() / (1.0 + self.ecc)
    }

    /// Infinite for open trajectories.
    pub fn apogee_radius(&self) -> f64 {
        if self.ecc < 1.0 {
            self.semi_latus_rectum() / (1.0 - self.ecc)
        } else {
            f64::INFINITY
        }
    }

    /// Orbital period (s), `None` for open trajectories.
    pub fn period(&self) -> Option<f64> {
        (self.ecc < 1.0 && self.sma > 0.0).then(|| 2.0 * PI * (self.sma.powi(3) / MU_EARTH).sqrt())
    }
}

// ---------------------------------------------------------------------------
// Orbit insertion check for the final stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitCheck {
    pub time: f64,
    pub elements: KeplerianElements,
    pub perigee_altitude: f64, // m above the equatorial radius
    pub apogee_altitude: f64,
    /// Closed orbit whose perigee clears the equatorial radius.
    pub in_orbit: bool,
}

impl OrbitCheck {
    pub fn from_state(time: f64, pos_eci: &Vector3<f64>, vel_eci: &Vector3<f64>) -> Self {
        let elements = KeplerianElements::from_state_vector(pos_eci, vel_eci);
        let perigee = elements.perigee_radius();
        Self {
            time,
            elements,
            perigee_altitude: perigee - WGS84_A,
            apogee_altitude: elements.apogee_radius() - WGS84_A,
            in_orbit: elements.ecc < 1.0 && perigee > WGS84_A,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular(altitude: f64, inc: f64) -> (Vector3<f64>, Vector3<f64>) {
        let r = WGS84_A + altitude;
        let v = (MU_EARTH / r).sqrt();
        (Vector3::new(r, 0.0, 0.0), Vector3::new(0.0, v * inc.cos(), v * inc.sin()))
    }

    #[test]
    fn circular_leo_elements() {
        let (pos, vel) = circular(400_000.0, 51.6_f64.to_radians());
        let el = KeplerianElements::from_state_vector(&pos, &vel);
        assert!((el.sma - pos.norm()).abs() < 1e-3, "SMA mismatch {}", el.sma);
        assert!(el.ecc < 1e-9, "should be circular, ecc {}", el.ecc);
        assert!((el.inc - 51.6_f64.to_radians()).abs() < 1e-9, "inclination mismatch");
    }

    #[test]
    fn leo_period() {
        let (pos, vel) = circular(400_000.0, 0.0);
        let period = KeplerianElements::from_state_vector(&pos, &vel).period().unwrap();
        // ISS period ~92 min
        assert!(period > 5400.0 && period < 5700.0, "LEO period should be ~92 min, got {:.0} s", period);
    }

    #[test]
    fn circular_orbit_passes_check() {
        let (pos, vel) = circular(300_000.0, 0.5);
        let check = OrbitCheck::from_state(500.0, &pos, &vel);
        assert!(check.in_orbit);
        assert!((check.perigee_altitude - 300_000.0).abs() < 1.0, "perigee {}", check.perigee_altitude);
    }

    #[test]
    fn suborbital_arc_fails_check() {
        let (pos, _) = circular(100_000.0, 0.0);
        let check = OrbitCheck::from_state(100.0, &pos, &Vector3::new(0.0, 2_000.0, 500.0));
        assert!(!check.in_orbit);
        assert!(check.perigee_altitude < 0.0);
    }

    #[test]
    fn escape_trajectory_is_open() {
        let (pos, vel) = circular(500_000.0, 0.0);
        let check = OrbitCheck::from_state(0.0, &pos, &(vel * 1.5));
        assert!(check.elements.ecc > 1.0);
        assert!(!check.in_orbit);
        assert!(check.apogee_altitude.is_infinite());
        assert!(check.elements.period().is_none());
    }
}
