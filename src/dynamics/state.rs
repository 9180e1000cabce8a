use nalgebra::{SVector, Vector3};

use crate::physics::coordinates::{dcm_eci_to_ned, eci_to_llh, llh_to_eci, vel_ned_to_eci};
use crate::vehicle::environment::LaunchSite;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;

/// Integrated vector `[mass, pos_eci (3), vel_eci (3)]`.
pub type StateVector = SVector<f64, 7>;

// ---------------------------------------------------------------------------
// Flight state: mass, ECI position, ECI velocity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightState {
    pub mass: f64,              // kg
    pub pos_eci: Vector3<f64>,  // m
    pub vel_eci: Vector3<f64>,  // m/s
}

impl FlightState {
    /// State at mission time 0 for a vehicle sitting at `site`.
    pub fn at_launch(site: &LaunchSite, mass: f64) -> Self {
        let pos_eci = llh_to_eci(&site.position_llh, 0.0);
        let dcm = dcm_eci_to_ned(&site.position_llh, 0.0);
        Self {
            mass,
            pos_eci,
            vel_eci: vel_ned_to_eci(&site.velocity_ned, &pos_eci, &dcm),
        }
    }

    pub fn from_vector(x: &StateVector) -> Self {
        Self {
            mass: x[0],
            pos_eci: x.fixed_rows::<3>(1).into_owned(),
            vel_eci: x.fixed_rows::<3>(4).into_owned(),
        }
    }

    pub fn to_vector(&self) -> StateVector {
        pack(self.mass, &self.pos_eci, &self.vel_eci)
    }

    /// Geodetic position `[lat_deg, lon_deg, alt_m]` at mission time `t`.
    pub fn llh(&self, t: f64) -> Vector3<f64> {
        eci_to_llh(&self.pos_eci, t)
    }
}

/// Time derivative of the state: mass rate, velocity, acceleration.
pub fn derivative(mass_rate: f64, vel_eci: &Vector3<f64>, acc_eci: &Vector3<f64>) -> StateVector {
    pack(mass_rate, vel_eci, acc_eci)
}

fn pack(s: f64, a: &Vector3<f64>, b: &Vector3<f64>) -> StateVector {
    StateVector::from_column_slice(&[s, a.x, a.y, a.z, b.x, b.y, b.z])
}
