use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Matrix3, Rotation3, Vector3};

// ---------------------------------------------------------------------------
// WGS84 ellipsoid and Earth rotation
// ---------------------------------------------------------------------------

pub const WGS84_A: f64 = 6_378_137.0;
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
pub const WGS84_ED2: f64 = WGS84_E2 * WGS84_A * WGS84_A / (WGS84_B * WGS84_B);
pub const OMEGA_EARTH: f64 = 7.292_115e-5; // rad/s

/// ECI -> ECEF rotation after `t` seconds of Earth rotation from epoch.
pub fn dcm_eci_to_ecef(t: f64) -> Matrix3<f64> {
    let (s, c) = (OMEGA_EARTH * t).sin_cos();
    Matrix3::new(
        c, s, 0.0, //
        -s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

// ---------------------------------------------------------------------------
// Geodetic <-> ECEF
// ---------------------------------------------------------------------------

/// Geodetic `[lat_deg, lon_deg, alt_m]` to ECEF (m).
pub fn llh_to_ecef(llh: &Vector3<f64>) -> Vector3<f64> {
    let (slat, clat) = llh.x.to_radians().sin_cos();
    let (slon, clon) = llh.y.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * slat * slat).sqrt();
    Vector3::new(
        (n + llh.z) * clat * clon,
        (n + llh.z) * clat * slon,
        (n * (1.0 - WGS84_E2) + llh.z) * slat,
    )
}

/// ECEF (m) to geodetic `[lat_deg, lon_deg, alt_m]` (closed form, no iteration).
pub fn ecef_to_llh(ecef: &Vector3<f64>) -> Vector3<f64> {
    let p = ecef.x.hypot(ecef.y);
    let theta = (ecef.z * WGS84_A).atan2(p * WGS84_B);
    let (st, ct) = theta.sin_cos();
    let lat = (ecef.z + WGS84_ED2 * WGS84_B * st.powi(3)).atan2(p - WGS84_E2 * WGS84_A * ct.powi(3));
    let lon = ecef.y.atan2(ecef.x);
    let slat = lat.sin();
    let n = WGS84_A / (1.0 - WGS84_E2 * slat * slat).sqrt();
    let alt = p / lat.cos() - n;
    Vector3::new(lat.to_degrees(), lon.to_degrees(), alt)
}

pub fn eci_to_llh(pos_eci: &Vector3<f64>, t: f64) -> Vector3<f64> {
    ecef_to_llh(&(dcm_eci_to_ecef(t) * pos_eci))
}

pub fn llh_to_eci(llh: &Vector3<f64>, t: f64) -> Vector3<f64> {
    dcm_eci_to_ecef(t).transpose() * llh_to_ecef(llh)
}

// ---------------------------------------------------------------------------
// Local frames
// ---------------------------------------------------------------------------

/// ECEF -> NED at the given geodetic latitude/longitude (degrees).
pub fn dcm_ecef_to_ned(lat_deg: f64, lon_deg: f64) -> Matrix3<f64> {
    let (slat, clat) = lat_deg.to_radians().sin_cos();
    let (slon, clon) = lon_deg.to_radians().sin_cos();
    Matrix3::new(
        -slat * clon, -slat * slon, clat, //
        -slon, clon, 0.0, //
        -clat * clon, -clat * slon, -slat,
    )
}

pub fn dcm_eci_to_ned(llh: &Vector3<f64>, t: f64) -> Matrix3<f64> {
    dcm_ecef_to_ned(llh.x, llh.y) * dcm_eci_to_ecef(t)
}

/// NED -> body for a 3-2-1 sequence (azimuth, elevation, roll in radians).
///
/// The body x axis points along `[cos az cos el, sin az cos el, -sin el]`
/// in NED.
pub fn dcm_ned_to_body(azimuth: f64, elevation: f64, roll: f64) -> Matrix3<f64> {
    let body_to_ned = Rotation3::from_axis_angle(&Vector3::z_axis(), azimuth)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), elevation)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
    body_to_ned.matrix().transpose()
}

/// Prescribed body attitude relative to the local horizon (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    pub azimuth: f64,
    pub elevation: f64,
    pub roll: f64,
}

impl Attitude {
    pub fn new(azimuth: f64, elevation: f64, roll: f64) -> Self {
        Self { azimuth, elevation, roll }
    }

    pub fn to_dcm(&self) -> Matrix3<f64> {
        dcm_ned_to_body(self.azimuth, self.elevation, self.roll)
    }

    /// Inverse of [`Attitude::to_dcm`].
    ///
    /// Elevation comes from `asin` and so already lands in [-90°, 90°];
    /// an attitude pitched over the top, `(az, el, roll)` with `el > 90°`,
    /// decomposes to its equivalent `(az + 180°, 180° - el, roll + 180°)`.
    /// Azimuth and roll are wrapped to (-180°, 180°].
    /// At gimbal lock (`1 - |sin el| <= 1e-12`) roll is set to zero and the
    /// whole heading goes into azimuth.
    pub fn from_dcm(ned_to_body: &Matrix3<f64>) -> Self {
        let r = ned_to_body.transpose();
        let sin_el = (-r[(2, 0)]).clamp(-1.0, 1.0);
        let elevation = sin_el.asin();
        let (azimuth, roll) = if 1.0 - sin_el.abs() <= 1e-12 {
            ((-r[(0, 1)]).atan2(r[(1, 1)]), 0.0)
        } else {
            (r[(1, 0)].atan2(r[(0, 0)]), r[(2, 1)].atan2(r[(2, 2)]))
        };
        Self {
            azimuth: wrap_pi(azimuth),
            elevation,
            roll: wrap_pi(roll),
        }
    }
}

fn wrap_pi(a: f64) -> f64 {
    let mut a = a % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

// ---------------------------------------------------------------------------
// Velocities
// ---------------------------------------------------------------------------

/// Earth-rotation velocity `Ω × r` for a position in ECI.
pub fn earth_rotation_velocity(pos_eci: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(-OMEGA_EARTH * pos_eci.y, OMEGA_EARTH * pos_eci.x, 0.0)
}

/// Inertial velocity to ground-relative velocity in NED.
pub fn vel_eci_to_ned(
    vel_eci: &Vector3<f64>,
    pos_eci: &Vector3<f64>,
    dcm_eci_to_ned: &Matrix3<f64>,
) -> Vector3<f64> {
    dcm_eci_to_ned * (vel_eci - earth_rotation_velocity(pos_eci))
}

/// Ground-relative NED velocity back to inertial velocity.
pub fn vel_ned_to_eci(
    vel_ned: &Vector3<f64>,
    pos_eci: &Vector3<f64>,
    dcm_eci_to_ned: &Matrix3<f64>,
) -> Vector3<f64> {
    dcm_eci_to_ned.transpose() * vel_ned + earth_rotation_velocity(pos_eci)
}

/// Heading and flight-path angle of a NED vector (radians).
pub fn azimuth_elevation(v_ned: &Vector3<f64>) -> (f64, f64) {
    let azimuth = FRAC_PI_2 - v_ned.x.atan2(v_ned.y);
    let elevation = (-v_ned.z).atan2(v_ned.x.hypot(v_ned.y));
    (azimuth, elevation)
}

/// Wind vector in NED from speed (m/s) and meteorological direction (deg,
/// the direction the wind blows from).
pub fn wind_ned(speed: f64, direction_deg: f64) -> Vector3<f64> {
    let (s, c) = direction_deg.to_radians().sin_cos();
    Vector3::new(-speed * c, -speed * s, 0.0)
}

/// Great-circle distance between two geodetic points (m).
pub fn surface_distance(llh0: &Vector3<f64>, llh1: &Vector3<f64>) -> f64 {
    let p0 = llh_to_ecef(llh0);
    let p1 = llh_to_ecef(llh1);
    let denom = p0.norm() * p1.norm();
    if denom == 0.0 {
        return 0.0;
    }
    WGS84_A * (p0.dot(&p1) / denom).clamp(-1.0, 1.0).acos()
}

/// Angle of attack `[alpha, beta, gamma]` from air-relative body velocity.
///
/// `alpha` is the pitch plane angle, `beta` the yaw plane angle, and
/// `gamma` the total angle between body x and the air velocity.
pub fn angle_of_attack(vel_air_body: &Vector3<f64>) -> Vector3<f64> {
    let v = vel_air_body;
    if v.x.abs() < 1e-3 || v.norm() < 0.01 {
        return Vector3::zeros();
    }
    Vector3::new(
        v.z.atan2(v.x),
        v.y.atan2(v.x),
        v.y.hypot(v.z).atan2(v.x),
    )
}
