use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::dynamics::evaluator::DerivedKinematics;
use crate::error::SimError;
use crate::orbital::iip::impact_point;

// ---------------------------------------------------------------------------
// Trajectory record: one output row
// ---------------------------------------------------------------------------

/// Column headers, in output order.
pub const HEADER: [&str; 59] = [
    "time(s)", "mass(kg)", "thrust(N)", "lat(deg)", "lon(deg)", "altitude(m)",
    "pos_ECI_X(m)", "pos_ECI_Y(m)", "pos_ECI_Z(m)",
    "vel_ECI_X(m/s)", "vel_ECI_Y(m/s)", "vel_ECI_Z(m/s)",
    "vel_NED_X(m/s)", "vel_NED_Y(m/s)", "vel_NED_Z(m/s)",
    "acc_ECI_X(m/s2)", "acc_ECI_Y(m/s2)", "acc_ECI_Z(m/s2)",
    "acc_Body_X(m/s2)", "acc_Body_Y(m/s2)", "acc_Body_Z(m/s2)",
    "Isp(s)", "Mach number",
    "attitude_azimuth(deg)", "attitude_elevation(deg)", "attitude_roll(deg)",
    "angle of attack alpha(deg)", "angle of attack beta(deg)", "all angle of attack gamma(deg)",
    "dynamic pressure(Pa)",
    "aeroforce_Body_X[N]", "aeroforce_Body_Y[N]", "aeroforce_Body_Z[N]",
    "thrust_Body_X[N]", "thrust_Body_Y[N]", "thrust_Body_Z[N]",
    "gimbal_angle_pitch(deg)", "gimbal_angle_yaw(deg)",
    "wind speed(m/s)", "wind direction(deg)", "downrange(m)",
    "IIP_lat(deg)", "IIP_lon(deg)",
    "dcmBODY2ECI_11", "dcmBODY2ECI_12", "dcmBODY2ECI_13",
    "dcmBODY2ECI_21", "dcmBODY2ECI_22", "dcmBODY2ECI_23",
    "dcmBODY2ECI_31", "dcmBODY2ECI_32", "dcmBODY2ECI_33",
    "inertial velocity(m/s)", "kinematic_energy_NED(J)",
    "loss_gravity(m/s2)", "loss_aerodynamics(m/s2)", "loss_thrust(m/s2)",
    "is_powered(1=powered 0=free)", "is_separated(1=already 0=still)",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryRecord {
    #[serde(rename = "time(s)")]
    pub time: f64,
    #[serde(rename = "mass(kg)")]
    pub mass: f64,
    #[serde(rename = "thrust(N)")]
    pub thrust: f64,
    #[serde(rename = "lat(deg)")]
    pub lat: f64,
    #[serde(rename = "lon(deg)")]
    pub lon: f64,
    #[serde(rename = "altitude(m)")]
    pub altitude: f64,
    #[serde(rename = "pos_ECI_X(m)")]
    pub pos_eci_x: f64,
    #[serde(rename = "pos_ECI_Y(m)")]
    pub pos_eci_y: f64,
    #[serde(rename = "pos_ECI_Z(m)")]
    pub pos_eci_z: f64,
    #[serde(rename = "vel_ECI_X(m/s)")]
    pub vel_eci_x: f64,
    #[serde(rename = "vel_ECI_Y(m/s)")]
    pub vel_eci_y: f64,
    #[serde(rename = "vel_ECI_Z(m/s)")]
    pub vel_eci_z: f64,
    #[serde(rename = "vel_NED_X(m/s)")]
    pub vel_ned_x: f64,
    #[serde(rename = "vel_NED_Y(m/s)")]
    pub vel_ned_y: f64,
    #[serde(rename = "vel_NED_Z(m/s)")]
    pub vel_ned_z: f64,
    #[serde(rename = "acc_ECI_X(m/s2)")]
    pub acc_eci_x: f64,
    #[serde(rename = "acc_ECI_Y(m/s2)")]
    pub acc_eci_y: f64,
    #[serde(rename = "acc_ECI_Z(m/s2)")]
    pub acc_eci_z: f64,
    #[serde(rename = "acc_Body_X(m/s2)")]
    pub acc_body_x: f64,
    #[serde(rename = "acc_Body_Y(m/s2)")]
    pub acc_body_y: f64,
    #[serde(rename = "acc_Body_Z(m/s2)")]
    pub acc_body_z: f64,
    #[serde(rename = "Isp(s)")]
    pub isp: f64,
    #[serde(rename = "Mach number")]
    pub mach: f64,
    #[serde(rename = "attitude_azimuth(deg)")]
    pub azimuth: f64,
    #[serde(rename = "attitude_elevation(deg)")]
    pub elevation: f64,
    #[serde(rename = "attitude_roll(deg)")]
    pub roll: f64,
    #[serde(rename = "angle of attack alpha(deg)")]
    pub alpha: f64,
    #[serde(rename = "angle of attack beta(deg)")]
    pub beta: f64,
    #[serde(rename = "all angle of attack gamma(deg)")]
    pub gamma: f64,
    #[serde(rename = "dynamic pressure(Pa)")]
    pub dynamic_pressure: f64,
    #[serde(rename = "aeroforce_Body_X[N]")]
    pub aero_body_x: f64,
    #[serde(rename = "aeroforce_Body_Y[N]")]
    pub aero_body_y: f64,
    #[serde(rename = "aeroforce_Body_Z[N]")]
    pub aero_body_z: f64,
    #[serde(rename = "thrust_Body_X[N]")]
    pub thrust_body_x: f64,
    #[serde(rename = "thrust_Body_Y[N]")]
    pub thrust_body_y: f64,
    #[serde(rename = "thrust_Body_Z[N]")]
    pub thrust_body_z: f64,
    #[serde(rename = "gimbal_angle_pitch(deg)")]
    pub gimbal_pitch: f64,
    #[serde(rename = "gimbal_angle_yaw(deg)")]
    pub gimbal_yaw: f64,
    #[serde(rename = "wind speed(m/s)")]
    pub wind_speed: f64,
    #[serde(rename = "wind direction(deg)")]
    pub wind_direction: f64,
    #[serde(rename = "downrange(m)")]
    pub downrange: f64,
    #[serde(rename = "IIP_lat(deg)")]
    pub iip_lat: Option<f64>,
    #[serde(rename = "IIP_lon(deg)")]
    pub iip_lon: Option<f64>,
    #[serde(rename = "dcmBODY2ECI_11")]
    pub dcm_11: f64,
    #[serde(rename = "dcmBODY2ECI_12")]
    pub dcm_12: f64,
    #[serde(rename = "dcmBODY2ECI_13")]
    pub dcm_13: f64,
    #[serde(rename = "dcmBODY2ECI_21")]
    pub dcm_21: f64,
    #[serde(rename = "dcmBODY2ECI_22")]
    pub dcm_22: f64,
    #[serde(rename = "dcmBODY2ECI_23")]
    pub dcm_23: f64,
    #[serde(rename = "dcmBODY2ECI_31")]
    pub dcm_31: f64,
    #[serde(rename = "dcmBODY2ECI_32")]
    pub dcm_32: f64,
    #[serde(rename = "dcmBODY2ECI_33")]
    pub dcm_33: f64,
    #[serde(rename = "inertial velocity(m/s)")]
    pub inertial_speed: f64,
    #[serde(rename = "kinematic_energy_NED(J)")]
    pub kinetic_energy: f64,
    #[serde(rename = "loss_gravity(m/s2)")]
    pub loss_gravity: f64,
    #[serde(rename = "loss_aerodynamics(m/s2)")]
    pub loss_aerodynamics: f64,
    #[serde(rename = "loss_thrust(m/s2)")]
    pub loss_thrust: f64,
    #[serde(rename = "is_powered(1=powered 0=free)", serialize_with = "flag")]
    pub is_powered: bool,
    #[serde(rename = "is_separated(1=already 0=still)", serialize_with = "flag")]
    pub is_separated: bool,
}

fn flag<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*v))
}

impl TrajectoryRecord {
    /// Build the row for one evaluated instant. `exit_area` is the nozzle
    /// exit area of the flying stage (m^2).
    pub fn from_kinematics(k: &DerivedKinematics, exit_area: f64, is_separated: bool) -> Self {
        let acc_body = k.dcm_eci_to_body() * (k.acc_eci - k.gravity_eci);
        let dcm = k.dcm_body_to_eci();
        let iip = impact_point(k.time, &k.pos_eci, &k.llh, &k.vel_ned, &k.dcm_eci_to_ned);

        let thrusting = k.thrust.thrust > 0.1;
        let loss_gravity = if thrusting || !is_separated {
            let g_ned = k.dcm_eci_to_ned * k.gravity_eci;
            let path = (-k.vel_ned.z).atan2(k.vel_ned.x.hypot(k.vel_ned.y));
            g_ned.z * path.sin()
        } else {
            0.0
        };
        let loss_thrust = if thrusting { k.air.pressure * exit_area / k.mass } else { 0.0 };

        Self {
            time: k.time,
            mass: k.mass,
            thrust: k.thrust.thrust,
            lat: k.llh.x,
            lon: k.llh.y,
            altitude: k.llh.z,
            pos_eci_x: k.pos_eci.x,
            pos_eci_y: k.pos_eci.y,
            pos_eci_z: k.pos_eci.z,
            vel_eci_x: k.vel_eci.x,
            vel_eci_y: k.vel_eci.y,
            vel_eci_z: k.vel_eci.z,
            vel_ned_x: k.vel_ned.x,
            vel_ned_y: k.vel_ned.y,
            vel_ned_z: k.vel_ned.z,
            acc_eci_x: k.acc_eci.x,
            acc_eci_y: k.acc_eci.y,
            acc_eci_z: k.acc_eci.z,
            acc_body_x: acc_body.x,
            acc_body_y: acc_body.y,
            acc_body_z: acc_body.z,
            isp: k.thrust.isp,
            mach: k.mach,
            azimuth: k.attitude.azimuth.to_degrees(),
            elevation: k.attitude.elevation.to_degrees(),
            roll: k.attitude.roll.to_degrees(),
            alpha: k.aoa.x.to_degrees(),
            beta: k.aoa.y.to_degrees(),
            gamma: k.aoa.z.to_degrees(),
            dynamic_pressure: k.dynamic_pressure,
            aero_body_x: k.aero_body.x,
            aero_body_y: k.aero_body.y,
            aero_body_z: k.aero_body.z,
            thrust_body_x: k.gimbal.thrust_body.x,
            thrust_body_y: k.gimbal.thrust_body.y,
            thrust_body_z: k.gimbal.thrust_body.z,
            gimbal_pitch: k.gimbal.pitch.to_degrees(),
            gimbal_yaw: k.gimbal.yaw.to_degrees(),
            wind_speed: k.wind_speed,
            wind_direction: k.wind_direction,
            downrange: k.downrange,
            iip_lat: iip.map(|p| p.x),
            iip_lon: iip.map(|p| p.y),
            dcm_11: dcm[(0, 0)],
            dcm_12: dcm[(0, 1)],
            dcm_13: dcm[(0, 2)],
            dcm_21: dcm[(1, 0)],
            dcm_22: dcm[(1, 1)],
            dcm_23: dcm[(1, 2)],
            dcm_31: dcm[(2, 0)],
            dcm_32: dcm[(2, 1)],
            dcm_33: dcm[(2, 2)],
            inertial_speed: k.vel_eci.norm(),
            kinetic_energy: 0.5 * k.mass * k.vel_ned.norm_squared(),
            loss_gravity,
            loss_aerodynamics: -k.aero_body.x / k.mass,
            loss_thrust,
            is_powered: k.mode.is_powered(),
            is_separated,
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for the rows of one segment.
pub trait RecordSink {
    fn record(&mut self, row: &TrajectoryRecord) -> Result<(), SimError>;

    fn finish(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

impl RecordSink for Vec<TrajectoryRecord> {
    fn record(&mut self, row: &TrajectoryRecord) -> Result<(), SimError> {
        self.push(row.clone());
        Ok(())
    }
}

/// Streams rows as CSV. The header is written up front so a segment that
/// never leaves the ground still produces a well-formed file.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self, SimError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, SimError> {
        self.writer
            .into_inner()
            .map_err(|e| SimError::OutputIo(e.into_error()))
    }
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, SimError> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn record(&mut self, row: &TrajectoryRecord) -> Result<(), SimError> {
        self.writer.serialize(row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }
}
