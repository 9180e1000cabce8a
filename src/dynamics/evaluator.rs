use std::f64::consts::FRAC_PI_2;

use nalgebra::{Matrix3, Vector3};

use crate::error::SimError;
use crate::physics::aerodynamics::{ballistic_drag_ned, dynamic_pressure};
use crate::physics::atmosphere::Atmo;
use crate::physics::coordinates::{
    angle_of_attack, azimuth_elevation, dcm_eci_to_ned, surface_distance, vel_eci_to_ned, wind_ned, Attitude,
};
use crate::physics::gravity::gravity_eci;
use crate::vehicle::propulsion::ThrustState;
use crate::vehicle::stage::StageConfig;

use super::gimbal::{self, GimbalSolution};
use super::mode::{FlightMode, FreeMode, PoweredMode};
use super::state::{self, FlightState, StateVector};

// ---------------------------------------------------------------------------
// Derived quantities of one evaluation
// ---------------------------------------------------------------------------

/// Everything computed while evaluating the equations of motion at one
/// instant. The integrator only needs [`DerivedKinematics::derivative`];
/// the rest feeds the trajectory record.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedKinematics {
    pub time: f64,
    pub mass: f64,
    pub pos_eci: Vector3<f64>,
    pub vel_eci: Vector3<f64>,
    /// `[lat_deg, lon_deg, alt_m]`
    pub llh: Vector3<f64>,
    pub dcm_eci_to_ned: Matrix3<f64>,
    pub dcm_ned_to_body: Matrix3<f64>,
    pub vel_ned: Vector3<f64>,
    pub vel_air_ned: Vector3<f64>,
    pub vel_air_body: Vector3<f64>,
    pub wind_speed: f64,
    pub wind_direction: f64, // deg
    pub attitude: Attitude,
    /// `[alpha, beta, gamma]` (rad)
    pub aoa: Vector3<f64>,
    pub mach: f64,
    pub dynamic_pressure: f64,
    pub air: Atmo,
    pub gravity_eci: Vector3<f64>,
    pub thrust: ThrustState,
    pub aero_body: Vector3<f64>,
    pub gimbal: GimbalSolution,
    pub mode: FlightMode,
    pub acc_eci: Vector3<f64>,
    /// Surface distance from the launch point (m).
    pub downrange: f64,
}

impl DerivedKinematics {
    pub fn derivative(&self) -> StateVector {
        state::derivative(-self.thrust.mass_flow, &self.vel_eci, &self.acc_eci)
    }

    pub fn dcm_eci_to_body(&self) -> Matrix3<f64> {
        self.dcm_ned_to_body * self.dcm_eci_to_ned
    }

    pub fn dcm_body_to_eci(&self) -> Matrix3<f64> {
        self.dcm_eci_to_body().transpose()
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Below the ellipsoid: the vehicle is frozen where it stands.
    Grounded(Vector3<f64>),
    Airborne(Box<DerivedKinematics>),
}

impl Evaluation {
    pub fn derivative(&self) -> StateVector {
        match self {
            Evaluation::Grounded(_) => StateVector::zeros(),
            Evaluation::Airborne(k) => k.derivative(),
        }
    }
}

// ---------------------------------------------------------------------------
// Equations of motion for one stage
// ---------------------------------------------------------------------------

/// A stage flown from `start_time` (mission time).
#[derive(Debug, Clone, Copy)]
pub struct StageDynamics<'a> {
    pub stage: &'a StageConfig,
    pub start_time: f64,
}

impl<'a> StageDynamics<'a> {
    pub fn new(stage: &'a StageConfig, start_time: f64) -> Self {
        Self { stage, start_time }
    }

    /// Evaluate the equations of motion at mission time `t`.
    pub fn evaluate(&self, t: f64, state: &FlightState) -> Result<Evaluation, SimError> {
        let stage = self.stage;
        let llh = state.llh(t);
        if llh.z < 0.0 {
            return Ok(Evaluation::Grounded(llh));
        }
        if !(state.mass > 0.0) {
            return Err(SimError::NonPositiveMass {
                segment: stage.name.clone(),
                time: t,
                mass: state.mass,
            });
        }

        let altitude = llh.z;
        let dcm_eci_to_ned = dcm_eci_to_ned(&llh, t);
        let vel_ned = vel_eci_to_ned(&state.vel_eci, &state.pos_eci, &dcm_eci_to_ned);

        let air = stage.density_variation.atmosphere(altitude);
        let (wind_speed, wind_direction) = stage.wind.at(altitude);
        let vel_air_ned = vel_ned - wind_ned(wind_speed, wind_direction);
        let airspeed = vel_air_ned.norm();
        let mach = airspeed / air.sound_speed;
        let q = dynamic_pressure(air.density, airspeed);

        let thrust = stage.thrust.evaluate(t, self.start_time, air.pressure);
        let mode = FlightMode::resolve(thrust.powered, stage.powered_mode, stage.free_mode);
        let g = gravity_eci(&state.pos_eci);
        let target = stage.attitude.target(t);

        let (attitude, dcm_ned_to_body, vel_air_body, aoa, aero_body, gimbal, acc_eci) = match mode {
            FlightMode::Powered(PoweredMode::ThreeDof) | FlightMode::Free(FreeMode::ThreeDofDefined) => {
                let dcm_ned_to_body = stage.attitude.ned_to_body(t, &target);
                let mut attitude = Attitude::from_dcm(&dcm_ned_to_body);
                if FRAC_PI_2 - target.elevation < 1e-9 && FRAC_PI_2 - attitude.elevation < 1e-9 {
                    attitude.azimuth = target.azimuth;
                    attitude.roll = target.roll;
                }

                let vel_air_body = dcm_ned_to_body * vel_air_ned;
                let aoa = angle_of_attack(&vel_air_body);
                let aero_body = stage.aero.body_force(mach, q, &aoa)?;
                let gimbal = match &stage.neutrality {
                    Some(n) if thrust.powered => {
                        let stations = n.stations(t, mach, aoa.x, aoa.y)?;
                        gimbal::trim(thrust.thrust, &aero_body, &stations, n)
                    }
                    _ => GimbalSolution::axial(thrust.thrust),
                };

                let body_to_eci = (dcm_ned_to_body * dcm_eci_to_ned).transpose();
                let acc = body_to_eci * (gimbal.thrust_body + aero_body) / state.mass + g;
                (attitude, dcm_ned_to_body, vel_air_body, aoa, aero_body, gimbal, acc)
            }
            FlightMode::Powered(other) => return Err(SimError::UnsupportedFlightMode(other)),
            FlightMode::Free(FreeMode::AeroStable) => {
                let (azimuth, elevation) = azimuth_elevation(&vel_air_ned);
                let attitude = Attitude::new(azimuth, elevation, target.roll);
                let dcm_ned_to_body = attitude.to_dcm();
                let aero_body = stage.aero.axial_force(mach, q);

                let body_to_eci = (dcm_ned_to_body * dcm_eci_to_ned).transpose();
                let acc = body_to_eci * aero_body / state.mass + g;
                let vel_air_body = Vector3::new(airspeed, 0.0, 0.0);
                (attitude, dcm_ned_to_body, vel_air_body, Vector3::zeros(), aero_body, GimbalSolution::axial(0.0), acc)
            }
            FlightMode::Free(FreeMode::Ballistic) => {
                let (azimuth, elevation) = azimuth_elevation(&vel_air_ned);
                let attitude = Attitude::new(azimuth, elevation, 0.0);
                let dcm_ned_to_body = attitude.to_dcm();
                let decel = stage.aero.ballistic_deceleration(q);

                let acc = dcm_eci_to_ned.transpose() * ballistic_drag_ned(&vel_air_ned, decel) + g;
                let vel_air_body = Vector3::new(airspeed, 0.0, 0.0);
                let aero_body = Vector3::new(-decel, 0.0, 0.0);
                (attitude, dcm_ned_to_body, vel_air_body, Vector3::zeros(), aero_body, GimbalSolution::axial(0.0), acc)
            }
        };

        Ok(Evaluation::Airborne(Box::new(DerivedKinematics {
            time: t,
            mass: state.mass,
            pos_eci: state.pos_eci,
            vel_eci: state.vel_eci,
            llh,
            dcm_eci_to_ned,
            dcm_ned_to_body,
            vel_ned,
            vel_air_ned,
            vel_air_body,
            wind_speed,
            wind_direction,
            attitude,
            aoa,
            mach,
            dynamic_pressure: q,
            air,
            gravity_eci: g,
            thrust,
            aero_body,
            gimbal,
            mode,
            acc_eci,
            downrange: surface_distance(&stage.launch.position_llh, &llh),
        })))
    }
}
