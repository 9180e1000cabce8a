use log::warn;
use nalgebra::Vector3;

use crate::error::ConfigError;
use crate::physics::aerodynamics::NormalCoefficient;

use super::propulsion::Profile;
use super::stage::StageConfig;

// ---------------------------------------------------------------------------
// Mission: ordered stack of stages sharing one clock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Mission {
    pub name: String,
    pub end_time: f64,    // s
    pub output_step: f64, // s
    pub stages: Vec<StageConfig>,
}

impl Mission {
    /// Mission time at which stage `idx` takes over.
    pub fn stage_start_time(&self, idx: usize) -> f64 {
        match idx.checked_sub(1).and_then(|prev| self.stages.get(prev)) {
            Some(prev) => prev.separation_time.unwrap_or(self.end_time),
            None => 0.0,
        }
    }

    /// Check everything that can be checked before integrating.
    /// All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if !(self.end_time > 0.0) {
            problems.push(format!("end time must be positive, got {}", self.end_time));
        }
        if !(self.output_step > 0.0) {
            problems.push(format!("output step must be positive, got {}", self.output_step));
        }
        if self.stages.is_empty() {
            problems.push("mission has no stages".into());
        }

        for (i, stage) in self.stages.iter().enumerate() {
            let label = format!("stage {} ({})", stage.number, stage.name);
            let start = self.stage_start_time(i);
            let next = self.stages.get(i + 1);

            if !(stage.mass_initial > 0.0) {
                problems.push(format!("{label}: initial mass must be positive"));
            }
            match (stage.separation_time, next) {
                (None, Some(_)) => problems.push(format!("{label}: a following stage exists but no separation time is set")),
                (Some(t), None) => problems.push(format!("{label}: separation time {t} s set but there is no following stage")),
                (Some(t), Some(upper)) => {
                    if !(t > start) {
                        problems.push(format!("{label}: separation time {t} s is not after stage start {start} s"));
                    }
                    let dumped = stage.dump.filter(|d| d.separation_time <= t).map_or(0.0, |d| d.mass);
                    if !(stage.mass_initial > upper.mass_initial + dumped) {
                        problems.push(format!(
                            "{label}: initial mass {} kg does not exceed upper stage mass {} kg plus dumped mass {} kg",
                            stage.mass_initial, upper.mass_initial, dumped
                        ));
                    }
                }
                (None, None) => {}
            }

            let thrust = &stage.thrust;
            if !(thrust.thrust_coefficient > 0.0) {
                problems.push(format!("{label}: thrust coefficient must be positive"));
            }
            let fires = !matches!(thrust.vacuum_thrust, Profile::Constant(v) if v == 0.0);
            if fires && matches!(thrust.vacuum_isp, Profile::Constant(isp) if !(isp > 0.0)) {
                problems.push(format!("{label}: vacuum Isp must be positive for a firing stage"));
            }
            if fires && !stage.powered_mode.is_supported() {
                warn!("{label}: powered mode `{}` is not supported; the run will stop at ignition", stage.powered_mode);
            }

            if let Some(dump) = &stage.dump {
                if !(dump.mass > 0.0) || !(dump.ballistic_coefficient > 0.0) {
                    problems.push(format!("{label}: dumped product needs positive mass and ballistic coefficient"));
                }
                if dump.separation_time <= start || dump.separation_time >= self.end_time {
                    warn!("{label}: dump time {} s is outside the stage window and will never fire", dump.separation_time);
                }
            }
            if stage.neutrality.is_some() && matches!(stage.aero.normal, NormalCoefficient::Constant(_)) {
                problems.push(format!("{label}: neutrality requires a tabulated normal coefficient"));
            }
            if !(-90.0..=90.0).contains(&stage.launch.position_llh.x) {
                problems.push(format!("{label}: launch latitude {} out of range", stage.launch.position_llh.x));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

// ---------------------------------------------------------------------------
// Mission builder
// ---------------------------------------------------------------------------

pub struct MissionBuilder {
    name: String,
    end_time: f64,
    output_step: f64,
    stages: Vec<StageConfig>,
}

impl MissionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            end_time: 600.0,
            output_step: 0.1,
            stages: vec![],
        }
    }

    pub fn end_time(mut self, v: f64) -> Self {
        self.end_time = v;
        self
    }

    pub fn output_step(mut self, v: f64) -> Self {
        self.output_step = v;
        self
    }

    /// Append a stage; it is numbered after the ones already added.
    pub fn stage(mut self, mut stage: StageConfig) -> Self {
        stage.number = self.stages.len() + 1;
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Mission {
        Mission {
            name: self.name,
            end_time: self.end_time,
            output_step: self.output_step,
            stages: self.stages,
        }
    }
}

// ---------------------------------------------------------------------------
// Preset missions
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;
    use crate::dynamics::mode::FreeMode;
    use crate::vehicle::environment::LaunchSite;
    use crate::vehicle::stage::{DumpProduct, StageBuilder};

    /// Single-stage vertical hop from (0°, 0°, 0 m).
    pub fn sounding_rocket() -> Mission {
        MissionBuilder::new("sounding")
            .end_time(120.0)
            .output_step(0.1)
            .stage(
                StageBuilder::new("Hopper")
                    .mass_initial(50.0)
                    .constant_thrust(1000.0, 250.0, 0.0, 10.0)
                    .body_diameter(0.15)
                    .axial_coefficient(0.4)
                    .attitude_deg(0.0, 90.0, 0.0)
                    .build(),
            )
            .build()
    }

    /// Two-stage rocket with a fairing jettisoned during the first burn.
    pub fn two_stage() -> Mission {
        let launch = LaunchSite {
            position_llh: Vector3::new(31.25, 131.08, 10.0),
            velocity_ned: Vector3::zeros(),
        };
        MissionBuilder::new("two_stage")
            .end_time(600.0)
            .output_step(0.5)
            .stage(
                StageBuilder::new("Booster")
                    .mass_initial(1000.0)
                    .constant_thrust(25_000.0, 240.0, 0.0, 50.0)
                    .nozzle(0.12, 6.0)
                    .body_diameter(0.5)
                    .axial_coefficient(0.35)
                    .attitude_deg(90.0, 85.0, 0.0)
                    .launch(launch)
                    .separation_time(60.0)
                    .dump(DumpProduct {
                        separation_time: 20.0,
                        mass: 5.0,
                        ballistic_coefficient: 50.0,
                        delta_v_ned: Vector3::new(0.0, 0.0, -5.0),
                    })
                    .build(),
            )
            .stage(
                StageBuilder::new("Sustainer")
                    .mass_initial(200.0)
                    .constant_thrust(4_000.0, 260.0, 2.0, 40.0)
                    .nozzle(0.05, 20.0)
                    .body_diameter(0.3)
                    .axial_coefficient(0.3)
                    .free_mode(FreeMode::AeroStable)
                    .attitude_deg(90.0, 80.0, 0.0)
                    .launch(launch)
                    .build(),
            )
            .build()
    }
}
