use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::dynamics::mode::{FreeMode, PoweredMode};
use crate::error::ConfigError;
use crate::physics::aerodynamics::{AeroModel, AxialCoefficient, NormalCoefficient};
use crate::physics::atmosphere::DensityVariation;
use crate::physics::coordinates::Attitude;
use crate::tables::Table1;
use crate::vehicle::attitude::{AttitudeProgram, AttitudeSource};
use crate::vehicle::environment::{LaunchSite, WindModel};
use crate::vehicle::mission::Mission;
use crate::vehicle::neutrality::Neutrality;
use crate::vehicle::propulsion::{Profile, ThrustModel};
use crate::vehicle::stage::{DumpProduct, StageConfig};

use super::tables;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// A number, or a path to a CSV table relative to the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ValueOrFile {
    Value(f64),
    File(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissionDoc {
    pub name: String,
    pub calculation: CalculationDoc,
    pub launch: LaunchDoc,
    #[serde(default)]
    pub wind: Option<WindDoc>,
    pub stages: Vec<StageDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalculationDoc {
    pub end_time: f64,
    pub output_step: f64,
    /// Percent, or an altitude/deviation table.
    #[serde(default)]
    pub air_density_variation: Option<ValueOrFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchDoc {
    /// `[lat_deg, lon_deg, alt_m]`
    pub position_llh: [f64; 3],
    #[serde(default)]
    pub velocity_ned: [f64; 3],
}

/// `[speed_mps, direction_deg]`, or an altitude profile table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WindDoc {
    Constant([f64; 2]),
    File(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_powered_mode")]
    pub powered_mode: PoweredMode,
    #[serde(default = "default_free_mode")]
    pub free_mode: FreeMode,
    pub mass_initial: f64,
    #[serde(default)]
    pub thrust: Option<ThrustDoc>,
    pub aero: AeroDoc,
    pub attitude: AttitudeDoc,
    #[serde(default)]
    pub dumping_product: Option<DumpDoc>,
    /// Mission time at which the next stage separates.
    #[serde(default)]
    pub separation_time: Option<f64>,
    #[serde(default)]
    pub neutrality: Option<NeutralityDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrustDoc {
    pub vacuum_thrust: ValueOrFile,
    #[serde(default = "one")]
    pub thrust_coefficient: f64,
    pub vacuum_isp: ValueOrFile,
    #[serde(default = "one")]
    pub isp_coefficient: f64,
    #[serde(default)]
    pub burn_start: f64,
    pub burn_end: f64,
    #[serde(default)]
    pub forced_cutoff: Option<f64>,
    #[serde(default)]
    pub throat_diameter: f64,
    #[serde(default)]
    pub expansion_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AeroDoc {
    pub body_diameter: f64,
    pub axial: ValueOrFile,
    #[serde(default = "one")]
    pub axial_multiplier: f64,
    /// Constant, or a header-less Mach x angle grid.
    #[serde(default)]
    pub normal: Option<ValueOrFile>,
    #[serde(default = "one")]
    pub normal_multiplier: f64,
    #[serde(default = "default_ballistic_coefficient")]
    pub ballistic_coefficient: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttitudeDoc {
    /// Time history table; takes precedence over the constant angles.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub azimuth: Option<f64>,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub yaw_offset: f64,
    #[serde(default)]
    pub pitch_offset: f64,
    #[serde(default)]
    pub roll_offset: f64,
    #[serde(default)]
    pub gyro_bias_deg_per_hour: [f64; 3],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpDoc {
    pub separation_time: f64,
    pub mass: f64,
    pub ballistic_coefficient: f64,
    #[serde(default)]
    pub delta_v_ned: [f64; 3],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeutralityDoc {
    pub cg_controller_file: PathBuf,
    pub cp_file: PathBuf,
    #[serde(default)]
    pub cg_offset: [f64; 3],
    #[serde(default)]
    pub cp_offset: [f64; 3],
    #[serde(default)]
    pub controller_offset: [f64; 3],
}

fn one() -> f64 {
    1.0
}

fn default_ballistic_coefficient() -> f64 {
    100.0
}

fn default_powered_mode() -> PoweredMode {
    PoweredMode::ThreeDof
}

fn default_free_mode() -> FreeMode {
    FreeMode::AeroStable
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse, load tables, validate, and build a mission from a JSON config.
pub fn load_mission(path: &Path) -> Result<Mission, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: MissionDoc = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mission = doc.resolve(base)?;
    info!(
        "loaded mission `{}` from {}: {} stage(s), end {} s, step {} s",
        mission.name,
        path.display(),
        mission.stages.len(),
        mission.end_time,
        mission.output_step
    );
    Ok(mission)
}

impl MissionDoc {
    /// Build the mission, resolving table paths against `base`.
    ///
    /// I/O and table errors abort immediately; semantic problems are
    /// collected and reported together.
    pub fn resolve(self, base: &Path) -> Result<Mission, ConfigError> {
        let mut problems = Vec::new();

        let density_variation = match &self.calculation.air_density_variation {
            None => DensityVariation::Nominal,
            Some(ValueOrFile::Value(p)) => {
                if !(-100.0..=100.0).contains(p) {
                    problems.push(format!("air density variation {p}% is outside [-100, 100]"));
                }
                DensityVariation::Percent(*p)
            }
            Some(ValueOrFile::File(f)) => tables::read_density_variation(&base.join(f))?,
        };
        let wind = match &self.wind {
            None => WindModel::default(),
            Some(WindDoc::Constant([speed, direction_deg])) => WindModel::Constant {
                speed: *speed,
                direction_deg: *direction_deg,
            },
            Some(WindDoc::File(f)) => tables::read_wind(&base.join(f))?,
        };
        let env = StageEnvironment {
            launch: LaunchSite {
                position_llh: Vector3::from(self.launch.position_llh),
                velocity_ned: Vector3::from(self.launch.velocity_ned),
            },
            wind,
            density_variation,
        };

        let mut stages = Vec::with_capacity(self.stages.len());
        for (i, doc) in self.stages.into_iter().enumerate() {
            let number = i + 1;
            let stage = doc.resolve(number, base, &env, &mut problems)?;
            debug!("stage {number} ({}): mass {} kg, separation {:?}", stage.name, stage.mass_initial, stage.separation_time);
            stages.push(stage);
        }

        let mission = Mission {
            name: self.name,
            end_time: self.calculation.end_time,
            output_step: self.calculation.output_step,
            stages,
        };
        match mission.validate() {
            Ok(()) if problems.is_empty() => Ok(mission),
            Ok(()) => Err(ConfigError::Invalid(problems)),
            Err(ConfigError::Invalid(more)) => {
                problems.extend(more);
                Err(ConfigError::Invalid(problems))
            }
            Err(e) => Err(e),
        }
    }
}

struct StageEnvironment {
    launch: LaunchSite,
    wind: WindModel,
    density_variation: DensityVariation,
}

impl StageDoc {
    fn resolve(
        self,
        number: usize,
        base: &Path,
        env: &StageEnvironment,
        problems: &mut Vec<String>,
    ) -> Result<StageConfig, ConfigError> {
        let name = self.name.unwrap_or_else(|| format!("stage{number}"));
        let label = format!("stage {number} ({name})");

        let thrust = match self.thrust {
            Some(doc) => doc.resolve(base)?,
            None => ThrustModel::unpowered(),
        };
        let aero = self.aero.resolve(base)?;
        let attitude = self.attitude.resolve(base, &label, problems)?;
        let neutrality = match self.neutrality {
            Some(doc) => Some(doc.resolve(base)?),
            None => None,
        };
        let dump = self.dumping_product.map(|d| DumpProduct {
            separation_time: d.separation_time,
            mass: d.mass,
            ballistic_coefficient: d.ballistic_coefficient,
            delta_v_ned: Vector3::from(d.delta_v_ned),
        });

        Ok(StageConfig {
            name,
            number,
            powered_mode: self.powered_mode,
            free_mode: self.free_mode,
            mass_initial: self.mass_initial,
            thrust,
            aero,
            attitude,
            wind: env.wind.clone(),
            density_variation: env.density_variation.clone(),
            launch: env.launch,
            separation_time: self.separation_time,
            dump,
            neutrality,
        })
    }
}

impl ValueOrFile {
    fn profile(&self, base: &Path, read: fn(&Path) -> Result<Table1, ConfigError>) -> Result<Profile, ConfigError> {
        Ok(match self {
            ValueOrFile::Value(v) => Profile::Constant(*v),
            ValueOrFile::File(f) => Profile::Table(read(&base.join(f))?),
        })
    }
}

impl ThrustDoc {
    fn resolve(self, base: &Path) -> Result<ThrustModel, ConfigError> {
        Ok(ThrustModel {
            vacuum_thrust: self.vacuum_thrust.profile(base, tables::read_thrust)?,
            thrust_coefficient: self.thrust_coefficient,
            vacuum_isp: self.vacuum_isp.profile(base, tables::read_isp)?,
            isp_coefficient: self.isp_coefficient,
            burn_start: self.burn_start,
            burn_end: self.burn_end,
            forced_cutoff: self.forced_cutoff,
            throat_diameter: self.throat_diameter,
            expansion_ratio: self.expansion_ratio,
        })
    }
}

impl AeroDoc {
    fn resolve(self, base: &Path) -> Result<AeroModel, ConfigError> {
        let axial = match self.axial {
            ValueOrFile::Value(v) => AxialCoefficient::Constant(v),
            ValueOrFile::File(f) => AxialCoefficient::Mach(tables::read_axial(&base.join(f))?),
        };
        let normal = match self.normal {
            None => NormalCoefficient::Constant(0.0),
            Some(ValueOrFile::Value(v)) => NormalCoefficient::Constant(v),
            Some(ValueOrFile::File(f)) => NormalCoefficient::MachAngle(tables::read_grid(&base.join(f))?),
        };
        Ok(AeroModel {
            body_area: self.body_diameter * self.body_diameter * PI / 4.0,
            axial,
            axial_multiplier: self.axial_multiplier,
            normal,
            normal_multiplier: self.normal_multiplier,
            ballistic_coefficient: self.ballistic_coefficient,
        })
    }
}

impl AttitudeDoc {
    fn resolve(self, base: &Path, label: &str, problems: &mut Vec<String>) -> Result<AttitudeProgram, ConfigError> {
        let source = match (&self.file, self.azimuth, self.elevation) {
            (Some(f), _, _) => {
                let t = tables::read_attitude(&base.join(f))?;
                AttitudeSource::Table {
                    azimuth: t.azimuth,
                    elevation: t.elevation,
                    roll: t.roll,
                    roll_constant: self.roll.to_radians(),
                }
            }
            (None, Some(az), Some(el)) => {
                AttitudeSource::Constant(Attitude::new(az.to_radians(), el.to_radians(), self.roll.to_radians()))
            }
            (None, _, _) => {
                problems.push(format!("{label}: attitude needs a file or both azimuth and elevation"));
                AttitudeSource::Constant(Attitude::default())
            }
        };
        Ok(AttitudeProgram {
            source,
            ..AttitudeProgram::constant(Attitude::default())
        }
        .with_offsets_deg(self.yaw_offset, self.pitch_offset, self.roll_offset)
        .with_gyro_bias_deg_per_hour(Vector3::from(self.gyro_bias_deg_per_hour)))
    }
}

impl NeutralityDoc {
    fn resolve(self, base: &Path) -> Result<Neutrality, ConfigError> {
        let (cg, controller) = tables::read_stations(&base.join(&self.cg_controller_file))?;
        Ok(Neutrality {
            cg,
            controller,
            cp: tables::read_grid(&base.join(&self.cp_file))?,
            cg_offset: Vector3::from(self.cg_offset),
            cp_offset: Vector3::from(self.cp_offset),
            controller_offset: Vector3::from(self.controller_offset),
        })
    }
}
