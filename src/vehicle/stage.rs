use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::dynamics::mode::{FreeMode, PoweredMode};
use crate::physics::aerodynamics::{AeroModel, AxialCoefficient, NormalCoefficient};
use crate::physics::atmosphere::DensityVariation;
use crate::physics::coordinates::Attitude;

use super::attitude::AttitudeProgram;
use super::environment::{LaunchSite, WindModel};
use super::neutrality::Neutrality;
use super::propulsion::{Profile, ThrustModel};

// ---------------------------------------------------------------------------
// Stage configuration (immutable once built)
// ---------------------------------------------------------------------------

/// A jettisoned component flown afterwards as an independent ballistic body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DumpProduct {
    pub separation_time: f64,        // s, mission time
    pub mass: f64,                   // kg
    pub ballistic_coefficient: f64,  // kg/m^2
    pub delta_v_ned: Vector3<f64>,   // m/s added at release
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub name: String,
    pub number: usize,
    pub powered_mode: PoweredMode,
    pub free_mode: FreeMode,
    /// Mass at this stage's start, including every stage above it.
    pub mass_initial: f64,
    pub thrust: ThrustModel,
    pub aero: AeroModel,
    pub attitude: AttitudeProgram,
    pub wind: WindModel,
    pub density_variation: DensityVariation,
    pub launch: LaunchSite,
    /// Mission time at which the next stage separates from this one.
    pub separation_time: Option<f64>,
    pub dump: Option<DumpProduct>,
    pub neutrality: Option<Neutrality>,
}

impl StageConfig {
    /// Configuration of this stage's dumped product: the same vehicle
    /// description with the mass, drag and motor replaced.
    pub fn dumped_product(&self) -> Option<StageConfig> {
        let dump = self.dump?;
        Some(StageConfig {
            name: format!("{} dump", self.name),
            free_mode: FreeMode::Ballistic,
            mass_initial: dump.mass,
            thrust: ThrustModel::unpowered(),
            aero: AeroModel {
                ballistic_coefficient: dump.ballistic_coefficient,
                ..self.aero.clone()
            },
            separation_time: None,
            dump: None,
            neutrality: None,
            ..self.clone()
        })
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    stage: StageConfig,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stage: StageConfig {
                name: name.into(),
                number: 1,
                powered_mode: PoweredMode::ThreeDof,
                free_mode: FreeMode::AeroStable,
                mass_initial: 100.0,
                thrust: ThrustModel::unpowered(),
                aero: AeroModel {
                    body_area: 0.2 * 0.2 * PI / 4.0,
                    axial: AxialCoefficient::Constant(0.3),
                    axial_multiplier: 1.0,
                    normal: NormalCoefficient::Constant(0.0),
                    normal_multiplier: 1.0,
                    ballistic_coefficient: 100.0,
                },
                attitude: AttitudeProgram::constant(Attitude::new(0.0, PI / 2.0, 0.0)),
                wind: WindModel::default(),
                density_variation: DensityVariation::Nominal,
                launch: LaunchSite::default(),
                separation_time: None,
                dump: None,
                neutrality: None,
            },
        }
    }

    pub fn number(mut self, v: usize) -> Self { self.stage.number = v; self }
    pub fn powered_mode(mut self, v: PoweredMode) -> Self { self.stage.powered_mode = v; self }
    pub fn free_mode(mut self, v: FreeMode) -> Self { self.stage.free_mode = v; self }
    pub fn mass_initial(mut self, v: f64) -> Self { self.stage.mass_initial = v; self }
    pub fn thrust_model(mut self, v: ThrustModel) -> Self { self.stage.thrust = v; self }
    pub fn aero(mut self, v: AeroModel) -> Self { self.stage.aero = v; self }
    pub fn attitude(mut self, v: AttitudeProgram) -> Self { self.stage.attitude = v; self }
    pub fn wind(mut self, v: WindModel) -> Self { self.stage.wind = v; self }
    pub fn density_variation(mut self, v: DensityVariation) -> Self { self.stage.density_variation = v; self }
    pub fn launch(mut self, v: LaunchSite) -> Self { self.stage.launch = v; self }
    pub fn separation_time(mut self, v: f64) -> Self { self.stage.separation_time = Some(v); self }
    pub fn dump(mut self, v: DumpProduct) -> Self { self.stage.dump = Some(v); self }
    pub fn neutrality(mut self, v: Neutrality) -> Self { self.stage.neutrality = Some(v); self }

    /// Constant vacuum thrust and Isp over `[burn_start, burn_end)` (stage time).
    pub fn constant_thrust(mut self, thrust: f64, isp: f64, burn_start: f64, burn_end: f64) -> Self {
        self.stage.thrust = ThrustModel {
            vacuum_thrust: Profile::Constant(thrust),
            vacuum_isp: Profile::Constant(isp),
            burn_start,
            burn_end,
            ..self.stage.thrust
        };
        self
    }

    pub fn nozzle(mut self, throat_diameter: f64, expansion_ratio: f64) -> Self {
        self.stage.thrust.throat_diameter = throat_diameter;
        self.stage.thrust.expansion_ratio = expansion_ratio;
        self
    }

    pub fn body_diameter(mut self, d: f64) -> Self {
        self.stage.aero.body_area = d * d * PI / 4.0;
        self
    }

    pub fn axial_coefficient(mut self, ca: f64) -> Self {
        self.stage.aero.axial = AxialCoefficient::Constant(ca);
        self
    }

    pub fn normal_coefficient(mut self, cn: f64) -> Self {
        self.stage.aero.normal = NormalCoefficient::Constant(cn);
        self
    }

    pub fn ballistic_coefficient(mut self, beta: f64) -> Self {
        self.stage.aero.ballistic_coefficient = beta;
        self
    }

    /// Constant attitude in degrees.
    pub fn attitude_deg(mut self, azimuth: f64, elevation: f64, roll: f64) -> Self {
        self.stage.attitude = AttitudeProgram::constant(Attitude::new(
            azimuth.to_radians(),
            elevation.to_radians(),
            roll.to_radians(),
        ));
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumped_product_overrides_only_what_differs() {
        let stage = StageBuilder::new("S1")
            .number(1)
            .mass_initial(500.0)
            .constant_thrust(20_000.0, 250.0, 0.0, 30.0)
            .dump(DumpProduct {
                separation_time: 40.0,
                mass: 12.0,
                ballistic_coefficient: 35.0,
                delta_v_ned: Vector3::new(0.0, 0.0, -5.0),
            })
            .separation_time(60.0)
            .build();

        let product = stage.dumped_product().unwrap();
        assert_eq!(product.mass_initial, 12.0);
        assert_eq!(product.aero.ballistic_coefficient, 35.0);
        assert_eq!(product.free_mode, FreeMode::Ballistic);
        assert_eq!(product.thrust, ThrustModel::unpowered());
        assert!(product.dump.is_none() && product.separation_time.is_none());
        // Untouched fields come from the parent
        assert_eq!(product.number, 1);
        assert_eq!(product.launch, stage.launch);
        assert_eq!(product.aero.body_area, stage.aero.body_area);
    }

    #[test]
    fn no_dump_no_product() {
        assert!(StageBuilder::new("S2").build().dumped_product().is_none());
    }
}
