use nalgebra::Vector3;

use crate::dynamics::evaluator::{Evaluation, StageDynamics};
use crate::dynamics::state::{FlightState, StateVector};
use crate::error::SimError;
use crate::physics::coordinates::dcm_eci_to_ned;
use crate::vehicle::stage::StageConfig;

use super::integrator::OdeSystem;

// ---------------------------------------------------------------------------
// Per-segment mutable context
// ---------------------------------------------------------------------------

/// Bookkeeping owned by one integration segment. Written by the derivative
/// evaluations and the boundary handling, read by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentContext {
    /// Geodetic position of the first evaluation found below ground.
    pub impact: Option<Vector3<f64>>,
    pub max_altitude: f64,
    pub max_downrange: f64,
    /// Exact state at the next stage's separation time.
    pub separation_handoff: Option<FlightState>,
    /// State at the dump time with the release delta-v already applied.
    pub dump_handoff: Option<FlightState>,
    pub upper_stage_released: bool,
    pub dump_released: bool,
}

impl SegmentContext {
    fn update_maxima(&mut self, altitude: f64, downrange: f64) {
        self.max_altitude = self.max_altitude.max(altitude);
        self.max_downrange = self.max_downrange.max(downrange);
    }
}

/// One stage's equations of motion plus its context, as seen by the solver.
pub struct Segment<'a> {
    pub dynamics: StageDynamics<'a>,
    pub ctx: SegmentContext,
}

impl<'a> Segment<'a> {
    pub fn new(stage: &'a StageConfig, start_time: f64) -> Self {
        Self {
            dynamics: StageDynamics::new(stage, start_time),
            ctx: SegmentContext::default(),
        }
    }

    pub fn stage(&self) -> &'a StageConfig {
        self.dynamics.stage
    }

    /// Evaluate at `t`, latching an impact if the vehicle is below ground.
    pub fn evaluate(&mut self, t: f64, state: &FlightState) -> Result<Evaluation, SimError> {
        let eval = self.dynamics.evaluate(t, state)?;
        match &eval {
            Evaluation::Grounded(llh) => {
                self.ctx.impact.get_or_insert(*llh);
            }
            Evaluation::Airborne(k) => self.ctx.update_maxima(k.llh.z, k.downrange),
        }
        Ok(eval)
    }

    /// Latch hand-off states from the accepted state at a sub-interval end.
    pub fn latch_events(&mut self, t: f64, state: &FlightState) {
        let stage = self.stage();
        if self.ctx.separation_handoff.is_none() && stage.separation_time.is_some_and(|s| t >= s) {
            self.ctx.separation_handoff = Some(*state);
        }
        if let Some(dump) = stage.dump {
            if self.ctx.dump_handoff.is_none() && t >= dump.separation_time {
                let llh = state.llh(t);
                let dv_eci = dcm_eci_to_ned(&llh, t).transpose() * dump.delta_v_ned;
                self.ctx.dump_handoff = Some(FlightState {
                    mass: dump.mass,
                    pos_eci: state.pos_eci,
                    vel_eci: state.vel_eci + dv_eci,
                });
            }
        }
    }
}

impl OdeSystem<7> for Segment<'_> {
    fn rhs(&mut self, t: f64, y: &StateVector) -> Result<StateVector, SimError> {
        let state = FlightState::from_vector(y);
        Ok(self.evaluate(t, &state)?.derivative())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::environment::LaunchSite;
    use crate::vehicle::stage::{DumpProduct, StageBuilder};

    #[test]
    fn impact_latches_once() {
        let stage = StageBuilder::new("S").build();
        let mut seg = Segment::new(&stage, 0.0);
        let below = |alt: f64| {
            FlightState::at_launch(
                &LaunchSite {
                    position_llh: Vector3::new(10.0, 20.0, alt),
                    velocity_ned: Vector3::zeros(),
                },
                10.0,
            )
        };
        assert_eq!(seg.rhs(0.0, &below(-1.0).to_vector()).unwrap(), StateVector::zeros());
        seg.rhs(0.0, &below(-50.0).to_vector()).unwrap();
        let impact = seg.ctx.impact.unwrap();
        assert!((impact.z + 1.0).abs() < 1e-6, "first impact kept, got {impact:?}");
    }

    #[test]
    fn maxima_track_airborne_evaluations() {
        let stage = StageBuilder::new("S").build();
        let mut seg = Segment::new(&stage, 0.0);
        for alt in [100.0, 900.0, 400.0] {
            let s = FlightState::at_launch(
                &LaunchSite {
                    position_llh: Vector3::new(0.0, 0.0, alt),
                    velocity_ned: Vector3::zeros(),
                },
                10.0,
            );
            seg.rhs(0.0, &s.to_vector()).unwrap();
        }
        assert!((seg.ctx.max_altitude - 900.0).abs() < 1e-6);
        assert!(seg.ctx.impact.is_none());
    }

    #[test]
    fn dump_handoff_adds_rotated_delta_v() {
        let stage = StageBuilder::new("S")
            .dump(DumpProduct {
                separation_time: 20.0,
                mass: 3.0,
                ballistic_coefficient: 40.0,
                delta_v_ned: Vector3::new(0.0, 0.0, -5.0),
            })
            .build();
        let mut seg = Segment::new(&stage, 0.0);
        let llh = Vector3::new(30.0, 130.0, 5_000.0);
        let state = FlightState {
            mass: 90.0,
            pos_eci: crate::physics::coordinates::llh_to_eci(&llh, 20.0),
            vel_eci: Vector3::new(100.0, 200.0, 300.0),
        };

        seg.latch_events(10.0, &state);
        assert!(seg.ctx.dump_handoff.is_none());
        seg.latch_events(20.0, &state);
        let handoff = seg.ctx.dump_handoff.unwrap();

        let up = state.pos_eci.normalize();
        let dv = handoff.vel_eci - state.vel_eci;
        assert!((dv.norm() - 5.0).abs() < 1e-9, "|dv| = {}", dv.norm());
        assert!(dv.dot(&up) > 4.9, "-5 m/s down is upward, got {}", dv.dot(&up));
        assert_eq!(handoff.mass, 3.0);
        assert_eq!(handoff.pos_eci, state.pos_eci);
    }

    #[test]
    fn separation_handoff_is_the_exact_state() {
        let stage = StageBuilder::new("S").separation_time(60.0).build();
        let mut seg = Segment::new(&stage, 0.0);
        let s1 = FlightState { mass: 1.0, pos_eci: Vector3::new(7e6, 0.0, 0.0), vel_eci: Vector3::new(0.0, 1.0, 0.0) };
        let s2 = FlightState { mass: 2.0, ..s1 };
        seg.latch_events(60.0, &s1);
        seg.latch_events(70.0, &s2);
        assert_eq!(seg.ctx.separation_handoff, Some(s1));
    }
}
