use std::fmt;

use log::{debug, info, warn};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::dynamics::evaluator::Evaluation;
use crate::dynamics::state::FlightState;
use crate::error::SimError;
use crate::io::csv::{RecordSink, TrajectoryRecord};
use crate::orbital::elements::OrbitCheck;
use crate::vehicle::mission::Mission;
use crate::vehicle::stage::StageConfig;

use super::event::{self, EventKind, StageEvent};
use super::integrator::DormandPrince;
use super::segment::Segment;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Identifies a segment: a stage, or the product dumped by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLabel {
    pub stage_number: usize,
    pub name: String,
    pub is_dump: bool,
}

impl SegmentLabel {
    /// Output file stem, `<mission>_dynamics_<n>` or `<mission>_dynamics_<n>_dump`.
    pub fn file_stem(&self, mission_name: &str) -> String {
        if self.is_dump {
            format!("{mission_name}_dynamics_{}_dump", self.stage_number)
        } else {
            format!("{mission_name}_dynamics_{}", self.stage_number)
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.stage_number, self.name)
    }
}

#[derive(Debug)]
pub struct SegmentReport<S> {
    pub label: SegmentLabel,
    pub sink: S,
    pub start_time: f64,
    /// Time of the last recorded row, if any.
    pub last_time: Option<f64>,
    pub final_state: FlightState,
    /// `[lat_deg, lon_deg, alt_m]` of the first evaluation below ground.
    pub impact: Option<Vector3<f64>>,
    pub events: Vec<StageEvent>,
    pub max_altitude: f64,
    pub max_downrange: f64,
}

#[derive(Debug)]
pub struct MissionReport<S> {
    /// Stages in order, then dumped products in order of release.
    pub segments: Vec<SegmentReport<S>>,
    pub max_altitude: f64,
    pub max_downrange: f64,
    /// Osculating orbit of the last stage at the end time.
    pub orbit: Option<OrbitCheck>,
}

// ---------------------------------------------------------------------------
// One segment
// ---------------------------------------------------------------------------

/// A dumped product waiting to be flown.
struct PendingDump {
    label: SegmentLabel,
    stage: StageConfig,
    start_time: f64,
    initial: FlightState,
}

struct SegmentRun<S> {
    report: SegmentReport<S>,
    separation: Option<FlightState>,
    dump: Option<PendingDump>,
}

/// Integrate one stage over `[start, end]`, applying its separation and
/// dump mass steps at their breakpoints. `upper_mass` is the initial mass
/// of the stage that separates from this one.
fn fly_segment<S: RecordSink>(
    stage: &StageConfig,
    label: SegmentLabel,
    start: f64,
    end: f64,
    output_step: f64,
    initial: FlightState,
    upper_mass: Option<f64>,
    mut sink: S,
) -> Result<SegmentRun<S>, SimError> {
    let breakpoints = event::breakpoints(stage, start, end);
    info!("{label}: flying {start:.3} s -> {end:.3} s from {:.3} kg", initial.mass);
    debug!("{label}: breakpoints {breakpoints:?}");

    let exit_area = stage.thrust.exit_area();
    let mut seg = Segment::new(stage, start);
    let mut solver = DormandPrince::default();
    let mut y = initial.to_vector();
    let mut last_time = None;
    let mut events = Vec::new();
    let mut dump = None;

    for (i, window) in breakpoints.windows(2).enumerate() {
        let (t0, t1) = (window[0], window[1]);
        // The first row of a later window repeats the previous window's last row
        let mut skip_first = i > 0;
        y = solver.integrate_on_grid(&mut seg, t0, y, t1, start, output_step, |seg, t, y| {
            if std::mem::take(&mut skip_first) {
                return Ok(());
            }
            let state = FlightState::from_vector(y);
            if let Evaluation::Airborne(k) = seg.evaluate(t, &state)? {
                let separated = seg.stage().separation_time.is_some_and(|s| t >= s);
                sink.record(&TrajectoryRecord::from_kinematics(&k, exit_area, separated))?;
                last_time = Some(t);
            }
            Ok(())
        })?;

        let state = FlightState::from_vector(&y);
        seg.latch_events(t1, &state);

        if stage.separation_time == Some(t1) && !seg.ctx.upper_stage_released {
            seg.ctx.upper_stage_released = true;
            if let Some(upper) = upper_mass {
                let ev = release_mass(&label, t1, &mut y[0], upper, EventKind::Separation)?;
                events.push(ev);
            }
        }
        if let Some(d) = stage.dump.filter(|d| d.separation_time == t1) {
            if !seg.ctx.dump_released {
                seg.ctx.dump_released = true;
                if let (Some(product), Some(handoff)) = (stage.dumped_product(), seg.ctx.dump_handoff) {
                    dump = Some(PendingDump {
                        label: SegmentLabel {
                            is_dump: true,
                            name: product.name.clone(),
                            ..label.clone()
                        },
                        stage: product,
                        start_time: t1,
                        initial: handoff,
                    });
                }
                events.push(release_mass(&label, t1, &mut y[0], d.mass, EventKind::Dump)?);
            }
        }
    }

    sink.finish()?;
    let ctx = seg.ctx;
    match ctx.impact {
        Some(p) => info!("{label}: impact at lat {:.5}°, lon {:.5}°", p.x, p.y),
        None => info!("{label}: no impact before {end:.3} s"),
    }

    Ok(SegmentRun {
        report: SegmentReport {
            label,
            sink,
            start_time: start,
            last_time,
            final_state: FlightState::from_vector(&y),
            impact: ctx.impact,
            events,
            max_altitude: ctx.max_altitude,
            max_downrange: ctx.max_downrange,
        },
        separation: ctx.separation_handoff,
        dump,
    })
}

fn release_mass(label: &SegmentLabel, t: f64, mass: &mut f64, released: f64, kind: EventKind) -> Result<StageEvent, SimError> {
    let before = *mass;
    let after = before - released;
    if !(after > 0.0) {
        return Err(SimError::NonPositiveMass {
            segment: label.to_string(),
            time: t,
            mass: after,
        });
    }
    *mass = after;
    debug!("{label}: {kind} at {t:.3} s, mass {before:.3} -> {after:.3} kg");
    Ok(StageEvent {
        time: t,
        kind,
        mass_before: before,
        mass_after: after,
    })
}

// ---------------------------------------------------------------------------
// Full mission
// ---------------------------------------------------------------------------

/// Fly every stage in order, then every dumped product in parallel.
///
/// `make_sink` is called once per segment, possibly from worker threads.
pub fn run_mission<S, F>(mission: &Mission, make_sink: F) -> Result<MissionReport<S>, SimError>
where
    S: RecordSink + Send,
    F: Fn(&SegmentLabel) -> Result<S, SimError> + Sync,
{
    let mut segments = Vec::with_capacity(mission.stages.len());
    let mut dumps = Vec::new();
    let mut handoff: Option<FlightState> = None;

    for (i, stage) in mission.stages.iter().enumerate() {
        let start = mission.stage_start_time(i);
        let initial = match (i, handoff) {
            (0, _) => FlightState::at_launch(&stage.launch, stage.mass_initial),
            (_, Some(s)) => FlightState {
                mass: stage.mass_initial,
                ..s
            },
            (_, None) => {
                warn!("stage {} never separated; later stages are not flown", stage.number);
                break;
            }
        };

        let label = SegmentLabel {
            stage_number: stage.number,
            name: stage.name.clone(),
            is_dump: false,
        };
        let sink = make_sink(&label)?;
        let upper_mass = mission.stages.get(i + 1).map(|s| s.mass_initial);
        let run = fly_segment(stage, label, start, mission.end_time, mission.output_step, initial, upper_mass, sink)?;

        handoff = run.separation;
        dumps.extend(run.dump);
        segments.push(run.report);
    }

    let orbit = segments.last().map(|last| {
        let s = &last.final_state;
        let check = OrbitCheck::from_state(mission.end_time, &s.pos_eci, &s.vel_eci);
        info!(
            "orbit check: perigee {:.1} km, apogee {:.1} km, e = {:.4}, in orbit: {}",
            check.perigee_altitude / 1e3,
            check.apogee_altitude / 1e3,
            check.elements.ecc,
            check.in_orbit
        );
        check
    });

    let dumped = dumps
        .into_par_iter()
        .map(|d| {
            let sink = make_sink(&d.label)?;
            fly_segment(&d.stage, d.label, d.start_time, mission.end_time, mission.output_step, d.initial, None, sink)
                .map(|run| run.report)
        })
        .collect::<Result<Vec<_>, SimError>>()?;
    segments.extend(dumped);

    let max_altitude = segments.iter().map(|s| s.max_altitude).fold(0.0, f64::max);
    let max_downrange = segments.iter().map(|s| s.max_downrange).fold(0.0, f64::max);
    info!("max altitude {:.1} m, max downrange {:.1} m", max_altitude, max_downrange);

    Ok(MissionReport {
        segments,
        max_altitude,
        max_downrange,
        orbit,
    })
}

/// Run a mission into in-memory record buffers.
pub fn simulate(mission: &Mission) -> Result<MissionReport<Vec<TrajectoryRecord>>, SimError> {
    run_mission(mission, |_| Ok(Vec::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::mode::{FreeMode, PoweredMode};
    use crate::physics::coordinates::dcm_eci_to_ned;
    use crate::vehicle::mission::{presets, MissionBuilder};
    use crate::vehicle::stage::StageBuilder;

    #[test]
    fn sounding_rocket_climbs_then_falls_and_impacts_once() {
        let m = presets::sounding_rocket();
        let report = simulate(&m).unwrap();
        assert_eq!(report.segments.len(), 1);
        let seg = &report.segments[0];
        let rows = &seg.sink;

        // Altitude rises monotonically through burnout
        let burn: Vec<&TrajectoryRecord> = rows.iter().filter(|r| r.time <= 10.0).collect();
        assert!(burn.len() > 50, "expected dense output during burn, got {}", burn.len());
        assert!(
            burn.windows(2).all(|w| w[1].altitude > w[0].altitude),
            "altitude must increase during the burn"
        );
        // Mass never increases in the powered segment
        assert!(rows.windows(2).all(|w| w[1].mass <= w[0].mass));
        assert!(rows.windows(2).all(|w| w[1].time > w[0].time), "record times must strictly increase");

        let impact = seg.impact.expect("should impact before 120 s");
        assert!(impact.z < 0.0);
        assert!(report.max_altitude > 500.0, "apogee {}", report.max_altitude);
        assert!(report.max_downrange > 0.0, "downrange {}", report.max_downrange);
        assert!(rows.iter().all(|r| r.altitude >= 0.0));
        // Powered flag goes 1 -> 0 once
        let flips = rows.windows(2).filter(|w| w[0].is_powered != w[1].is_powered).count();
        assert_eq!(flips, 1);
        assert!(!report.orbit.unwrap().in_orbit);
    }

    fn two_stage_no_dump() -> Mission {
        let mut m = presets::two_stage();
        m.stages[0].dump = None;
        m.end_time = 120.0;
        m
    }

    #[test]
    fn two_stage_separation_is_continuous() {
        let m = two_stage_no_dump();
        let report = simulate(&m).unwrap();
        assert_eq!(report.segments.len(), 2);
        let (s1, s2) = (&report.segments[0], &report.segments[1]);

        // Booster burns out before the separation time
        assert!(m.stages[0].thrust.burn_end < 60.0);
        let sep = s1.events.iter().find(|e| e.kind == EventKind::Separation).unwrap();
        assert_eq!(sep.time, 60.0);
        assert!((sep.mass_before - sep.mass_after - m.stages[1].mass_initial).abs() < 1e-9);

        // Upper stage starts from the booster state at 60 s
        let at_sep = s1.sink.iter().find(|r| r.time == 60.0).unwrap();
        let first = &s2.sink[0];
        assert_eq!(first.time, 60.0);
        assert_eq!(first.mass, m.stages[1].mass_initial);
        let dp = (first.pos_eci_x - at_sep.pos_eci_x).abs()
            + (first.pos_eci_y - at_sep.pos_eci_y).abs()
            + (first.pos_eci_z - at_sep.pos_eci_z).abs();
        let dv = (first.vel_eci_x - at_sep.vel_eci_x).abs()
            + (first.vel_eci_y - at_sep.vel_eci_y).abs()
            + (first.vel_eci_z - at_sep.vel_eci_z).abs();
        assert!(dp < 1e-6 && dv < 1e-9, "hand-off jump: pos {dp}, vel {dv}");

        // Booster mass drops by exactly the upper stage mass at 60 s
        let after = s1.sink.iter().find(|r| r.time > 60.0).unwrap();
        assert!((at_sep.mass - after.mass - m.stages[1].mass_initial).abs() < 1e-9);
        assert!(at_sep.is_separated && after.is_separated);
        assert!(s1.sink.iter().filter(|r| r.time < 60.0).all(|r| !r.is_separated));
    }

    #[test]
    fn dump_product_starts_with_rotated_delta_v() {
        let mut m = presets::two_stage();
        m.end_time = 80.0;
        let report = simulate(&m).unwrap();
        assert_eq!(report.segments.len(), 3);
        let booster = &report.segments[0];
        let dump = &report.segments[2];
        assert!(dump.label.is_dump);
        assert_eq!(dump.label.file_stem("two_stage"), "two_stage_dynamics_1_dump");

        let ev = booster.events.iter().find(|e| e.kind == EventKind::Dump).unwrap();
        assert_eq!(ev.time, 20.0);
        assert!((ev.mass_before - ev.mass_after - 5.0).abs() < 1e-9);

        let parent = booster.sink.iter().find(|r| r.time == 20.0).unwrap();
        let child = &dump.sink[0];
        assert_eq!(child.time, 20.0);
        assert_eq!(child.mass, 5.0);

        let llh = Vector3::new(parent.lat, parent.lon, parent.altitude);
        let dv = dcm_eci_to_ned(&llh, 20.0).transpose() * Vector3::new(0.0, 0.0, -5.0);
        let expected = Vector3::new(parent.vel_eci_x, parent.vel_eci_y, parent.vel_eci_z) + dv;
        let got = Vector3::new(child.vel_eci_x, child.vel_eci_y, child.vel_eci_z);
        assert!((got - expected).norm() < 1e-6, "dump velocity off by {}", (got - expected).norm());
        // Ballistic product has no thrust and is never powered
        assert!(dump.sink.iter().all(|r| !r.is_powered && r.thrust == 0.0));
    }

    #[test]
    fn rows_keep_the_output_cadence_after_an_off_grid_dump() {
        let mut m = presets::two_stage();
        m.end_time = 80.0;
        if let Some(d) = m.stages[0].dump.as_mut() {
            d.separation_time = 20.25;
        }
        let report = simulate(&m).unwrap();
        let booster = &report.segments[0];

        assert!(booster.sink.iter().any(|r| r.time == 20.25), "dump instant is recorded");
        for r in booster.sink.iter().filter(|r| r.time != 20.25) {
            let k = (r.time / m.output_step).round();
            assert!(
                (r.time - k * m.output_step).abs() < 1e-9,
                "booster row at {} is off the {} s grid",
                r.time,
                m.output_step
            );
        }
        assert!(booster.sink.iter().any(|r| r.time == 20.5));
        assert!(booster.sink.windows(2).all(|w| w[1].time > w[0].time));
    }

    #[test]
    fn unsupported_mode_aborts_the_run() {
        let m = MissionBuilder::new("bad")
            .end_time(5.0)
            .stage(
                StageBuilder::new("S")
                    .powered_mode(PoweredMode::ThreeDofWithDelay)
                    .constant_thrust(1000.0, 250.0, 0.0, 3.0)
                    .build(),
            )
            .build();
        match simulate(&m) {
            Err(SimError::UnsupportedFlightMode(PoweredMode::ThreeDofWithDelay)) => {}
            other => panic!("expected unsupported mode, got {:?}", other.map(|r| r.segments.len())),
        }
    }

    #[test]
    fn separation_that_empties_the_stage_is_an_error() {
        let m = MissionBuilder::new("heavy")
            .end_time(20.0)
            .stage(StageBuilder::new("A").mass_initial(100.0).separation_time(5.0).build())
            .stage(StageBuilder::new("B").mass_initial(100.0).build())
            .build();
        assert!(matches!(simulate(&m), Err(SimError::NonPositiveMass { .. })));
    }

    #[test]
    fn sinks_are_created_per_segment() {
        let m = Mission {
            end_time: 30.0,
            ..presets::two_stage()
        };
        let report = run_mission(&m, |_| Ok(RowCounter::default())).unwrap();
        // Separation at 60 s never happens; only the booster and its dump fly
        assert_eq!(report.segments.len(), 2);
        assert!(report.segments.iter().all(|s| s.sink.rows > 0 && s.sink.finished));
    }

    #[derive(Default)]
    struct RowCounter {
        rows: usize,
        finished: bool,
    }

    impl RecordSink for RowCounter {
        fn record(&mut self, _row: &TrajectoryRecord) -> Result<(), SimError> {
            self.rows += 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SimError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn aero_stable_coast_has_zero_incidence() {
        let m = MissionBuilder::new("coast")
            .end_time(40.0)
            .output_step(0.5)
            .stage(
                StageBuilder::new("S")
                    .mass_initial(50.0)
                    .constant_thrust(1500.0, 250.0, 0.0, 5.0)
                    .free_mode(FreeMode::AeroStable)
                    .attitude_deg(45.0, 80.0, 0.0)
                    .build(),
            )
            .build();
        let report = simulate(&m).unwrap();
        let coast: Vec<_> = report.segments[0].sink.iter().filter(|r| !r.is_powered).collect();
        assert!(!coast.is_empty());
        assert!(coast.iter().all(|r| r.alpha == 0.0 && r.beta == 0.0 && r.aero_body_y == 0.0));
    }
}
