use std::fmt;

use serde::Serialize;

use crate::vehicle::stage::StageConfig;

// ---------------------------------------------------------------------------
// Discrete mass events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The next stage leaves; its initial mass is removed.
    Separation,
    /// A dumped product leaves; its mass is removed.
    Dump,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Separation => "separation",
            EventKind::Dump => "dump",
        })
    }
}

/// A mass discontinuity applied between two sub-intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageEvent {
    pub time: f64,
    pub kind: EventKind,
    pub mass_before: f64,
    pub mass_after: f64,
}

/// Integration breakpoints for a stage flown over `[start, end]`: the
/// bounds plus every dump or separation time strictly inside, sorted and
/// without duplicates.
pub fn breakpoints(stage: &StageConfig, start: f64, end: f64) -> Vec<f64> {
    let inside = |t: &f64| *t > start && *t < end;
    let mut times: Vec<f64> = [Some(start), stage.dump.map(|d| d.separation_time), stage.separation_time, Some(end)]
        .into_iter()
        .flatten()
        .filter(|t| *t == start || *t == end || inside(t))
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::stage::{DumpProduct, StageBuilder};
    use nalgebra::Vector3;

    fn dump_at(t: f64) -> DumpProduct {
        DumpProduct {
            separation_time: t,
            mass: 1.0,
            ballistic_coefficient: 10.0,
            delta_v_ned: Vector3::zeros(),
        }
    }

    #[test]
    fn dump_and_separation_split_the_window() {
        let stage = StageBuilder::new("S").separation_time(60.0).dump(dump_at(20.0)).build();
        assert_eq!(breakpoints(&stage, 0.0, 600.0), vec![0.0, 20.0, 60.0, 600.0]);
    }

    #[test]
    fn events_outside_the_window_are_ignored() {
        let stage = StageBuilder::new("S").separation_time(700.0).dump(dump_at(5.0)).build();
        assert_eq!(breakpoints(&stage, 10.0, 600.0), vec![10.0, 600.0]);
    }

    #[test]
    fn coincident_times_collapse() {
        let stage = StageBuilder::new("S").separation_time(30.0).dump(dump_at(30.0)).build();
        assert_eq!(breakpoints(&stage, 0.0, 100.0), vec![0.0, 30.0, 100.0]);
        // Start and end coincide
        assert_eq!(breakpoints(&StageBuilder::new("E").build(), 50.0, 50.0), vec![50.0]);
    }
}
