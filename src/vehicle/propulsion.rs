use std::f64::consts::PI;

use crate::dynamics::state::G0;
use crate::tables::Table1;

// ---------------------------------------------------------------------------
// Thrust / Isp sources
// ---------------------------------------------------------------------------

/// A value that is either fixed or tabulated against stage-relative time.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Constant(f64),
    Table(Table1),
}

impl Profile {
    pub fn at(&self, x: f64) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Table(t) => t.interp(x),
        }
    }
}

/// Rocket motor of one stage.
///
/// Burn window times are relative to the stage start (the previous stage's
/// separation time, 0 for the first stage).
#[derive(Debug, Clone, PartialEq)]
pub struct ThrustModel {
    pub vacuum_thrust: Profile, // N
    pub thrust_coefficient: f64,
    pub vacuum_isp: Profile, // s
    pub isp_coefficient: f64,
    pub burn_start: f64,
    pub burn_end: f64,
    pub forced_cutoff: Option<f64>,
    pub throat_diameter: f64, // m
    pub expansion_ratio: f64,
}

/// Motor output at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrustState {
    pub powered: bool,
    pub vacuum_thrust: f64, // N
    pub thrust: f64,        // N, ambient-corrected
    pub mass_flow: f64,     // kg/s
    pub isp: f64,           // s, realized
}

impl ThrustModel {
    /// A motor that never fires.
    pub fn unpowered() -> Self {
        Self {
            vacuum_thrust: Profile::Constant(0.0),
            thrust_coefficient: 1.0,
            vacuum_isp: Profile::Constant(0.0),
            isp_coefficient: 1.0,
            burn_start: 0.0,
            burn_end: 0.0,
            forced_cutoff: None,
            throat_diameter: 0.0,
            expansion_ratio: 0.0,
        }
    }

    pub fn burn_time(&self) -> f64 {
        self.burn_end - self.burn_start
    }

    pub fn throat_area(&self) -> f64 {
        self.throat_diameter * self.throat_diameter * PI / 4.0
    }

    pub fn exit_area(&self) -> f64 {
        self.throat_area() * self.expansion_ratio
    }

    /// Evaluate the motor at mission time `t` for a stage started at
    /// `stage_start`, with `ambient_pressure` in Pa.
    ///
    /// Table lookups run on stretched stage time `(t - start) * k`, so a
    /// thrust coefficient `k > 1` compresses the burn.
    pub fn evaluate(&self, t: f64, stage_start: f64, ambient_pressure: f64) -> ThrustState {
        let k = self.thrust_coefficient;
        let stage_time = (t - stage_start) * k;
        let vacuum_thrust = self.vacuum_thrust.at(stage_time);

        let in_window = t >= stage_start + self.burn_start
            && t < stage_start + self.burn_start + self.burn_time() / k
            && self.forced_cutoff.map_or(true, |c| t < stage_start + c);
        if !in_window || vacuum_thrust == 0.0 {
            return ThrustState::default();
        }

        let isp_vac = self.vacuum_isp.at(stage_time) * self.isp_coefficient;
        let vacuum_thrust = vacuum_thrust * self.isp_coefficient * k;
        let mass_flow = if isp_vac > 0.0 { vacuum_thrust / (isp_vac * G0) } else { 0.0 };
        let thrust = vacuum_thrust - self.exit_area() * ambient_pressure;
        let isp = if mass_flow > 1e-4 { thrust / mass_flow / G0 } else { 0.0 };

        ThrustState {
            powered: true,
            vacuum_thrust,
            thrust,
            mass_flow,
            isp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn motor() -> ThrustModel {
        ThrustModel {
            vacuum_thrust: Profile::Constant(1000.0),
            vacuum_isp: Profile::Constant(250.0),
            burn_end: 10.0,
            throat_diameter: 0.05,
            expansion_ratio: 4.0,
            ..ThrustModel::unpowered()
        }
    }

    #[test]
    fn mass_flow_from_vacuum_performance() {
        let s = motor().evaluate(5.0, 0.0, 0.0);
        assert!(s.powered);
        assert_relative_eq!(s.mass_flow, 1000.0 / (250.0 * G0), epsilon = 1e-12);
        assert_relative_eq!(s.isp, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn ambient_pressure_reduces_thrust_not_flow() {
        let m = motor();
        let vac = m.evaluate(5.0, 0.0, 0.0);
        let sl = m.evaluate(5.0, 0.0, 101_325.0);
        assert_relative_eq!(vac.thrust - sl.thrust, m.exit_area() * 101_325.0, epsilon = 1e-9);
        assert_eq!(vac.mass_flow, sl.mass_flow);
        assert!(sl.isp < vac.isp);
    }

    #[test]
    fn burn_window_is_relative_to_stage_start() {
        let mut m = motor();
        m.burn_start = 2.0;
        assert!(!m.evaluate(101.9, 100.0, 0.0).powered);
        assert!(m.evaluate(102.0, 100.0, 0.0).powered);
        assert!(m.evaluate(109.99, 100.0, 0.0).powered);
        assert!(!m.evaluate(110.0, 100.0, 0.0).powered);
    }

    #[test]
    fn forced_cutoff_ends_burn_early() {
        let mut m = motor();
        m.forced_cutoff = Some(4.0);
        assert!(m.evaluate(3.9, 0.0, 0.0).powered);
        let off = m.evaluate(4.0, 0.0, 0.0);
        assert_eq!(off, ThrustState::default());
    }

    #[test]
    fn thrust_coefficient_compresses_burn() {
        let mut m = motor();
        m.thrust_coefficient = 2.0;
        let s = m.evaluate(4.9, 0.0, 0.0);
        assert!(s.powered);
        assert_relative_eq!(s.vacuum_thrust, 2000.0);
        assert!(!m.evaluate(5.0, 0.0, 0.0).powered);
    }

    #[test]
    fn zero_table_thrust_is_unpowered() {
        let mut m = motor();
        m.vacuum_thrust = Profile::Table(Table1::new("thrust", vec![0.0, 3.0, 3.0, 10.0], vec![500.0, 500.0, 0.0, 0.0]).unwrap());
        assert!(m.evaluate(2.0, 0.0, 0.0).powered);
        assert!(!m.evaluate(4.0, 0.0, 0.0).powered);
    }
}
