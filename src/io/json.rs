use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::orbital::OrbitCheck;
use crate::sim::{MissionReport, StageEvent};

/// Per-segment part of the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub label: String,
    pub file_stem: String,
    pub start_time: f64,
    pub last_time: Option<f64>,
    pub final_mass: f64,
    /// `[lat_deg, lon_deg, alt_m]` of the first evaluation below ground.
    pub impact_llh: Option<[f64; 3]>,
    pub max_altitude: f64,
    pub max_downrange: f64,
    pub events: Vec<StageEvent>,
}

/// Run summary written next to the trajectory files.
#[derive(Debug, Clone, Serialize)]
pub struct MissionSummary {
    pub name: String,
    pub max_altitude: f64,
    pub max_downrange: f64,
    pub segments: Vec<SegmentSummary>,
    pub orbit: Option<OrbitCheck>,
}

impl MissionSummary {
    pub fn from_report<S>(name: &str, report: &MissionReport<S>) -> Self {
        let segments = report
            .segments
            .iter()
            .map(|seg| SegmentSummary {
                label: seg.label.to_string(),
                file_stem: seg.label.file_stem(name),
                start_time: seg.start_time,
                last_time: seg.last_time,
                final_mass: seg.final_state.mass,
                impact_llh: seg.impact.map(|p| [p.x, p.y, p.z]),
                max_altitude: seg.max_altitude,
                max_downrange: seg.max_downrange,
                events: seg.events.clone(),
            })
            .collect();
        Self {
            name: name.to_string(),
            max_altitude: report.max_altitude,
            max_downrange: report.max_downrange,
            segments,
            orbit: report.orbit,
        }
    }

    pub fn write<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    pub fn write_file(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write(&mut out)?;
        writeln!(out)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::simulate;
    use crate::vehicle::presets;

    #[test]
    fn summary_lists_every_segment() {
        let mut mission = presets::two_stage();
        mission.end_time = 80.0;
        let report = simulate(&mission).unwrap();
        let summary = MissionSummary::from_report(&mission.name, &report);

        assert_eq!(summary.segments.len(), report.segments.len());
        assert_eq!(summary.segments[0].file_stem, "two_stage_dynamics_1");
        assert!(summary.segments.iter().any(|s| s.file_stem.ends_with("_dump")));
        assert_eq!(summary.max_altitude, report.max_altitude);
    }

    #[test]
    fn json_output_is_valid() {
        let mission = presets::sounding_rocket();
        let report = simulate(&mission).unwrap();
        let summary = MissionSummary::from_report(&mission.name, &report);

        let mut buf = Vec::new();
        summary.write(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["name"], "sounding");
        assert!(value["max_altitude"].as_f64().unwrap() > 500.0);
        assert!(value["segments"][0]["impact_llh"].is_array());
        assert_eq!(value["orbit"]["in_orbit"], false);
    }

    #[test]
    fn write_file_creates_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let mission = presets::sounding_rocket();
        let report = simulate(&mission).unwrap();
        MissionSummary::from_report(&mission.name, &report).write_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"segments\""));
    }
}
