pub mod config;
pub mod csv;
pub mod json;
pub mod tables;

pub use self::config::load_mission;
pub use self::csv::{CsvSink, RecordSink, TrajectoryRecord};
pub use self::json::MissionSummary;
