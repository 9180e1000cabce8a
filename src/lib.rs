pub mod error;
pub mod tables;
pub mod physics;
pub mod dynamics;
pub mod vehicle;
pub mod sim;
pub mod io;
pub mod orbital;

// Flat re-exports for callers that only want to run a mission
pub mod prelude {
    pub use crate::error::{ConfigError, SimError};
    pub use crate::io::{load_mission, CsvSink, MissionSummary, RecordSink, TrajectoryRecord};
    pub use crate::orbital::OrbitCheck;
    pub use crate::sim::{run_mission, simulate, MissionReport, SegmentLabel, SegmentReport};
    pub use crate::vehicle::{presets, Mission, MissionBuilder, StageBuilder, StageConfig};
}
