pub mod event;
pub mod integrator;
pub mod runner;
pub mod segment;

pub use event::{EventKind, StageEvent};
pub use integrator::{DormandPrince, OdeSystem};
pub use runner::{run_mission, simulate, MissionReport, SegmentLabel, SegmentReport};
pub use segment::{Segment, SegmentContext};
