pub mod attitude;
pub mod environment;
pub mod mission;
pub mod neutrality;
pub mod propulsion;
pub mod stage;

pub use attitude::{AttitudeProgram, AttitudeSource};
pub use environment::{LaunchSite, WindModel};
pub use mission::{presets, Mission, MissionBuilder};
pub use neutrality::Neutrality;
pub use propulsion::{Profile, ThrustModel, ThrustState};
pub use stage::{DumpProduct, StageBuilder, StageConfig};
