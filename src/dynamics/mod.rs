pub mod evaluator;
pub mod gimbal;
pub mod mode;
pub mod state;

pub use evaluator::{DerivedKinematics, Evaluation, StageDynamics};
pub use gimbal::GimbalSolution;
pub use mode::{FlightMode, FreeMode, PoweredMode};
pub use state::{FlightState, StateVector, G0};
