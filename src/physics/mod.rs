pub mod aerodynamics;
pub mod atmosphere;
pub mod coordinates;
pub mod gravity;

pub use aerodynamics::{AeroModel, AxialCoefficient, NormalCoefficient};
pub use atmosphere::{Atmo, DensityVariation};
pub use coordinates::Attitude;
