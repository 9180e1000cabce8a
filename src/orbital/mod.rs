pub mod elements;
pub mod iip;

pub use elements::{KeplerianElements, OrbitCheck};
pub use iip::impact_point;
