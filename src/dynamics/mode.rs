use std::fmt;

use serde::{Deserialize, Serialize};

/// Equations of motion used while the motor is producing thrust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoweredMode {
    #[serde(rename = "3dof")]
    ThreeDof,
    #[serde(rename = "3dof_with_delay")]
    ThreeDofWithDelay,
    #[serde(rename = "6dof")]
    SixDof,
    #[serde(rename = "6dof_aerodynamic_stable")]
    SixDofAeroStable,
}

impl PoweredMode {
    pub fn is_supported(self) -> bool {
        matches!(self, PoweredMode::ThreeDof)
    }
}

/// Equations of motion used while coasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeMode {
    #[serde(rename = "aerodynamic_stable")]
    AeroStable,
    #[serde(rename = "3dof_defined")]
    ThreeDofDefined,
    #[serde(rename = "ballistic")]
    Ballistic,
}

/// Mode in effect for one evaluation. Resolved fresh every time from the
/// motor state; never carried between evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightMode {
    Powered(PoweredMode),
    Free(FreeMode),
}

impl FlightMode {
    pub fn resolve(powered: bool, powered_mode: PoweredMode, free_mode: FreeMode) -> Self {
        if powered {
            FlightMode::Powered(powered_mode)
        } else {
            FlightMode::Free(free_mode)
        }
    }

    pub fn is_powered(self) -> bool {
        matches!(self, FlightMode::Powered(_))
    }
}

impl fmt::Display for PoweredMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoweredMode::ThreeDof => "3dof",
            PoweredMode::ThreeDofWithDelay => "3dof_with_delay",
            PoweredMode::SixDof => "6dof",
            PoweredMode::SixDofAeroStable => "6dof_aerodynamic_stable",
        })
    }
}

impl fmt::Display for FreeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FreeMode::AeroStable => "aerodynamic_stable",
            FreeMode::ThreeDofDefined => "3dof_defined",
            FreeMode::Ballistic => "ballistic",
        })
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightMode::Powered(m) => write!(f, "powered/{m}"),
            FlightMode::Free(m) => write!(f, "free/{m}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse_from_config_strings() {
        let p: PoweredMode = serde_json::from_str("\"6dof_aerodynamic_stable\"").unwrap();
        assert_eq!(p, PoweredMode::SixDofAeroStable);
        let f: FreeMode = serde_json::from_str("\"3dof_defined\"").unwrap();
        assert_eq!(f, FreeMode::ThreeDofDefined);
        assert!(serde_json::from_str::<FreeMode>("\"glide\"").is_err());
    }

    #[test]
    fn only_three_dof_is_supported() {
        assert!(PoweredMode::ThreeDof.is_supported());
        assert!(!PoweredMode::SixDof.is_supported());
    }
}
