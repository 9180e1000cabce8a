use crate::dynamics::state::G0;
use crate::tables::{interp_clamped, Table1};

// ---------------------------------------------------------------------------
// 8-layer standard atmosphere (0 to 84.852 km, isothermal above)
// ---------------------------------------------------------------------------

pub const R_AIR: f64 = 287.0531; // J/(kg·K)
pub const GAMMA: f64 = 1.4;

const LAYER_BASE: [f64; 8] = [0.0, 11_000.0, 20_000.0, 32_000.0, 47_000.0, 51_000.0, 71_000.0, 84_852.0];
const LAPSE_RATE: [f64; 8] = [-0.0065, 0.0, 0.001, 0.0028, 0.0, -0.0028, -0.002, 0.0];
const BASE_TEMPERATURE: [f64; 8] = [288.15, 216.65, 216.65, 228.65, 270.65, 270.65, 214.65, 186.95];
const BASE_PRESSURE: [f64; 8] = [101_325.0, 22_632.0, 5_474.9, 868.02, 110.91, 66.939, 3.9564, 0.3734];

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmo {
    pub density: f64,     // kg/m^3
    pub pressure: f64,    // Pa
    pub temperature: f64, // K
    pub sound_speed: f64, // m/s
}

/// Standard atmosphere at `altitude_m`.
///
/// Negative altitudes use the lowest layer extended downward; everything
/// above the last breakpoint is isothermal.
pub fn standard(altitude_m: f64) -> Atmo {
    let k = LAYER_BASE.partition_point(|&h| h <= altitude_m).saturating_sub(1);
    let (h0, lapse, t0, p0) = (LAYER_BASE[k], LAPSE_RATE[k], BASE_TEMPERATURE[k], BASE_PRESSURE[k]);

    let temperature = t0 + lapse * (altitude_m - h0);
    let pressure = if lapse != 0.0 {
        p0 * (temperature / t0).powf(G0 / (-lapse * R_AIR))
    } else {
        p0 * (G0 / R_AIR * (h0 - altitude_m) / t0).exp()
    };

    Atmo {
        density: pressure / (R_AIR * temperature),
        pressure,
        temperature,
        sound_speed: (GAMMA * R_AIR * temperature).sqrt(),
    }
}

// ---------------------------------------------------------------------------
// Density variation
// ---------------------------------------------------------------------------

// Empirical envelope of density deviation [%] against altitude [m]
// (U.S. Standard Atmosphere, part 2, density variations).
const MINUS_PERCENT: [f64; 14] = [21.6, 7.4, -1.3, -14.3, -15.9, -18.6, -32.1, -38.6, -50.0, -55.3, -65.0, -68.1, -76.7, -42.2];
const MINUS_ALTITUDE: [f64; 14] = [1010.0, 4300.0, 8030.0, 10220.0, 16360.0, 20300.0, 26220.0, 29950.0, 40250.0, 50110.0, 59970.0, 70270.0, 80140.0, 90220.0];
const PLUS_PERCENT: [f64; 14] = [-12.8, -7.9, 1.5, 5.3, 26.7, 20.2, 14.3, 18.2, 33.6, 47.4, 59.5, 72.2, 58.7, 41.4];
const PLUS_ALTITUDE: [f64; 14] = [1230.0, 4300.0, 8030.0, 10000.0, 16360.0, 20300.0, 26220.0, 29950.0, 40250.0, 50110.0, 59970.0, 70270.0, 80360.0, 90880.0];

/// Policy for perturbing the standard density.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DensityVariation {
    #[default]
    Nominal,
    /// Scale the built-in envelope by a percentage in [-100, 100].
    Percent(f64),
    /// Altitude [m] to deviation [%] table.
    Table(Table1),
}

impl DensityVariation {
    /// Relative density deviation; density is multiplied by `1 + coefficient`.
    pub fn coefficient(&self, altitude_m: f64) -> f64 {
        match self {
            DensityVariation::Nominal => 0.0,
            DensityVariation::Percent(p) if *p == 0.0 => 0.0,
            DensityVariation::Percent(p) => {
                let envelope = if *p < 0.0 {
                    interp_clamped(&MINUS_ALTITUDE, &MINUS_PERCENT, altitude_m)
                } else {
                    interp_clamped(&PLUS_ALTITUDE, &PLUS_PERCENT, altitude_m)
                };
                envelope / 100.0 * p.abs() / 100.0
            }
            DensityVariation::Table(t) => t.interp(altitude_m) / 100.0,
        }
    }

    pub fn atmosphere(&self, altitude_m: f64) -> Atmo {
        let mut air = standard(altitude_m);
        air.density *= 1.0 + self.coefficient(altitude_m);
        air
    }
}
