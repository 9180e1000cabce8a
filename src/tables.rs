use crate::error::{ConfigError, SimError};

// ---------------------------------------------------------------------------
// 1-D table: linear interpolation, clamped at both ends
// ---------------------------------------------------------------------------

/// Piecewise-linear function of one variable.
///
/// Outside `[x_first, x_last]` the boundary value is returned unchanged;
/// the table never extrapolates. Repeated x values are allowed and give a
/// step (the later row wins at the shared abscissa).
#[derive(Debug, Clone, PartialEq)]
pub struct Table1 {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Table1 {
    pub fn new(name: &str, xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedTable {
            name: name.to_string(),
            reason,
        };
        if xs.is_empty() {
            return Err(malformed("table has no rows".into()));
        }
        if xs.len() != ys.len() {
            return Err(malformed(format!("{} x values but {} y values", xs.len(), ys.len())));
        }
        if let Some(w) = xs.windows(2).find(|w| !(w[1] >= w[0])) {
            return Err(malformed(format!("x axis not ascending at {} -> {}", w[0], w[1])));
        }
        Ok(Self { xs, ys })
    }

    pub fn interp(&self, x: f64) -> f64 {
        interp_clamped(&self.xs, &self.ys, x)
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }
}

/// Linear interpolation over ascending `xs`, holding the end values outside.
pub(crate) fn interp_clamped(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    let i = xs.partition_point(|&v| v <= x);
    if i == 0 {
        return ys[0];
    }
    if i == n {
        return ys[n - 1];
    }
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

// ---------------------------------------------------------------------------
// 2-D grid: bilinear interpolation, out-of-range is an error
// ---------------------------------------------------------------------------

/// Bilinear table over a rectangular grid (rows: `x`, columns: `y`).
///
/// Lookups outside either axis fail with [`SimError::TableDomain`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table2 {
    name: String,
    xs: Vec<f64>,
    ys: Vec<f64>,
    values: Vec<f64>, // row-major, xs.len() * ys.len()
}

impl Table2 {
    pub fn new(
        name: impl Into<String>,
        xs: Vec<f64>,
        ys: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let malformed = |reason: String| ConfigError::MalformedTable {
            name: name.clone(),
            reason,
        };
        if xs.len() < 2 || ys.len() < 2 {
            return Err(malformed(format!(
                "grid needs at least 2x2 cells, got {}x{}",
                xs.len(),
                ys.len()
            )));
        }
        if values.len() != xs.len() * ys.len() {
            return Err(malformed(format!(
                "{} values for a {}x{} grid",
                values.len(),
                xs.len(),
                ys.len()
            )));
        }
        for (axis, v) in [("row", &xs), ("column", &ys)] {
            if let Some(w) = v.windows(2).find(|w| !(w[1] > w[0])) {
                return Err(malformed(format!(
                    "{axis} axis not strictly ascending at {} -> {}",
                    w[0], w[1]
                )));
            }
        }
        Ok(Self { name, xs, ys, values })
    }

    pub fn lookup(&self, x: f64, y: f64) -> Result<f64, SimError> {
        let (i, tx) = self.locate(&self.xs, x, "mach")?;
        let (j, ty) = self.locate(&self.ys, y, "angle")?;
        let at = |r: usize, c: usize| self.values[r * self.ys.len() + c];

        let v00 = at(i, j);
        let v01 = at(i, j + 1);
        let v10 = at(i + 1, j);
        let v11 = at(i + 1, j + 1);
        Ok(v00 * (1.0 - tx) * (1.0 - ty)
            + v10 * tx * (1.0 - ty)
            + v01 * (1.0 - tx) * ty
            + v11 * tx * ty)
    }

    fn locate(&self, axis: &[f64], v: f64, label: &'static str) -> Result<(usize, f64), SimError> {
        let (min, max) = (axis[0], axis[axis.len() - 1]);
        if !(v >= min && v <= max) {
            return Err(SimError::TableDomain {
                table: self.name.clone(),
                axis: label,
                value: v,
                min,
                max,
            });
        }
        let i = (axis.partition_point(|&a| a <= v) - 1).min(axis.len() - 2);
        let t = (v - axis[i]) / (axis[i + 1] - axis[i]);
        Ok((i, t))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> Table1 {
        Table1::new("ramp", vec![0.0, 10.0, 20.0], vec![1.0, 3.0, -1.0]).unwrap()
    }

    fn grid() -> Table2 {
        // v = 2x + 3y, exact under bilinear interpolation
        let xs = vec![0.0, 1.0, 2.0];
        let ys = vec![0.0, 5.0, 10.0];
        let values = xs
            .iter()
            .flat_map(|x| ys.iter().map(move |y| 2.0 * x + 3.0 * y))
            .collect();
        Table2::new("CN", xs, ys, values).unwrap()
    }

    #[test]
    fn interp1_returns_boundary_values_exactly() {
        let t = ramp();
        assert_eq!(t.interp(0.0), 1.0);
        assert_eq!(t.interp(-100.0), 1.0);
        assert_eq!(t.interp(20.0), -1.0);
        assert_eq!(t.interp(1e9), -1.0);
    }

    #[test]
    fn interp1_is_linear_inside() {
        let t = ramp();
        assert_relative_eq!(t.interp(5.0), 2.0);
        assert_relative_eq!(t.interp(15.0), 1.0);
        assert_relative_eq!(t.interp(10.0), 3.0);
    }

    #[test]
    fn interp1_handles_repeated_abscissa_as_step() {
        let t = Table1::new("step", vec![0.0, 5.0, 5.0, 10.0], vec![100.0, 100.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(t.interp(4.999), 100.0);
        assert_eq!(t.interp(5.0), 0.0);
        assert_eq!(t.interp(7.0), 0.0);
    }

    #[test]
    fn table1_rejects_descending_axis() {
        let err = Table1::new("bad", vec![0.0, 2.0, 1.0], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTable { .. }));
    }

    #[test]
    fn interp2_is_bilinear() {
        let t = grid();
        assert_relative_eq!(t.lookup(0.5, 2.5).unwrap(), 8.5, epsilon = 1e-12);
        assert_relative_eq!(t.lookup(1.25, 7.0).unwrap(), 23.5, epsilon = 1e-12);
        // Upper edges are inside the domain
        assert_relative_eq!(t.lookup(2.0, 10.0).unwrap(), 34.0, epsilon = 1e-12);
    }

    #[test]
    fn interp2_out_of_range_is_an_error() {
        let t = grid();
        match t.lookup(2.5, 1.0) {
            Err(SimError::TableDomain { axis, value, .. }) => {
                assert_eq!(axis, "mach");
                assert_eq!(value, 2.5);
            }
            other => panic!("expected domain error, got {other:?}"),
        }
        assert!(t.lookup(1.0, -0.1).is_err());
        assert!(t.lookup(f64::NAN, 1.0).is_err());
    }
}
