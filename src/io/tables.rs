use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::ConfigError;
use crate::physics::atmosphere::DensityVariation;
use crate::tables::{Table1, Table2};
use crate::vehicle::environment::WindModel;

// ---------------------------------------------------------------------------
// Column names used by the input tables
// ---------------------------------------------------------------------------

pub const TIME: &str = "time[s]";
pub const THRUST_VAC: &str = "thrust vac[N]";
pub const ISP_VAC: &str = "Isp vac[s]";
pub const AZIMUTH: &str = "azimuth[deg]";
pub const ELEVATION: &str = "elevation[deg]";
pub const ROLL: &str = "roll[deg]";
pub const MACH: &str = "mach[-]";
pub const CA: &str = "CA[-]";
pub const ALTITUDE: &str = "altitude[m]";
pub const WIND_SPEED: &str = "wind_speed[m/s]";
pub const WIND_DIRECTION: &str = "direction[deg]";
pub const DENSITY_VARIATION: &str = "air density variation[percent]";
pub const CG_STATION: &str = "CG_pos_STA[m]";
pub const CONTROLLER_STATION: &str = "Controller_pos_STA[m]";

// ---------------------------------------------------------------------------
// Named-column tables
// ---------------------------------------------------------------------------

/// A numeric CSV table with a header row.
#[derive(Debug, Clone)]
pub struct ColumnTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ColumnTable {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let csv_err = |source| ConfigError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path).map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            // Header is line 1
            rows.push(parse_row(path, i + 2, &record)?);
        }
        if rows.len() < 2 {
            return Err(malformed(path, format!("needs at least 2 data rows, found {}", rows.len())));
        }
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>, ConfigError> {
        let idx = self.index_of(name).ok_or_else(|| ConfigError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// `y` as a function of `x`.
    pub fn table1(&self, x: &str, y: &str) -> Result<Table1, ConfigError> {
        Table1::new(&format!("{} ({y})", self.path.display()), self.column(x)?, self.column(y)?)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn parse_row(path: &Path, line: usize, record: &StringRecord) -> Result<Vec<f64>, ConfigError> {
    record
        .iter()
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| malformed(path, format!("line {line}: `{field}` is not a number")))
        })
        .collect()
}

fn malformed(path: &Path, reason: String) -> ConfigError {
    ConfigError::MalformedTable {
        name: path.display().to_string(),
        reason,
    }
}

// ---------------------------------------------------------------------------
// Header-less Mach x angle grids
// ---------------------------------------------------------------------------

/// Read a grid whose first row is `corner, angle_1, angle_2, ...` (degrees)
/// and whose first column below it is Mach.
pub fn read_grid(path: &Path) -> Result<Table2, ConfigError> {
    let csv_err = |source| ConfigError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut records = reader.records();
    let axis_row = match records.next() {
        Some(r) => r.map_err(csv_err)?,
        None => return Err(malformed(path, "grid is empty".into())),
    };
    if axis_row.len() < 3 {
        return Err(malformed(path, format!("grid needs at least 3 columns, found {}", axis_row.len())));
    }
    let angles = parse_row(path, 1, &axis_row)?.split_off(1);

    let mut mach = Vec::new();
    let mut values = Vec::with_capacity(angles.len() * 8);
    for (i, record) in records.enumerate() {
        let row = parse_row(path, i + 2, &record.map_err(csv_err)?)?;
        mach.push(row[0]);
        values.extend_from_slice(&row[1..]);
    }
    Table2::new(path.display().to_string(), mach, angles, values)
}

// ---------------------------------------------------------------------------
// Typed loaders
// ---------------------------------------------------------------------------

pub fn read_thrust(path: &Path) -> Result<Table1, ConfigError> {
    ColumnTable::read(path)?.table1(TIME, THRUST_VAC)
}

pub fn read_isp(path: &Path) -> Result<Table1, ConfigError> {
    ColumnTable::read(path)?.table1(TIME, ISP_VAC)
}

pub fn read_axial(path: &Path) -> Result<Table1, ConfigError> {
    ColumnTable::read(path)?.table1(MACH, CA)
}

/// Attitude program in degrees; the roll column may be absent.
pub struct AttitudeTables {
    pub azimuth: Table1,
    pub elevation: Table1,
    pub roll: Option<Table1>,
}

pub fn read_attitude(path: &Path) -> Result<AttitudeTables, ConfigError> {
    let table = ColumnTable::read(path)?;
    let roll = if table.has_column(ROLL) {
        Some(table.table1(TIME, ROLL)?)
    } else {
        None
    };
    Ok(AttitudeTables {
        azimuth: table.table1(TIME, AZIMUTH)?,
        elevation: table.table1(TIME, ELEVATION)?,
        roll,
    })
}

pub fn read_wind(path: &Path) -> Result<WindModel, ConfigError> {
    let table = ColumnTable::read(path)?;
    WindModel::profile(
        table.column(ALTITUDE)?,
        &table.column(WIND_SPEED)?,
        &table.column(WIND_DIRECTION)?,
    )
}

pub fn read_density_variation(path: &Path) -> Result<DensityVariation, ConfigError> {
    Ok(DensityVariation::Table(ColumnTable::read(path)?.table1(ALTITUDE, DENSITY_VARIATION)?))
}

/// CG and gimbal station histories.
pub fn read_stations(path: &Path) -> Result<(Table1, Table1), ConfigError> {
    let table = ColumnTable::read(path)?;
    Ok((table.table1(TIME, CG_STATION)?, table.table1(TIME, CONTROLLER_STATION)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn thrust_table_reads_named_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "thrust.csv", "time[s], thrust vac[N]\n0, 1000\n10, 2000\n");
        let t = read_thrust(&path).unwrap();
        assert_relative_eq!(t.interp(5.0), 1500.0);
    }

    #[test]
    fn column_order_does_not_matter() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ca.csv", "CA[-],mach[-]\n0.3,0.0\n0.5,1.0\n0.4,2.0\n");
        let t = read_axial(&path).unwrap();
        assert_eq!(t.xs(), &[0.0, 1.0, 2.0]);
        assert_relative_eq!(t.interp(1.5), 0.45);
    }

    #[test]
    fn missing_column_is_named() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "isp.csv", "time[s],isp\n0,200\n1,210\n");
        match read_isp(&path) {
            Err(ConfigError::MissingColumn { column, .. }) => assert_eq!(column, ISP_VAC),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn roll_column_is_optional() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "att.csv", "time[s],azimuth[deg],elevation[deg]\n0,90,90\n20,90,60\n");
        let att = read_attitude(&path).unwrap();
        assert!(att.roll.is_none());
        assert_relative_eq!(att.elevation.interp(10.0), 75.0);

        let path = write(&dir, "att_roll.csv", "time[s],azimuth[deg],elevation[deg],roll[deg]\n0,90,90,0\n20,90,60,10\n");
        assert!(read_attitude(&path).unwrap().roll.is_some());
    }

    #[test]
    fn ragged_or_non_numeric_rows_are_rejected() {
        let dir = TempDir::new().unwrap();
        let ragged = write(&dir, "ragged.csv", "time[s],thrust vac[N]\n0,1\n1\n");
        assert!(matches!(read_thrust(&ragged), Err(ConfigError::Csv { .. })));
        let text = write(&dir, "text.csv", "time[s],thrust vac[N]\n0,1\n1,lots\n");
        assert!(matches!(read_thrust(&text), Err(ConfigError::MalformedTable { .. })));
        let short = write(&dir, "short.csv", "time[s],thrust vac[N]\n0,1\n");
        assert!(matches!(read_thrust(&short), Err(ConfigError::MalformedTable { .. })));
    }

    #[test]
    fn wind_profile_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "wind.csv", "altitude[m],wind_speed[m/s],direction[deg]\n0,5,90\n10000,20,90\n");
        let (speed, dir_deg) = read_wind(&path).unwrap().at(5000.0);
        assert_relative_eq!(speed, 12.5, epsilon = 1e-9);
        assert_relative_eq!(dir_deg, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn grid_reads_angle_row_and_mach_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "cn.csv", "0,0,10\n0.0,0.0,1.0\n2.0,0.0,3.0\n");
        let t = read_grid(&path).unwrap();
        assert_relative_eq!(t.lookup(1.0, 5.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(t.lookup(2.0, 10.0).unwrap(), 3.0, epsilon = 1e-12);
        assert!(t.lookup(3.0, 5.0).is_err());
    }

    #[test]
    fn narrow_grid_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "narrow.csv", "0,0\n1,2\n3,4\n");
        assert!(matches!(read_grid(&path), Err(ConfigError::MalformedTable { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_thrust(Path::new("/nonexistent/thrust.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/thrust.csv"), "{err}");
    }
}
