//! Delimited-text writers for the tables of this crate.

use std::path::Path;

use serde::Serialize;

use crate::combine::{CombinedTable, SystemSample};
use crate::error_metrics::{AbsoluteErrorTable, AxisRmseTable, RmseTable};
use crate::table::LongFormTable;

#[derive(thiserror::Error, Debug)]
pub enum TableIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<(), TableIoError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

type SystemColumns = (f64, f64, f64, Option<f64>, Option<f64>, Option<f64>);

fn system_columns(s: &SystemSample) -> SystemColumns {
    let v = s.velocity;
    (
        s.position.x,
        s.position.y,
        s.position.z,
        v.map(|v| v.x),
        v.map(|v| v.y),
        v.map(|v| v.z),
    )
}

impl LongFormTable {
    /// Columns: `marker, frame, x, y, z, x_velocity, y_velocity, z_velocity, system`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableIoError> {
        write_rows(path.as_ref(), self.rows())
    }
}

impl AbsoluteErrorTable {
    /// Columns: `marker, frame, x_error, y_error, z_error`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableIoError> {
        write_rows(path.as_ref(), &self.rows)
    }
}

impl RmseTable {
    /// Columns: `marker, rmse`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableIoError> {
        write_rows(path.as_ref(), &self.rows)
    }
}

impl AxisRmseTable {
    /// Columns: `marker, x_rmse, y_rmse, z_rmse`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableIoError> {
        write_rows(path.as_ref(), &self.rows)
    }
}

impl CombinedTable {
    /// Columns: `marker, frame`, then `x, y, z, x_velocity, y_velocity,
    /// z_velocity` for each system, prefixed with the system name.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableIoError> {
        // The header depends on the system names, so it is written by hand and
        // rows go through serde like every other table.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())?;
        let mut header = vec!["marker".to_string(), "frame".to_string()];
        for system in [&self.system_a, &self.system_b] {
            for col in ["x", "y", "z", "x_velocity", "y_velocity", "z_velocity"] {
                header.push(format!("{system}_{col}"));
            }
        }
        writer.write_record(&header)?;

        for r in &self.records {
            let (ax, ay, az, avx, avy, avz) = system_columns(&r.a);
            let (bx, by, bz, bvx, bvy, bvz) = system_columns(&r.b);
            writer.serialize((
                r.marker.as_str(),
                r.frame,
                ax,
                ay,
                az,
                avx,
                avy,
                avz,
                bx,
                by,
                bz,
                bvx,
                bvy,
                bvz,
            ))?;
        }
        writer.flush()?;
        Ok(())
    }
}
