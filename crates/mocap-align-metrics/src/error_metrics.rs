//! Tracking-error metrics between the two systems of a [`CombinedTable`].
//!
//! RMSE is pooled across axes: one scalar per marker,
//! `sqrt(mean(err²))` over every valid (frame, axis) sample. NaN samples are
//! skipped, never counted as zero error; a marker without any valid sample
//! reports NaN. Per-axis RMSE is reported separately in [`AxisRmseTable`].

use std::collections::HashMap;

use serde::Serialize;

use crate::combine::CombinedTable;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// `|a - b|` per axis for one (marker, frame).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AbsoluteErrorRow {
    pub marker: String,
    pub frame: usize,
    pub x_error: f64,
    pub y_error: f64,
    pub z_error: f64,
}

impl AbsoluteErrorRow {
    #[inline]
    pub fn axes(&self) -> [f64; 3] {
        [self.x_error, self.y_error, self.z_error]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbsoluteErrorTable {
    pub rows: Vec<AbsoluteErrorRow>,
}

/// Pooled-axis RMSE of one marker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RmseRow {
    pub marker: String,
    pub rmse: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RmseTable {
    pub rows: Vec<RmseRow>,
}

impl RmseTable {
    pub fn get(&self, marker: &str) -> Option<f64> {
        self.rows.iter().find(|r| r.marker == marker).map(|r| r.rmse)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AxisRmseRow {
    pub marker: String,
    pub x_rmse: f64,
    pub y_rmse: f64,
    pub z_rmse: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisRmseTable {
    pub rows: Vec<AxisRmseRow>,
}

impl AxisRmseTable {
    pub fn get(&self, marker: &str) -> Option<&AxisRmseRow> {
        self.rows.iter().find(|r| r.marker == marker)
    }
}

/// Everything [`compute_error_metrics`] derives from one combined table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorMetrics {
    pub absolute_error: AbsoluteErrorTable,
    pub rmse: RmseTable,
    pub axis_rmse: AxisRmseTable,
    /// Pooled RMSE over all markers, frames and axes.
    pub overall_rmse: f64,
}

#[derive(Default, Clone, Copy)]
struct SquaredSum {
    sum: f64,
    count: usize,
}

impl SquaredSum {
    fn push(&mut self, err: f64) {
        if err.is_finite() {
            self.sum += err * err;
            self.count += 1;
        }
    }

    fn merge(&mut self, other: SquaredSum) {
        self.sum += other.sum;
        self.count += other.count;
    }

    fn rmse(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            (self.sum / self.count as f64).sqrt()
        }
    }
}

/// Absolute error per row and axis plus per-marker RMSE.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(rows = combined.len()))
)]
pub fn compute_error_metrics(combined: &CombinedTable) -> ErrorMetrics {
    let mut absolute = Vec::with_capacity(combined.len());
    let mut order: Vec<&str> = Vec::new();
    let mut per_marker: HashMap<&str, [SquaredSum; 3]> = HashMap::new();

    for r in &combined.records {
        // NaN minus anything stays NaN, so missing samples propagate here.
        let diff = r.a.position - r.b.position;
        let row = AbsoluteErrorRow {
            marker: r.marker.clone(),
            frame: r.frame,
            x_error: diff.x.abs(),
            y_error: diff.y.abs(),
            z_error: diff.z.abs(),
        };
        let sums = per_marker.entry(r.marker.as_str()).or_insert_with(|| {
            order.push(r.marker.as_str());
            [SquaredSum::default(); 3]
        });
        for (acc, err) in sums.iter_mut().zip(row.axes()) {
            acc.push(err);
        }
        absolute.push(row);
    }

    let mut rmse = Vec::with_capacity(order.len());
    let mut axis_rmse = Vec::with_capacity(order.len());
    let mut overall = SquaredSum::default();
    for marker in order {
        let [x, y, z] = per_marker[marker];
        let mut pooled = SquaredSum::default();
        for axis in [x, y, z] {
            pooled.merge(axis);
        }
        overall.merge(pooled);
        rmse.push(RmseRow {
            marker: marker.to_owned(),
            rmse: pooled.rmse(),
        });
        axis_rmse.push(AxisRmseRow {
            marker: marker.to_owned(),
            x_rmse: x.rmse(),
            y_rmse: y.rmse(),
            z_rmse: z.rmse(),
        });
    }

    ErrorMetrics {
        absolute_error: AbsoluteErrorTable { rows: absolute },
        rmse: RmseTable { rows: rmse },
        axis_rmse: AxisRmseTable { rows: axis_rmse },
        overall_rmse: overall.rmse(),
    }
}
