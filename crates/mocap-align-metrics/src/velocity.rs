use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::table::LongFormTable;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-marker first-difference velocity, in position units per frame.
///
/// Each marker's rows are differenced in table order; the first row of every
/// marker has no predecessor and gets a NaN velocity. A NaN position yields
/// NaN velocity on both sides of it. Returns a new table.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(rows = table.len()))
)]
pub fn estimate_velocity(table: &LongFormTable) -> LongFormTable {
    let mut previous: HashMap<&str, Point3<f64>> = HashMap::new();
    let mut out = table.clone();
    for (src, dst) in table.records.iter().zip(out.records.iter_mut()) {
        let velocity = match previous.insert(src.marker.as_str(), src.position) {
            Some(prev) => src.position - prev,
            None => Vector3::repeat(f64::NAN),
        };
        dst.velocity = Some(velocity);
    }
    out
}
