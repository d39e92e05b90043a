use std::collections::HashMap;

use log::debug;
use nalgebra::{Point3, Vector3};

use crate::table::LongFormTable;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("key (marker `{marker}`, frame {frame}) is missing from system `{missing_from}`")]
    KeySetMismatch {
        marker: String,
        frame: usize,
        missing_from: String,
    },
    #[error("key (marker `{marker}`, frame {frame}) appears more than once in system `{system}`")]
    DuplicateKey {
        marker: String,
        frame: usize,
        system: String,
    },
}

/// Values one system reported for a (marker, frame) key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemSample {
    pub position: Point3<f64>,
    pub velocity: Option<Vector3<f64>>,
}

/// Both systems' values for one (marker, frame) key.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedRecord {
    pub marker: String,
    pub frame: usize,
    pub a: SystemSample,
    pub b: SystemSample,
}

/// Row-aligned join of two long-form tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombinedTable {
    pub system_a: String,
    pub system_b: String,
    pub records: Vec<CombinedRecord>,
}

impl CombinedTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, marker: &str, frame: usize) -> Option<&CombinedRecord> {
        self.records
            .iter()
            .find(|r| r.frame == frame && r.marker == marker)
    }
}

fn index_keys<'a>(
    table: &'a LongFormTable,
    system: &str,
) -> Result<HashMap<(&'a str, usize), usize>, CombineError> {
    let mut keys = HashMap::with_capacity(table.len());
    for (i, r) in table.records.iter().enumerate() {
        if keys.insert((r.marker.as_str(), r.frame), i).is_some() {
            return Err(CombineError::DuplicateKey {
                marker: r.marker.clone(),
                frame: r.frame,
                system: system.to_owned(),
            });
        }
    }
    Ok(keys)
}

fn system_name(table: &LongFormTable, fallback: &str) -> String {
    table
        .system
        .clone()
        .unwrap_or_else(|| fallback.to_owned())
}

/// Join `a` and `b` on (marker, frame).
///
/// The key sets must be identical: a key present on one side only fails
/// with [`CombineError::KeySetMismatch`] naming the side it is missing from.
/// Output rows follow `a`'s row order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(rows_a = a.len(), rows_b = b.len()))
)]
pub fn combine_tables(a: &LongFormTable, b: &LongFormTable) -> Result<CombinedTable, CombineError> {
    let system_a = system_name(a, "a");
    let system_b = system_name(b, "b");
    let keys_a = index_keys(a, &system_a)?;
    let keys_b = index_keys(b, &system_b)?;

    let mut records = Vec::with_capacity(a.len());
    for ra in &a.records {
        let Some(&ib) = keys_b.get(&(ra.marker.as_str(), ra.frame)) else {
            return Err(CombineError::KeySetMismatch {
                marker: ra.marker.clone(),
                frame: ra.frame,
                missing_from: system_b,
            });
        };
        let rb = &b.records[ib];
        records.push(CombinedRecord {
            marker: ra.marker.clone(),
            frame: ra.frame,
            a: SystemSample {
                position: ra.position,
                velocity: ra.velocity,
            },
            b: SystemSample {
                position: rb.position,
                velocity: rb.velocity,
            },
        });
    }

    // Every key of `a` matched; any extra key in `b` is absent from `a`.
    if keys_b.len() != keys_a.len() {
        if let Some(rb) = b
            .records
            .iter()
            .find(|r| !keys_a.contains_key(&(r.marker.as_str(), r.frame)))
        {
            return Err(CombineError::KeySetMismatch {
                marker: rb.marker.clone(),
                frame: rb.frame,
                missing_from: system_a,
            });
        }
    }

    debug!(
        "combined {} rows of `{}` with `{}`",
        records.len(),
        system_a,
        system_b
    );
    Ok(CombinedTable {
        system_a,
        system_b,
        records,
    })
}
