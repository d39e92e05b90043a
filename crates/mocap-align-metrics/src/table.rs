use mocap_align_core::{MarkerSet, TrajectoryArray, TrajectoryError};
use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// One observation of one marker at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LongFormRecord {
    pub marker: String,
    pub frame: usize,
    pub position: Point3<f64>,
    /// `None` until [`estimate_velocity`](crate::estimate_velocity) runs.
    pub velocity: Option<Vector3<f64>>,
}

/// Long-form table: one row per (marker, frame), optionally labelled with
/// the tracking system it came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LongFormTable {
    pub system: Option<String>,
    pub records: Vec<LongFormRecord>,
}

impl LongFormTable {
    pub fn new(records: Vec<LongFormRecord>) -> Self {
        Self {
            system: None,
            records,
        }
    }

    /// Flatten an array into rows, marker by marker, each marker's frames in order.
    pub fn from_array(array: &TrajectoryArray, markers: &MarkerSet) -> Result<Self, TrajectoryError> {
        if array.num_markers() != markers.len() {
            return Err(TrajectoryError::VocabularyMismatch {
                array_markers: array.num_markers(),
                vocabulary: markers.len(),
            });
        }
        let mut records = Vec::with_capacity(array.num_frames() * markers.len());
        for (m, name) in markers.names().iter().enumerate() {
            for (frame, points) in array.iter_frames().enumerate() {
                records.push(LongFormRecord {
                    marker: name.clone(),
                    frame,
                    position: points[m],
                    velocity: None,
                });
            }
        }
        Ok(Self::new(records))
    }

    /// Attach a system label, e.g. `"qualisys"`.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn system_label(&self) -> &str {
        self.system.as_deref().unwrap_or("")
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows of one marker, in table order.
    pub fn marker_records<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a LongFormRecord> + 'a {
        self.records.iter().filter(move |r| r.marker == marker)
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = LongFormRow<'_>> + '_ {
        let system = self.system_label();
        self.records.iter().map(move |r| {
            let v = r.velocity;
            LongFormRow {
                marker: &r.marker,
                frame: r.frame,
                x: r.position.x,
                y: r.position.y,
                z: r.position.z,
                x_velocity: v.map(|v| v.x),
                y_velocity: v.map(|v| v.y),
                z_velocity: v.map(|v| v.z),
                system,
            }
        })
    }
}

/// Flat CSV row for a [`LongFormRecord`].
#[derive(Serialize)]
pub(crate) struct LongFormRow<'a> {
    marker: &'a str,
    frame: usize,
    x: f64,
    y: f64,
    z: f64,
    x_velocity: Option<f64>,
    y_velocity: Option<f64>,
    z_velocity: Option<f64>,
    system: &'a str,
}
