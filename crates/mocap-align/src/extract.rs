use std::path::Path;

use log::debug;
use mocap_align_core::{extract_markers, MarkerSet, MarkerSetError, TrajectoryArray, TrajectoryError};
use mocap_align_metrics::LongFormTable;

use crate::load::{load_trajectory, LoadError};

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Markers(#[from] MarkerSetError),
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A named marker subset sliced out of one system's native array.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedMarkers {
    /// `frames × wanted.len()` array, marker axis in `markers` order.
    pub array: TrajectoryArray,
    pub markers: MarkerSet,
    /// The same data in long form, without system label or velocity.
    pub table: LongFormTable,
}

/// Slice `wanted` out of `raw` (whose marker axis is described by `native`).
///
/// Fails with [`MarkerSetError::MarkerNotFound`] if any requested marker is
/// not in `native`. `raw` is left untouched.
pub fn extract<S: AsRef<str>>(
    raw: &TrajectoryArray,
    native: &MarkerSet,
    wanted: &[S],
) -> Result<ExtractedMarkers, ExtractError> {
    let (array, markers) = extract_markers(raw, native, wanted)?;
    let table = LongFormTable::from_array(&array, &markers)?;
    debug!(
        "extracted {} of {} markers over {} frames",
        markers.len(),
        native.len(),
        array.num_frames()
    );
    Ok(ExtractedMarkers {
        array,
        markers,
        table,
    })
}

/// Load the native array from `path`, then [`extract`].
pub fn extract_from_path<S: AsRef<str>>(
    path: impl AsRef<Path>,
    native: &MarkerSet,
    wanted: &[S],
) -> Result<ExtractedMarkers, ExtractError> {
    let raw = load_trajectory(path)?;
    extract(&raw, native, wanted)
}
