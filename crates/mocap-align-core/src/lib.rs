//! Core types and geometry for aligning two motion-capture recordings.
//!
//! This crate is intentionally small and purely geometric. It knows nothing
//! about files, tables or tracking-system specifics: it works on fixed-shape
//! `frames × markers × xyz` arrays where a missing sample is a NaN point.
//!
//! The main entry points are:
//! - [`MarkerSet`] and [`extract_markers`] to slice a named marker subset out
//!   of a system's native array,
//! - [`solve_alignment`] to compute the best-fit [`SimilarityTransform`] at a
//!   representative frame (Kabsch / Umeyama),
//! - [`apply_transform`] to map every frame of a trajectory.

mod logger;
mod marker_set;
mod solver;
mod trajectory;
mod transform;

pub use marker_set::{extract_markers, MarkerSet, MarkerSetError};
pub use solver::{
    solve_alignment, solve_alignment_at_frame, AlignError, AlignmentMode, CorrespondenceIssue,
};
pub use trajectory::{is_missing, missing_point, TrajectoryArray, TrajectoryError};
pub use transform::{apply_transform, SimilarityTransform};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{filter_directive, init_with_level, level_from_verbosity};
