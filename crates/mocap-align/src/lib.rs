//! Spatial alignment and tracking-error evaluation for motion-capture validation.
//!
//! A markerless recording (e.g. FreeMoCap / MediaPipe) is aligned onto a
//! marker-based reference (e.g. Qualisys joint centres) with one closed-form
//! rigid or similarity transform solved at a representative frame. The error
//! between the two systems is then reported per marker and frame.
//!
//! This crate provides:
//! - re-exports of the geometric core and the table/metrics layer,
//! - [`extract`] for slicing named markers into an array and a long-form table,
//! - `.npy` / `.json` trajectory loading,
//! - [`RunConfig`] and the end-to-end [`run_pipeline`] / [`run_from_config`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use mocap_align::{run_from_config, RunConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = RunConfig::load_json("run.json")?;
//! let report = run_from_config(&cfg)?;
//! println!("overall rmse: {:?}", report.overall_rmse);
//! # Ok(())
//! # }
//! ```

pub use mocap_align_core as core;
pub use mocap_align_metrics as metrics;

pub use mocap_align_core::{
    apply_transform, solve_alignment, AlignError, AlignmentMode, MarkerSet, MarkerSetError,
    SimilarityTransform, TrajectoryArray,
};
pub use mocap_align_metrics::{CombineError, CombinedTable, ErrorMetrics, LongFormTable};

mod config;
mod extract;
mod load;
mod pipeline;
mod report;
pub mod vocabulary;

pub use config::{ConfigError, ConfigIoError, RunConfig, SystemLabels};
pub use extract::{extract, extract_from_path, ExtractError, ExtractedMarkers};
pub use load::{load_trajectory, save_npy, LoadError};
pub use pipeline::{
    outputs, run_from_config, run_pipeline, write_outputs, PipelineError, PipelineOutput,
    PipelineParams, SystemInput,
};
pub use report::{MarkerRmse, ReportIoError, RunReport};
