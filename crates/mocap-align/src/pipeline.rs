//! End-to-end alignment and error evaluation.
//!
//! raw arrays → extract (both systems) → solve at the representative frame →
//! transform the full markerless array → re-extract → velocity →
//! combine → error metrics.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use mocap_align_core::{
    apply_transform, solve_alignment_at_frame, AlignError, AlignmentMode, MarkerSet,
    SimilarityTransform, TrajectoryArray,
};
use mocap_align_metrics::{
    combine_tables, compute_error_metrics, estimate_velocity, CombineError, CombinedTable,
    ErrorMetrics, TableIoError,
};

use crate::config::{ConfigError, RunConfig, SystemLabels};
use crate::extract::{extract, ExtractError};
use crate::load::{load_trajectory, save_npy, LoadError};
use crate::report::RunReport;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Combine(#[from] CombineError),
    #[error("failed to write {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: TableIoError,
    },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Alignment settings independent of where the arrays came from.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineParams {
    pub markers_to_extract: Vec<String>,
    pub representative_frame: usize,
    pub mode: AlignmentMode,
    pub labels: SystemLabels,
}

impl PipelineParams {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            markers_to_extract: cfg.markers_to_extract.clone(),
            representative_frame: cfg.representative_frame,
            mode: cfg.alignment_mode(),
            labels: cfg.system_labels.clone(),
        }
    }
}

/// One system's native array and the vocabulary of its marker axis.
#[derive(Clone, Copy, Debug)]
pub struct SystemInput<'a> {
    pub trajectory: &'a TrajectoryArray,
    pub markers: &'a MarkerSet,
}

/// Everything one run produces.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub transform: SimilarityTransform,
    /// RMS point distance at the representative frame after alignment.
    pub residual_rms: Option<f64>,
    /// Full markerless array (all native markers) in the reference frame.
    pub aligned: TrajectoryArray,
    pub combined: CombinedTable,
    pub metrics: ErrorMetrics,
}

/// Align `markerless` onto `reference` and measure the remaining error.
///
/// Pure over its inputs: nothing is read from or written to disk.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(frame = params.representative_frame))
)]
pub fn run_pipeline(
    markerless: SystemInput<'_>,
    reference: SystemInput<'_>,
    params: &PipelineParams,
) -> Result<PipelineOutput, PipelineError> {
    let wanted = &params.markers_to_extract;
    let fm = extract(markerless.trajectory, markerless.markers, wanted)?;
    let qs = extract(reference.trajectory, reference.markers, wanted)?;
    info!(
        "extracted {} markers: {} frames ({}) vs {} frames ({})",
        wanted.len(),
        fm.array.num_frames(),
        params.labels.markerless,
        qs.array.num_frames(),
        params.labels.reference
    );

    let frame = params.representative_frame;
    let transform = solve_alignment_at_frame(&fm.array, &qs.array, frame, params.mode)?;
    let residual_rms = match (fm.array.frame(frame), qs.array.frame(frame)) {
        (Ok(src), Ok(dst)) => transform.rms_residual(src, dst),
        _ => None,
    };
    info!(
        "aligned at frame {frame}: translation={:?} scale={:.6} residual_rms={:?}",
        transform.translation().as_slice(),
        transform.scale(),
        residual_rms
    );

    let aligned = apply_transform(&transform, markerless.trajectory);
    let fm_aligned = extract(&aligned, markerless.markers, wanted)?;

    let table_a = estimate_velocity(&fm_aligned.table.with_system(&params.labels.markerless));
    let table_b = estimate_velocity(&qs.table.with_system(&params.labels.reference));
    let combined = combine_tables(&table_a, &table_b)?;
    let metrics = compute_error_metrics(&combined);

    for row in &metrics.rmse.rows {
        if row.rmse.is_nan() {
            warn!("marker `{}` has no valid samples", row.marker);
        } else {
            info!("rmse {:>18}: {:.3}", row.marker, row.rmse);
        }
    }
    info!("overall rmse: {:.3}", metrics.overall_rmse);

    Ok(PipelineOutput {
        transform,
        residual_rms,
        aligned,
        combined,
        metrics,
    })
}

/// File names written into the output directory.
pub mod outputs {
    pub const ABSOLUTE_ERROR_CSV: &str = "absolute_error_dataframe.csv";
    pub const RMSE_CSV: &str = "rmse_dataframe.csv";
    pub const AXIS_RMSE_CSV: &str = "rmse_per_axis_dataframe.csv";
    pub const COMBINED_CSV: &str = "combined_dataframe.csv";
    pub const ALIGNED_NPY: &str = "aligned_freemocap_3d_xyz.npy";
    pub const REPORT_JSON: &str = "alignment_report.json";
}

fn table_err(path: &Path) -> impl FnOnce(TableIoError) -> PipelineError + '_ {
    move |source| PipelineError::Table {
        path: path.to_path_buf(),
        source,
    }
}

/// Write every table of `output` into `dir`.
pub fn write_outputs(
    dir: &Path,
    output: &PipelineOutput,
    report: &RunReport,
) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(outputs::ABSOLUTE_ERROR_CSV);
    output
        .metrics
        .absolute_error
        .write_csv(&path)
        .map_err(table_err(&path))?;
    let path = dir.join(outputs::RMSE_CSV);
    output.metrics.rmse.write_csv(&path).map_err(table_err(&path))?;
    let path = dir.join(outputs::AXIS_RMSE_CSV);
    output
        .metrics
        .axis_rmse
        .write_csv(&path)
        .map_err(table_err(&path))?;
    let path = dir.join(outputs::COMBINED_CSV);
    output.combined.write_csv(&path).map_err(table_err(&path))?;

    save_npy(dir.join(outputs::ALIGNED_NPY), &output.aligned)?;

    let path = dir.join(outputs::REPORT_JSON);
    report.write_json(&path).map_err(|source| match source {
        crate::report::ReportIoError::Io(source) => PipelineError::Io {
            path: path.clone(),
            source,
        },
        crate::report::ReportIoError::Json(source) => PipelineError::Report {
            path: path.clone(),
            source,
        },
    })?;

    info!("wrote outputs to {}", dir.display());
    Ok(())
}

/// Load both recordings named in `cfg`, run the pipeline and write outputs.
pub fn run_from_config(cfg: &RunConfig) -> Result<RunReport, PipelineError> {
    let (markerless_set, reference_set) = cfg.vocabularies()?;
    let markerless = load_trajectory(&cfg.freemocap_data_path)?;
    let reference = load_trajectory(&cfg.qualisys_data_path)?;
    info!(
        "loaded {} {:?} and {} {:?}",
        cfg.freemocap_data_path.display(),
        markerless.shape(),
        cfg.qualisys_data_path.display(),
        reference.shape()
    );

    let params = PipelineParams::from_config(cfg);
    let output = run_pipeline(
        SystemInput {
            trajectory: &markerless,
            markers: &markerless_set,
        },
        SystemInput {
            trajectory: &reference,
            markers: &reference_set,
        },
        &params,
    )?;

    let report = RunReport::new(cfg, markerless.shape(), reference.shape(), &output);
    write_outputs(&cfg.output_dir, &output, &report)?;
    Ok(report)
}
