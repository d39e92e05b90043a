//! JSON summary of one run.

use std::{fs, path::Path};

use mocap_align_core::SimilarityTransform;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::pipeline::PipelineOutput;

#[derive(thiserror::Error, Debug)]
pub enum ReportIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Per-marker pooled RMSE; `None` when the marker had no valid sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerRmse {
    pub marker: String,
    pub rmse: Option<f64>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub config: RunConfig,
    /// `[frames, markers]` of the markerless native array.
    pub markerless_shape: [usize; 2],
    /// `[frames, markers]` of the reference native array.
    pub reference_shape: [usize; 2],
    pub transform: SimilarityTransform,
    /// Homogeneous form of `transform`, row-major.
    pub transform_matrix: [[f64; 4]; 4],
    #[serde(default)]
    pub residual_rms: Option<f64>,
    #[serde(default)]
    pub overall_rmse: Option<f64>,
    pub marker_rmse: Vec<MarkerRmse>,
}

impl RunReport {
    pub fn new(
        cfg: &RunConfig,
        markerless_shape: (usize, usize),
        reference_shape: (usize, usize),
        output: &PipelineOutput,
    ) -> Self {
        Self {
            config: cfg.clone(),
            markerless_shape: [markerless_shape.0, markerless_shape.1],
            reference_shape: [reference_shape.0, reference_shape.1],
            transform: output.transform,
            transform_matrix: output.transform.to_array(),
            residual_rms: output.residual_rms,
            overall_rmse: finite(output.metrics.overall_rmse),
            marker_rmse: output
                .metrics
                .rmse
                .rows
                .iter()
                .map(|r| MarkerRmse {
                    marker: r.marker.clone(),
                    rmse: finite(r.rmse),
                })
                .collect(),
        }
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReportIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
