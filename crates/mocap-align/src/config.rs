//! JSON run configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use mocap_align_core::{AlignmentMode, MarkerSet, MarkerSetError};
use serde::{Deserialize, Serialize};

use crate::vocabulary::{
    to_owned_list, DEFAULT_MARKERS_TO_EXTRACT, MEDIAPIPE_BODY_MARKERS,
    QUALISYS_JOINT_CENTER_MARKERS,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("markers_to_extract is empty")]
    NothingToExtract,
    #[error("{list}: {source}")]
    Vocabulary {
        list: &'static str,
        #[source]
        source: MarkerSetError,
    },
}

fn default_freemocap_markers() -> Vec<String> {
    to_owned_list(&MEDIAPIPE_BODY_MARKERS)
}

fn default_qualisys_markers() -> Vec<String> {
    to_owned_list(&QUALISYS_JOINT_CENTER_MARKERS)
}

fn default_markers_to_extract() -> Vec<String> {
    to_owned_list(&DEFAULT_MARKERS_TO_EXTRACT)
}

fn default_representative_frame() -> usize {
    400
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Names attached to each system's rows in the output tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLabels {
    pub markerless: String,
    pub reference: String,
}

impl Default for SystemLabels {
    fn default() -> Self {
        Self {
            markerless: "freemocap".to_string(),
            reference: "qualisys".to_string(),
        }
    }
}

/// One validation run: two recordings, their vocabularies, and alignment settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Markerless (`frames × markers × 3`) array, `.npy` or `.json`.
    pub freemocap_data_path: PathBuf,
    /// Marker-based reference array, `.npy` or `.json`.
    pub qualisys_data_path: PathBuf,
    #[serde(default = "default_freemocap_markers")]
    pub freemocap_marker_list: Vec<String>,
    #[serde(default = "default_qualisys_markers")]
    pub qualisys_marker_list: Vec<String>,
    #[serde(default = "default_markers_to_extract")]
    pub markers_to_extract: Vec<String>,
    /// Frame whose points anchor the alignment; pick one with little noise
    /// or occlusion in both systems.
    #[serde(default = "default_representative_frame")]
    pub representative_frame: usize,
    /// Estimate a uniform scale factor in addition to rotation and translation.
    #[serde(default)]
    pub estimate_scale: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub system_labels: SystemLabels,
}

impl RunConfig {
    /// A config with every optional field at its default.
    pub fn new(freemocap_data_path: impl Into<PathBuf>, qualisys_data_path: impl Into<PathBuf>) -> Self {
        Self {
            freemocap_data_path: freemocap_data_path.into(),
            qualisys_data_path: qualisys_data_path.into(),
            freemocap_marker_list: default_freemocap_markers(),
            qualisys_marker_list: default_qualisys_markers(),
            markers_to_extract: default_markers_to_extract(),
            representative_frame: default_representative_frame(),
            estimate_scale: false,
            output_dir: default_output_dir(),
            system_labels: SystemLabels::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn alignment_mode(&self) -> AlignmentMode {
        if self.estimate_scale {
            AlignmentMode::Similarity
        } else {
            AlignmentMode::Rigid
        }
    }

    /// Validated native vocabularies `(markerless, reference)`.
    ///
    /// Checks uniqueness of both lists and that every marker to extract is
    /// present in both, so a bad config fails before any data is loaded.
    pub fn vocabularies(&self) -> Result<(MarkerSet, MarkerSet), ConfigError> {
        if self.markers_to_extract.is_empty() {
            return Err(ConfigError::NothingToExtract);
        }
        let markerless = MarkerSet::new(self.freemocap_marker_list.iter().cloned())
            .map_err(|source| ConfigError::Vocabulary {
                list: "freemocap_marker_list",
                source,
            })?;
        let reference = MarkerSet::new(self.qualisys_marker_list.iter().cloned())
            .map_err(|source| ConfigError::Vocabulary {
                list: "qualisys_marker_list",
                source,
            })?;
        MarkerSet::new(self.markers_to_extract.iter().cloned()).map_err(|source| {
            ConfigError::Vocabulary {
                list: "markers_to_extract",
                source,
            }
        })?;
        for (list, set) in [
            ("freemocap_marker_list", &markerless),
            ("qualisys_marker_list", &reference),
        ] {
            set.indices_of(&self.markers_to_extract)
                .map_err(|source| ConfigError::Vocabulary { list, source })?;
        }
        Ok((markerless, reference))
    }
}
