//! Named marker vocabularies and subset extraction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::trajectory::{TrajectoryArray, TrajectoryError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerSetError {
    #[error("marker `{marker}` appears more than once in the vocabulary")]
    DuplicateMarker { marker: String },
    #[error("marker `{marker}` not found in vocabulary of {vocabulary_len} markers")]
    MarkerNotFound {
        marker: String,
        vocabulary_len: usize,
    },
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

/// Ordered list of marker names defining the marker axis of an array.
///
/// The name → index map is built once at construction, so lookups by name
/// are validated up front instead of surfacing later as index errors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct MarkerSet {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl MarkerSet {
    pub fn new<I, S>(names: I) -> Result<Self, MarkerSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(MarkerSetError::DuplicateMarker {
                    marker: name.clone(),
                });
            }
        }
        Ok(Self { names, index })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` on the marker axis.
    pub fn index_of(&self, name: &str) -> Result<usize, MarkerSetError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| MarkerSetError::MarkerNotFound {
                marker: name.to_owned(),
                vocabulary_len: self.names.len(),
            })
    }

    /// Resolve a requested subset to indices, preserving the requested order.
    pub fn indices_of<S: AsRef<str>>(&self, wanted: &[S]) -> Result<Vec<usize>, MarkerSetError> {
        wanted.iter().map(|s| self.index_of(s.as_ref())).collect()
    }
}

impl PartialEq for MarkerSet {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl TryFrom<Vec<String>> for MarkerSet {
    type Error = MarkerSetError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<MarkerSet> for Vec<String> {
    fn from(set: MarkerSet) -> Self {
        set.names
    }
}

/// Slice a named subset of markers out of a native array.
///
/// The returned array uses `wanted`'s order for its marker axis, so two
/// systems extracted with the same `wanted` list are paired column by column.
/// Fails with [`MarkerSetError::MarkerNotFound`] on the first requested name
/// missing from `native`.
pub fn extract_markers<S: AsRef<str>>(
    array: &TrajectoryArray,
    native: &MarkerSet,
    wanted: &[S],
) -> Result<(TrajectoryArray, MarkerSet), MarkerSetError> {
    if array.num_markers() != native.len() {
        return Err(TrajectoryError::VocabularyMismatch {
            array_markers: array.num_markers(),
            vocabulary: native.len(),
        }
        .into());
    }
    let indices = native.indices_of(wanted)?;
    let subset = MarkerSet::new(wanted.iter().map(|s| s.as_ref().to_owned()))?;
    Ok((array.select_markers(&indices), subset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn native() -> MarkerSet {
        MarkerSet::new(["head", "left_knee", "right_knee", "left_ankle"]).expect("unique")
    }

    fn array() -> TrajectoryArray {
        let rows: Vec<Vec<[f64; 3]>> = (0..3)
            .map(|f| {
                (0..4)
                    .map(|m| [f as f64, m as f64, 0.0])
                    .collect::<Vec<_>>()
            })
            .collect();
        TrajectoryArray::from_frames(&rows).expect("shape")
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = MarkerSet::new(["a", "b", "a"]).unwrap_err();
        assert_eq!(
            err,
            MarkerSetError::DuplicateMarker {
                marker: "a".to_string()
            }
        );
    }

    #[test]
    fn extraction_follows_requested_order() {
        let (sub, set) =
            extract_markers(&array(), &native(), &["left_ankle", "left_knee"]).expect("extract");
        assert_eq!(sub.shape(), (3, 2));
        assert_eq!(set.names(), &["left_ankle", "left_knee"]);
        assert_eq!(sub.point(2, 0), Some(Point3::new(2.0, 3.0, 0.0)));
        assert_eq!(sub.point(2, 1), Some(Point3::new(2.0, 1.0, 0.0)));
    }

    #[test]
    fn unknown_marker_fails_by_name() {
        let err = extract_markers(&array(), &native(), &["left_knee", "nose"]).unwrap_err();
        assert_eq!(
            err,
            MarkerSetError::MarkerNotFound {
                marker: "nose".to_string(),
                vocabulary_len: 4
            }
        );
    }

    #[test]
    fn vocabulary_must_match_marker_axis() {
        let short = MarkerSet::new(["head"]).expect("unique");
        let err = extract_markers(&array(), &short, &["head"]).unwrap_err();
        assert_eq!(
            err,
            MarkerSetError::Trajectory(TrajectoryError::VocabularyMismatch {
                array_markers: 4,
                vocabulary: 1
            })
        );
    }

    #[test]
    fn errors_are_totally_comparable() {
        fn assert_eq_impl<T: Eq>() {}
        assert_eq_impl::<TrajectoryError>();
        assert_eq_impl::<MarkerSetError>();
        let wrapped: MarkerSetError = TrajectoryError::FrameOutOfRange {
            frame: 3,
            frames: 2,
        }
        .into();
        assert_ne!(
            wrapped,
            MarkerSetError::MarkerNotFound {
                marker: "head".to_string(),
                vocabulary_len: 4
            }
        );
    }

    #[test]
    fn extraction_does_not_touch_input() {
        let arr = array();
        let before = arr.clone();
        let _ = extract_markers(&arr, &native(), &["head"]).expect("extract");
        assert_eq!(arr, before);
    }

    #[test]
    fn serde_round_trips_as_name_list() {
        let json = serde_json::to_string(&native()).expect("serialize");
        assert_eq!(json, r#"["head","left_knee","right_knee","left_ankle"]"#);
        let back: MarkerSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, native());
        assert!(serde_json::from_str::<MarkerSet>(r#"["a","a"]"#).is_err());
    }
}
