use nalgebra::Point3;

/// Errors raised while building or indexing a [`TrajectoryArray`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrajectoryError {
    #[error("point buffer has {got} entries, expected {expected} ({frames} frames x {markers} markers)")]
    ShapeMismatch {
        frames: usize,
        markers: usize,
        expected: usize,
        got: usize,
    },
    #[error("frame {frame} has {got} markers, expected {expected}")]
    RaggedFrame {
        frame: usize,
        expected: usize,
        got: usize,
    },
    #[error("array has {array_markers} markers but the vocabulary lists {vocabulary}")]
    VocabularyMismatch {
        array_markers: usize,
        vocabulary: usize,
    },
    #[error("frame {frame} is out of range (trajectory has {frames} frames)")]
    FrameOutOfRange { frame: usize, frames: usize },
}

/// The NaN point used to mark a marker that was not tracked at a frame.
#[inline]
pub fn missing_point() -> Point3<f64> {
    Point3::new(f64::NAN, f64::NAN, f64::NAN)
}

/// `true` if any coordinate of `p` is NaN or infinite.
#[inline]
pub fn is_missing(p: &Point3<f64>) -> bool {
    !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
}

/// Fixed-shape `frames × markers × xyz` trajectory.
///
/// Points are stored frame-major: all markers of frame 0, then frame 1, and
/// so on. The marker axis carries no names; pair it with a
/// [`MarkerSet`](crate::MarkerSet) to know which column is which.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryArray {
    frames: usize,
    markers: usize,
    points: Vec<Point3<f64>>,
}

impl TrajectoryArray {
    /// Wrap a frame-major point buffer.
    pub fn new(
        frames: usize,
        markers: usize,
        points: Vec<Point3<f64>>,
    ) -> Result<Self, TrajectoryError> {
        let expected = frames * markers;
        if points.len() != expected {
            return Err(TrajectoryError::ShapeMismatch {
                frames,
                markers,
                expected,
                got: points.len(),
            });
        }
        Ok(Self {
            frames,
            markers,
            points,
        })
    }

    /// Build from a flat row-major `f64` buffer of length `frames * markers * 3`.
    pub fn from_flat(frames: usize, markers: usize, data: &[f64]) -> Result<Self, TrajectoryError> {
        let expected = frames * markers * 3;
        if data.len() != expected {
            return Err(TrajectoryError::ShapeMismatch {
                frames,
                markers,
                expected: frames * markers,
                got: data.len() / 3,
            });
        }
        let points = data
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Self::new(frames, markers, points)
    }

    /// Build from nested per-frame rows. Every frame must have the same marker count.
    pub fn from_frames(rows: &[Vec<[f64; 3]>]) -> Result<Self, TrajectoryError> {
        let markers = rows.first().map_or(0, Vec::len);
        let mut points = Vec::with_capacity(rows.len() * markers);
        for (frame, row) in rows.iter().enumerate() {
            if row.len() != markers {
                return Err(TrajectoryError::RaggedFrame {
                    frame,
                    expected: markers,
                    got: row.len(),
                });
            }
            points.extend(row.iter().map(|&[x, y, z]| Point3::new(x, y, z)));
        }
        Self::new(rows.len(), markers, points)
    }

    /// `(frames, markers)`; the trailing xyz axis is implicit.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.frames, self.markers)
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn num_markers(&self) -> usize {
        self.markers
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// All marker positions at `frame`, in marker-axis order.
    pub fn frame(&self, frame: usize) -> Result<&[Point3<f64>], TrajectoryError> {
        if frame >= self.frames {
            return Err(TrajectoryError::FrameOutOfRange {
                frame,
                frames: self.frames,
            });
        }
        let start = frame * self.markers;
        Ok(&self.points[start..start + self.markers])
    }

    /// Iterate frames in order.
    pub fn iter_frames(&self) -> impl Iterator<Item = &[Point3<f64>]> + '_ {
        // `chunks_exact(0)` panics; an empty marker axis has no points anyway.
        self.points.chunks_exact(self.markers.max(1))
    }

    /// Position of `marker` at `frame`, or `None` when out of bounds.
    #[inline]
    pub fn point(&self, frame: usize, marker: usize) -> Option<Point3<f64>> {
        if frame >= self.frames || marker >= self.markers {
            return None;
        }
        Some(self.points[frame * self.markers + marker])
    }

    /// New array of the same shape with `f` applied to every point.
    pub fn map_points<F>(&self, f: F) -> Self
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        Self {
            frames: self.frames,
            markers: self.markers,
            points: self.points.iter().map(f).collect(),
        }
    }

    /// New array keeping only the given marker columns, in the given order.
    ///
    /// Indices must be `< num_markers()`; callers validate them by name first.
    pub(crate) fn select_markers(&self, indices: &[usize]) -> Self {
        let mut points = Vec::with_capacity(self.frames * indices.len());
        for frame in self.iter_frames() {
            points.extend(indices.iter().map(|&i| frame[i]));
        }
        Self {
            frames: self.frames,
            markers: indices.len(),
            points,
        }
    }

    /// Number of NaN points.
    pub fn count_missing(&self) -> usize {
        self.points.iter().filter(|p| is_missing(p)).count()
    }
}
