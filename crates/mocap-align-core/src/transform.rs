use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::trajectory::{is_missing, TrajectoryArray};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Similarity transform `p' = scale * R * p + t`.
///
/// With `scale == 1` this is a rigid transform. Values are produced by
/// [`solve_alignment`](crate::solve_alignment) and never change afterwards;
/// the fields are private so a transform cannot be edited in place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
    scale: f64,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
            scale: 1.0,
        }
    }

    /// Assemble a transform from its parts. `rotation` is taken as given.
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>, scale: f64) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    #[inline]
    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    #[inline]
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.scale * (self.rotation * p.coords) + self.translation)
    }

    /// Homogeneous 4×4 form `[sR t; 0 1]`.
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.rotation * self.scale));
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn to_array(&self) -> [[f64; 4]; 4] {
        let m = self.to_homogeneous();
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = m[(r, c)];
            }
        }
        out
    }

    /// RMS distance between `apply(src[i])` and `dst[i]` over pairs where
    /// both points are present. `None` when no pair is usable.
    pub fn rms_residual(&self, src: &[Point3<f64>], dst: &[Point3<f64>]) -> Option<f64> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for (s, d) in src.iter().zip(dst) {
            if is_missing(s) || is_missing(d) {
                continue;
            }
            sum += (self.apply(s) - d).norm_squared();
            n += 1;
        }
        (n > 0).then(|| (sum / n as f64).sqrt())
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Apply `transform` to every point of every frame.
///
/// Shape is preserved and NaN points stay NaN. The input is not modified.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(frames = trajectory.num_frames(), markers = trajectory.num_markers()))
)]
pub fn apply_transform(
    transform: &SimilarityTransform,
    trajectory: &TrajectoryArray,
) -> TrajectoryArray {
    trajectory.map_points(|p| transform.apply(p))
}
