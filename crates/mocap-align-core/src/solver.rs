//! Closed-form rigid / similarity alignment between paired 3D point sets.
//!
//! Kabsch for the rotation, Umeyama for the optional uniform scale. One
//! representative frame is enough: the resulting transform is then applied
//! to the whole recording.

use log::debug;
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::trajectory::{is_missing, TrajectoryArray};
use crate::transform::SimilarityTransform;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Second covariance eigenvalue below this fraction of the first means the
/// points are collinear (or coincident).
const DEGENERACY_RATIO: f64 = 1e-12;

/// Whether the solver may estimate a uniform scale factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Rotation + translation.
    #[default]
    Rigid,
    /// Rotation + translation + uniform scale.
    Similarity,
}

/// Why the reference frame cannot anchor an alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrespondenceIssue {
    FrameOutOfRange { frames: usize },
    TooFewMarkers { count: usize },
    MissingPoint { marker_index: usize },
    Degenerate,
    SvdFailed,
}

impl std::fmt::Display for CorrespondenceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrameOutOfRange { frames } => write!(f, "frame out of range ({frames} frames)"),
            Self::TooFewMarkers { count } => write!(f, "{count} markers, at least 3 needed"),
            Self::MissingPoint { marker_index } => {
                write!(f, "marker #{marker_index} is missing (NaN)")
            }
            Self::Degenerate => write!(f, "points are collinear or coincident"),
            Self::SvdFailed => write!(f, "SVD of the cross-covariance did not converge"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    #[error("source has {source_count} markers but destination has {dest_count}")]
    MarkerCountMismatch {
        source_count: usize,
        dest_count: usize,
    },
    #[error("insufficient correspondence at frame {frame}: {reason}")]
    InsufficientCorrespondence {
        frame: usize,
        reason: CorrespondenceIssue,
    },
}

fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + p.coords);
    sum / points.len() as f64
}

/// `true` when the centred cloud spans less than a plane.
fn is_degenerate(centered: &[Vector3<f64>]) -> bool {
    let cov = centered
        .iter()
        .fold(Matrix3::zeros(), |acc: Matrix3<f64>, v| acc + v * v.transpose());
    let mut eig: Vec<f64> = cov.symmetric_eigenvalues().iter().copied().collect();
    eig.sort_by(|a, b| b.total_cmp(a));
    eig[0] <= f64::EPSILON || eig[1] <= DEGENERACY_RATIO * eig[0]
}

/// Best-fit transform mapping `source[i]` onto `dest[i]` in the least-squares sense.
///
/// Points are paired by position, so both slices must use the same marker
/// order. `frame` is only used to label errors. Fails with
/// [`AlignError::InsufficientCorrespondence`] when fewer than 3 points are
/// given, any paired point is NaN, or either cloud is collinear.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(source, dest), fields(markers = source.len()))
)]
pub fn solve_alignment(
    source: &[Point3<f64>],
    dest: &[Point3<f64>],
    mode: AlignmentMode,
    frame: usize,
) -> Result<SimilarityTransform, AlignError> {
    let insufficient = |reason| AlignError::InsufficientCorrespondence { frame, reason };

    if source.len() != dest.len() {
        return Err(AlignError::MarkerCountMismatch {
            source_count: source.len(),
            dest_count: dest.len(),
        });
    }
    if source.len() < 3 {
        return Err(insufficient(CorrespondenceIssue::TooFewMarkers {
            count: source.len(),
        }));
    }
    if let Some(marker_index) = source
        .iter()
        .zip(dest)
        .position(|(s, d)| is_missing(s) || is_missing(d))
    {
        return Err(insufficient(CorrespondenceIssue::MissingPoint { marker_index }));
    }

    let c_src = centroid(source);
    let c_dst = centroid(dest);
    let p: Vec<Vector3<f64>> = source.iter().map(|s| s.coords - c_src).collect();
    let q: Vec<Vector3<f64>> = dest.iter().map(|d| d.coords - c_dst).collect();
    if is_degenerate(&p) || is_degenerate(&q) {
        return Err(insufficient(CorrespondenceIssue::Degenerate));
    }

    // Cross-covariance H = Σ p_i q_iᵀ; with H = U Σ Vᵀ the rotation is V D Uᵀ.
    let h = p
        .iter()
        .zip(&q)
        .fold(Matrix3::zeros(), |acc: Matrix3<f64>, (pi, qi)| {
            acc + pi * qi.transpose()
        });
    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(insufficient(CorrespondenceIssue::SvdFailed));
    };
    let v = v_t.transpose();

    // Flip the axis of the smallest singular value if the fit is a reflection.
    let mut d = Vector3::new(1.0, 1.0, 1.0);
    if (v * u.transpose()).determinant() < 0.0 {
        d[svd.singular_values.imin()] = -1.0;
    }
    let rotation = v * Matrix3::from_diagonal(&d) * u.transpose();

    let scale = match mode {
        AlignmentMode::Rigid => 1.0,
        AlignmentMode::Similarity => {
            let spread: f64 = p.iter().map(|v| v.norm_squared()).sum();
            svd.singular_values.dot(&d) / spread
        }
    };
    let translation = c_dst - scale * (rotation * c_src);

    debug!(
        "solved {:?} alignment at frame {} from {} markers (scale={:.6})",
        mode,
        frame,
        source.len(),
        scale
    );
    Ok(SimilarityTransform::from_parts(rotation, translation, scale))
}

/// Solve using the points of `frame` in two already-paired trajectories.
pub fn solve_alignment_at_frame(
    source: &TrajectoryArray,
    dest: &TrajectoryArray,
    frame: usize,
    mode: AlignmentMode,
) -> Result<SimilarityTransform, AlignError> {
    let src = source
        .frame(frame)
        .map_err(|_| AlignError::InsufficientCorrespondence {
            frame,
            reason: CorrespondenceIssue::FrameOutOfRange {
                frames: source.num_frames(),
            },
        })?;
    let dst = dest
        .frame(frame)
        .map_err(|_| AlignError::InsufficientCorrespondence {
            frame,
            reason: CorrespondenceIssue::FrameOutOfRange {
                frames: dest.num_frames(),
            },
        })?;
    solve_alignment(src, dst, mode, frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn triangle() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    fn skeleton() -> Vec<Point3<f64>> {
        vec![
            Point3::new(120.0, 1400.0, 30.0),
            Point3::new(-150.0, 1390.0, 25.0),
            Point3::new(110.0, 900.0, 60.0),
            Point3::new(-105.0, 905.0, 55.0),
            Point3::new(100.0, 480.0, 90.0),
            Point3::new(-95.0, 470.0, 100.0),
            Point3::new(90.0, 60.0, 20.0),
            Point3::new(-85.0, 55.0, 180.0),
        ]
    }

    #[test]
    fn recovers_quarter_turn_about_z() {
        let src = triangle();
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let dst: Vec<Point3<f64>> = src.iter().map(|p| rot * p).collect();

        let t = solve_alignment(&src, &dst, AlignmentMode::Rigid, 0).expect("solvable");
        let expected = Matrix3::new(
            0.0, -1.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0,
        );
        assert_relative_eq!(*t.rotation(), expected, epsilon = 1e-9);
        assert_relative_eq!(*t.translation(), Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(t.scale(), 1.0);
    }

    #[test]
    fn reference_frame_round_trips() {
        let src = skeleton();
        let rot = Rotation3::from_euler_angles(0.3, -0.8, 2.1);
        let shift = Vector3::new(250.0, -40.0, 1000.0);
        let dst: Vec<Point3<f64>> = src.iter().map(|p| rot * p + shift).collect();

        let t = solve_alignment(&src, &dst, AlignmentMode::Rigid, 7).expect("solvable");
        for (s, d) in src.iter().zip(&dst) {
            assert_relative_eq!(t.apply(s), *d, epsilon = 1e-9);
        }
        assert_relative_eq!(t.rotation().determinant(), 1.0, epsilon = 1e-12);
        assert!(t.rms_residual(&src, &dst).expect("pairs") < 1e-9);
    }

    #[test]
    fn similarity_mode_recovers_scale() {
        let src = skeleton();
        let rot = Rotation3::from_euler_angles(-0.2, 0.1, 0.9);
        let shift = Vector3::new(-12.0, 8.0, 3.0);
        let dst: Vec<Point3<f64>> = src
            .iter()
            .map(|p| Point3::from(0.001 * (rot * p.coords) + shift))
            .collect();

        let t = solve_alignment(&src, &dst, AlignmentMode::Similarity, 0).expect("solvable");
        assert_relative_eq!(t.scale(), 0.001, epsilon = 1e-12);
        for (s, d) in src.iter().zip(&dst) {
            assert_relative_eq!(t.apply(s), *d, epsilon = 1e-7);
        }

        let rigid = solve_alignment(&src, &dst, AlignmentMode::Rigid, 0).expect("solvable");
        assert_relative_eq!(rigid.scale(), 1.0);
    }

    #[test]
    fn mirrored_destination_still_yields_proper_rotation() {
        let src = skeleton();
        let dst: Vec<Point3<f64>> = src.iter().map(|p| Point3::new(-p.x, p.y, p.z)).collect();
        let t = solve_alignment(&src, &dst, AlignmentMode::Rigid, 0).expect("solvable");
        assert_relative_eq!(t.rotation().determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn fewer_than_three_markers_fail() {
        let src = &triangle()[..2];
        let err = solve_alignment(src, src, AlignmentMode::Rigid, 4).unwrap_err();
        assert_eq!(
            err,
            AlignError::InsufficientCorrespondence {
                frame: 4,
                reason: CorrespondenceIssue::TooFewMarkers { count: 2 }
            }
        );
    }

    #[test]
    fn nan_point_fails_with_marker_index() {
        let src = skeleton();
        let mut dst = src.clone();
        dst[5] = crate::missing_point();
        let err = solve_alignment(&src, &dst, AlignmentMode::Rigid, 400).unwrap_err();
        assert_eq!(
            err,
            AlignError::InsufficientCorrespondence {
                frame: 400,
                reason: CorrespondenceIssue::MissingPoint { marker_index: 5 }
            }
        );
    }

    #[test]
    fn collinear_points_fail() {
        let src: Vec<Point3<f64>> = (0..5).map(|i| Point3::new(i as f64, 2.0 * i as f64, 0.0)).collect();
        let err = solve_alignment(&src, &src, AlignmentMode::Rigid, 0).unwrap_err();
        assert!(matches!(
            err,
            AlignError::InsufficientCorrespondence {
                reason: CorrespondenceIssue::Degenerate,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_counts_fail() {
        let src = skeleton();
        let err = solve_alignment(&src, &src[..4], AlignmentMode::Rigid, 0).unwrap_err();
        assert_eq!(
            err,
            AlignError::MarkerCountMismatch {
                source_count: 8,
                dest_count: 4
            }
        );
    }

    #[test]
    fn frame_out_of_range_is_insufficient() {
        let rows = vec![triangle().iter().map(|p| [p.x, p.y, p.z]).collect::<Vec<_>>()];
        let arr = TrajectoryArray::from_frames(&rows).expect("shape");
        let err = solve_alignment_at_frame(&arr, &arr, 3, AlignmentMode::Rigid).unwrap_err();
        assert_eq!(
            err,
            AlignError::InsufficientCorrespondence {
                frame: 3,
                reason: CorrespondenceIssue::FrameOutOfRange { frames: 1 }
            }
        );
        assert!(solve_alignment_at_frame(&arr, &arr, 0, AlignmentMode::Rigid).is_ok());
    }
}
