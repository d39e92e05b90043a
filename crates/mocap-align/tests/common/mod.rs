#![allow(dead_code)]

use mocap_align::vocabulary::{MEDIAPIPE_BODY_MARKERS, QUALISYS_JOINT_CENTER_MARKERS};
use mocap_align::{MarkerSet, TrajectoryArray};
use nalgebra::{Point3, Rotation3, Vector3};

pub const FRAMES: usize = 40;
pub const REPRESENTATIVE_FRAME: usize = 12;

/// Synthetic reference joint centre: markers spread over a body-sized box,
/// swaying slowly over time.
pub fn reference_point(marker: usize, frame: usize) -> Point3<f64> {
    let t = frame as f64 * 0.05;
    Point3::new(
        60.0 * marker as f64 + 20.0 * t.sin(),
        1000.0 + 80.0 * (marker % 5) as f64 + 10.0 * t.cos(),
        40.0 * (marker / 5) as f64 + 5.0 * t,
    )
}

/// Ground-truth transform from markerless coordinates into the reference frame.
pub fn ground_truth() -> (Rotation3<f64>, Vector3<f64>) {
    (
        Rotation3::from_euler_angles(0.4, -0.25, 1.3),
        Vector3::new(350.0, -120.0, 900.0),
    )
}

pub fn reference_array() -> TrajectoryArray {
    reference_array_with_frames(FRAMES)
}

pub fn reference_array_with_frames(frames: usize) -> TrajectoryArray {
    let rows: Vec<Vec<[f64; 3]>> = (0..frames)
        .map(|f| {
            (0..QUALISYS_JOINT_CENTER_MARKERS.len())
                .map(|m| {
                    let p = reference_point(m, f);
                    [p.x, p.y, p.z]
                })
                .collect()
        })
        .collect();
    TrajectoryArray::from_frames(&rows).expect("shape")
}

/// Markerless array whose shared markers map exactly onto the reference
/// under `scale * R * p + t`. Markers the reference lacks get filler values.
pub fn markerless_array(scale: f64) -> TrajectoryArray {
    let (rot, shift) = ground_truth();
    let inv = rot.inverse();
    let rows: Vec<Vec<[f64; 3]>> = (0..FRAMES)
        .map(|f| {
            MEDIAPIPE_BODY_MARKERS
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    match QUALISYS_JOINT_CENTER_MARKERS.iter().position(|q| q == name) {
                        Some(m) => {
                            let p = reference_point(m, f);
                            let local = inv * (p.coords - shift) / scale;
                            [local.x, local.y, local.z]
                        }
                        None => [i as f64, 2.0 * i as f64, f as f64],
                    }
                })
                .collect()
        })
        .collect();
    TrajectoryArray::from_frames(&rows).expect("shape")
}

pub fn markerless_set() -> MarkerSet {
    MarkerSet::new(MEDIAPIPE_BODY_MARKERS).expect("unique")
}

pub fn reference_set() -> MarkerSet {
    MarkerSet::new(QUALISYS_JOINT_CENTER_MARKERS).expect("unique")
}

/// Copy of `array` with `f` applied to one marker at the given frames.
pub fn perturb(
    array: &TrajectoryArray,
    marker: usize,
    frames: impl Fn(usize) -> bool,
    f: impl Fn(Point3<f64>) -> Point3<f64>,
) -> TrajectoryArray {
    let (n_frames, n_markers) = array.shape();
    let mut points = array.points().to_vec();
    for frame in (0..n_frames).filter(|&fr| frames(fr)) {
        let idx = frame * n_markers + marker;
        points[idx] = f(points[idx]);
    }
    TrajectoryArray::new(n_frames, n_markers, points).expect("shape")
}

pub fn mediapipe_index(name: &str) -> usize {
    MEDIAPIPE_BODY_MARKERS
        .iter()
        .position(|m| *m == name)
        .expect("mediapipe marker")
}
