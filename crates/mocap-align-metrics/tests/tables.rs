use approx::assert_relative_eq;
use mocap_align_core::{MarkerSet, TrajectoryArray};
use mocap_align_metrics::{
    combine_tables, compute_error_metrics, estimate_velocity, CombineError, LongFormTable,
};

fn walk(frames: usize, offset: [f64; 3]) -> TrajectoryArray {
    let rows: Vec<Vec<[f64; 3]>> = (0..frames)
        .map(|f| {
            let x = f as f64 * 10.0;
            vec![
                [x + offset[0], 900.0 + offset[1], 100.0 + offset[2]],
                [x + offset[0], 500.0 + offset[1], 90.0 + offset[2]],
            ]
        })
        .collect();
    TrajectoryArray::from_frames(&rows).expect("shape")
}

fn table(arr: &TrajectoryArray, system: &str) -> LongFormTable {
    let set = MarkerSet::new(["left_knee", "left_ankle"]).expect("unique");
    estimate_velocity(&LongFormTable::from_array(arr, &set).expect("table").with_system(system))
}

#[test]
fn constant_offset_gives_constant_error_and_equal_velocity() {
    let a = table(&walk(6, [0.0, 0.0, 0.0]), "freemocap");
    let b = table(&walk(6, [3.0, 0.0, 4.0]), "qualisys");
    let combined = combine_tables(&a, &b).expect("same keys");
    assert_eq!(combined.len(), 12);

    let rec = combined.get("left_ankle", 2).expect("row");
    assert_eq!(rec.a.velocity, rec.b.velocity);
    assert_relative_eq!(rec.a.velocity.expect("estimated").x, 10.0);

    let metrics = compute_error_metrics(&combined);
    for row in &metrics.absolute_error.rows {
        assert_eq!(row.axes(), [3.0, 0.0, 4.0]);
    }
    // sqrt((9 + 0 + 16) / 3)
    let expected = (25.0_f64 / 3.0).sqrt();
    assert_relative_eq!(metrics.rmse.get("left_knee").expect("marker"), expected, epsilon = 1e-12);
    assert_relative_eq!(metrics.overall_rmse, expected, epsilon = 1e-12);
    let axis = metrics.axis_rmse.get("left_ankle").expect("marker");
    assert_relative_eq!(axis.x_rmse, 3.0);
    assert_relative_eq!(axis.z_rmse, 4.0);
}

#[test]
fn shorter_reference_recording_is_rejected() {
    let a = table(&walk(6, [0.0; 3]), "freemocap");
    let b = table(&walk(5, [0.0; 3]), "qualisys");
    assert_eq!(
        combine_tables(&a, &b).unwrap_err(),
        CombineError::KeySetMismatch {
            marker: "left_knee".to_string(),
            frame: 5,
            missing_from: "qualisys".to_string(),
        }
    );
}
