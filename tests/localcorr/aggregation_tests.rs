use approx::assert_abs_diff_eq;
use localcorr::engine::executor::{aggregate, NeighborhoodSum};
use localcorr::prelude::*;

fn group() -> Vec<TimeSeries<f64>> {
    vec![
        TimeSeries::new(vec![0.1, 1.7, -2.3, 4.9]),
        TimeSeries::new(vec![3.3, -0.4, 0.8, 1.1]),
        TimeSeries::new(vec![-1.9, 2.2, 5.5, 0.3]),
        TimeSeries::new(vec![0.7, 0.7, 0.7, 0.7]),
        TimeSeries::new(vec![10.0, -10.0, 1e-3, 2.5]),
    ]
}

#[test]
fn test_mean_divides_by_window_area() {
    let window = NeighborhoodWindow::new(1, 10, 10).unwrap();
    let members = group();

    let mean = aggregate(&members[..4], &window, Normalization::WindowArea)
        .unwrap()
        .unwrap();

    let mean = mean.to_vec();
    for t in 0..4 {
        let sum: f64 = members[..4].iter().map(|s| s.to_vec()[t]).sum();
        // Four contributions, but the divisor is still (2*1+1)^2 = 9.
        assert_abs_diff_eq!(mean[t], sum / 9.0, epsilon = 1e-12);
    }
}

#[test]
fn test_contribution_count_normalization() {
    let window = NeighborhoodWindow::new(1, 10, 10).unwrap();
    let members = group();

    let mean = aggregate(&members[..4], &window, Normalization::ContributionCount)
        .unwrap()
        .unwrap()
        .to_vec();

    for t in 0..4 {
        let sum: f64 = members[..4].iter().map(|s| s.to_vec()[t]).sum();
        assert_abs_diff_eq!(mean[t], sum / 4.0, epsilon = 1e-12);
    }
}

#[test]
fn test_aggregation_is_order_independent() {
    let window = NeighborhoodWindow::new(2, 10, 10).unwrap();
    let members = group();
    let forward = aggregate(&members, &window, Normalization::WindowArea)
        .unwrap()
        .unwrap()
        .to_vec();

    let permutations: [[usize; 5]; 3] = [[4, 3, 2, 1, 0], [2, 0, 4, 1, 3], [1, 4, 0, 3, 2]];
    for order in permutations {
        let permuted: Vec<&TimeSeries<f64>> = order.iter().map(|&i| &members[i]).collect();
        let mean = aggregate(permuted, &window, Normalization::WindowArea)
            .unwrap()
            .unwrap()
            .to_vec();
        for (a, b) in forward.iter().zip(&mean) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_radius_zero_mean_is_identity() {
    let window = NeighborhoodWindow::new(0, 10, 10).unwrap();
    let s = TimeSeries::new(vec![0.1, 0.2, 0.30000000000000004, 7.0]);
    let mean = aggregate([&s], &window, Normalization::WindowArea)
        .unwrap()
        .unwrap();
    assert_eq!(mean, s);
}

#[test]
fn test_empty_group() {
    let window = NeighborhoodWindow::new(1, 3, 3).unwrap();
    let empty: Vec<TimeSeries<f64>> = Vec::new();
    assert!(aggregate(&empty, &window, Normalization::WindowArea)
        .unwrap()
        .is_none());
}

#[test]
fn test_length_mismatch_is_reported() {
    let window = NeighborhoodWindow::new(1, 3, 3).unwrap();
    let members = vec![
        TimeSeries::new(vec![1.0, 2.0, 3.0]),
        TimeSeries::new(vec![1.0, 2.0]),
    ];

    match aggregate(&members, &window, Normalization::WindowArea) {
        Err(LocalCorrError::ShapeMismatch {
            expected: 3,
            found: 2,
        }) => (),
        other => panic!("Expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn test_partial_sums_merge() {
    let members = group();
    let mut left = NeighborhoodSum::seed(&members[0]);
    left.add(&members[1]).unwrap();
    let mut right = NeighborhoodSum::seed(&members[2]);
    right.add(&members[3]).unwrap();
    right.add(&members[4]).unwrap();

    left.merge(right).unwrap();
    assert_eq!(left.contributions(), 5);

    let window = NeighborhoodWindow::new(0, 1, 1).unwrap();
    let whole = aggregate(&members, &window, Normalization::WindowArea)
        .unwrap()
        .unwrap()
        .to_vec();
    for (a, b) in left.sum().to_vec().iter().zip(&whole) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
}
