use localcorr::math::neighborhood::{clamp, expand};
use localcorr::prelude::*;

fn series(values: &[f64]) -> TimeSeries<f64> {
    TimeSeries::new(values.to_vec())
}

#[test]
fn test_expand_produces_window_area_pairs() {
    let s = series(&[1.0, 2.0, 3.0]);
    let c = Coordinate::new(5, 5, 1);

    for radius in 0..=3 {
        let window = NeighborhoodWindow::new(radius, 10, 10).unwrap();
        let pairs = expand(c, &s, &window);
        let side = 2 * radius + 1;
        assert_eq!(pairs.len(), side * side);
        assert_eq!(pairs.len(), window.area());

        // Offsets run dx outer, dy inner, so (0, 0) sits in the middle.
        let identity = radius * side + radius;
        assert_eq!(pairs[identity].0, c);
    }
}

#[test]
fn test_expand_keeps_series_unmodified() {
    let s = series(&[0.25, -1.0, 4.5, 8.0]);
    let window = NeighborhoodWindow::new(2, 6, 6).unwrap();

    for (_, contributed) in expand(Coordinate::new(1, 6, 3), &s, &window) {
        assert_eq!(contributed, s);
    }
}

#[test]
fn test_expand_offset_order() {
    let window = NeighborhoodWindow::new(1, 10, 10).unwrap();
    let targets: Vec<Coordinate> = window.targets(Coordinate::new(5, 5, 0)).collect();

    assert_eq!(targets[0], Coordinate::new(4, 4, 0));
    assert_eq!(targets[1], Coordinate::new(4, 5, 0));
    assert_eq!(targets[2], Coordinate::new(4, 6, 0));
    assert_eq!(targets[3], Coordinate::new(5, 4, 0));
    assert_eq!(targets[8], Coordinate::new(6, 6, 0));
}

#[test]
fn test_corner_clamping_saturates() {
    let window = NeighborhoodWindow::new(2, 5, 5).unwrap();
    let corner = Coordinate::new(1, 1, 7);
    let pairs = expand(corner, &series(&[1.0]), &window);

    assert_eq!(pairs.len(), 25);
    for (target, _) in &pairs {
        assert!((1..=5).contains(&target.x), "x out of range: {target}");
        assert!((1..=5).contains(&target.y), "y out of range: {target}");
        assert_eq!(target.z, 7);
    }

    // dx in {-2, -1, 0} and dy in {-2, -1, 0} all land on the corner itself.
    let on_corner = pairs.iter().filter(|(t, _)| *t == corner).count();
    assert_eq!(on_corner, 9);
}

#[test]
fn test_edge_clamping_on_single_axis() {
    let window = NeighborhoodWindow::new(1, 4, 4).unwrap();
    let edge = Coordinate::new(4, 2, 1);
    let targets: Vec<Coordinate> = window.targets(edge).collect();

    // x + 1 clamps back to 4, so the x = 4 column is hit twice per dy.
    let on_max_column = targets.iter().filter(|t| t.x == 4).count();
    assert_eq!(on_max_column, 6);
    assert!(targets.iter().all(|t| t.x <= 4 && t.y <= 4));
}

#[test]
fn test_out_of_bounds_origin_is_clamped() {
    let window = NeighborhoodWindow::new(0, 5, 5).unwrap();
    let targets: Vec<Coordinate> = window.targets(Coordinate::new(20, -3, 2)).collect();
    assert_eq!(targets, vec![Coordinate::new(5, 1, 2)]);
}

#[test]
fn test_z_is_never_clamped() {
    let window = NeighborhoodWindow::new(1, 3, 3).unwrap();
    for target in window.targets(Coordinate::new(2, 2, 1_000)) {
        assert_eq!(target.z, 1_000);
    }
}

#[test]
fn test_clamp() {
    assert_eq!(clamp(0, 1, 5), 1);
    assert_eq!(clamp(1, 1, 5), 1);
    assert_eq!(clamp(3, 1, 5), 3);
    assert_eq!(clamp(9, 1, 5), 5);
    assert_eq!(clamp(clamp(9, 1, 5), 1, 5), 5);
}

#[test]
fn test_window_validation() {
    match NeighborhoodWindow::new(1, 0, 5) {
        Err(LocalCorrError::InvalidBounds { axis: "x", value: 0 }) => (),
        other => panic!("Expected InvalidBounds on x, got {other:?}"),
    }
    match NeighborhoodWindow::new(1, 5, -2) {
        Err(LocalCorrError::InvalidBounds { axis: "y", value: -2 }) => (),
        other => panic!("Expected InvalidBounds on y, got {other:?}"),
    }
    assert!(matches!(
        NeighborhoodWindow::new(usize::MAX, 5, 5),
        Err(LocalCorrError::RadiusTooLarge(_))
    ));
}
