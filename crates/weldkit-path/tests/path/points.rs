//! Tests for weld point generation

use weldkit_core::{GeometryError, Point};
use weldkit_path::{assemble_contours, bounds, generate_points, translate, Segment, VertexChain};

#[test]
fn test_pitch_coverage_on_single_edge() {
    let chain = VertexChain::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 9.7)], false).unwrap();
    let points = generate_points(&[chain], 1.5).unwrap();
    // floor(9.7 / 1.5) = 6 interior stations plus the start vertex
    assert_eq!(points.len(), 7);
    for pair in points.windows(2) {
        assert!((pair[0].distance_to(&pair[1]) - 1.5).abs() < 1e-9);
    }
}

#[test]
fn test_empty_chain_list() {
    assert_eq!(generate_points(&[], 2.0), Ok(vec![]));
}

#[test]
fn test_invalid_pitch_is_rejected_before_walking() {
    assert_eq!(
        generate_points(&[], -0.5),
        Err(GeometryError::InvalidPitch { pitch: -0.5 })
    );
}

#[test]
fn test_assembled_rectangle_perimeter() {
    let segments = vec![
        Segment::from(((0.0, 0.0), (20.0, 0.0))),
        Segment::from(((20.0, 0.0), (20.0, 10.0))),
        Segment::from(((20.0, 10.0), (0.0, 10.0))),
        Segment::from(((0.0, 10.0), (0.0, 0.0))),
    ];
    let chains = assemble_contours(&segments, 1e-4);
    let points = generate_points(&chains, 2.0).unwrap();
    // Perimeter 60: stations 0, 2, ..., 58 including the corners
    assert_eq!(points.len(), 30);

    let b = bounds(&points).unwrap();
    assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (0.0, 0.0, 20.0, 10.0));
}

#[test]
fn test_work_origin_translation_is_pure() {
    let chain = VertexChain::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)], false).unwrap();
    let points = generate_points(&[chain], 2.0).unwrap();
    let shifted = translate(&points, 100.0, 50.0);
    assert_eq!(shifted.len(), points.len());
    for (a, b) in points.iter().zip(&shifted) {
        assert_eq!(b.x - a.x, 100.0);
        assert_eq!(b.y - a.y, 50.0);
    }
}
