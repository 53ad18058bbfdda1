//! Tests for contour assembly

use weldkit_core::Point;
use weldkit_path::{assemble_contours, Segment, DEFAULT_CONTOUR_TOLERANCE};

fn rect_segments(x0: f64, y0: f64, w: f64, h: f64) -> Vec<Segment> {
    let a = (x0, y0);
    let b = (x0 + w, y0);
    let c = (x0 + w, y0 + h);
    let d = (x0, y0 + h);
    vec![
        Segment::from((a, b)),
        Segment::from((b, c)),
        Segment::from((c, d)),
        Segment::from((d, a)),
    ]
}

#[test]
fn test_quadrilateral_yields_single_closed_chain() {
    let chains = assemble_contours(&rect_segments(0.0, 0.0, 30.0, 20.0), DEFAULT_CONTOUR_TOLERANCE);
    assert_eq!(chains.len(), 1);
    assert!(chains[0].is_closed());
    assert_eq!(chains[0].len(), 4);
}

#[test]
fn test_disjoint_loops_do_not_mix() {
    let mut segments = rect_segments(0.0, 0.0, 10.0, 10.0);
    segments.extend(rect_segments(50.0, 50.0, 5.0, 5.0));
    // Interleave so the pool order does not follow the loops.
    segments.swap(1, 5);

    let chains = assemble_contours(&segments, DEFAULT_CONTOUR_TOLERANCE);
    assert_eq!(chains.len(), 2);
    for chain in &chains {
        assert!(chain.is_closed());
        assert_eq!(chain.len(), 4);
        let small = chain.points()[0].x >= 50.0;
        assert!(chain.points().iter().all(|p| (p.x >= 50.0) == small));
    }
}

#[test]
fn test_tolerance_joins_near_endpoints() {
    let segments = vec![
        Segment::from(((0.0, 0.0), (10.0, 0.0))),
        Segment::from(((10.00004, 0.00003), (10.0, 10.0))),
        Segment::from(((10.0, 10.0), (0.0, 0.00002))),
    ];
    let chains = assemble_contours(&segments, 1e-4);
    assert_eq!(chains.len(), 1);
    assert!(chains[0].is_closed());
    assert_eq!(chains[0].len(), 3);
}

#[test]
fn test_each_segment_used_once() {
    // A "T" junction: the stem cannot join the bar's chain twice.
    let segments = vec![
        Segment::from(((0.0, 0.0), (5.0, 0.0))),
        Segment::from(((5.0, 0.0), (10.0, 0.0))),
        Segment::from(((5.0, 0.0), (5.0, 5.0))),
    ];
    let chains = assemble_contours(&segments, 1e-4);
    let edges: usize = chains.iter().map(|c| c.edges().count()).sum();
    assert_eq!(edges, 3);
}

#[test]
fn test_empty_input() {
    assert!(assemble_contours(&[], 1e-4).is_empty());
    let only_degenerate = vec![Segment::new(Point::new(1.0, 1.0), Point::new(1.0, 1.0))];
    assert!(assemble_contours(&only_degenerate, 1e-4).is_empty());
}
