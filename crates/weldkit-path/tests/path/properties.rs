//! Property tests for contour assembly and point generation

use proptest::prelude::*;
use weldkit_core::Point;
use weldkit_path::{assemble_contours, generate_points, Segment, VertexChain};

fn grid_segment() -> impl Strategy<Value = Segment> {
    (0i32..6, 0i32..6, 0i32..6, 0i32..6).prop_map(|(ax, ay, bx, by)| {
        Segment::from(((ax as f64, ay as f64), (bx as f64, by as f64)))
    })
}

fn polygon_segments(sides: usize, radius: f64) -> Vec<Segment> {
    let vertices: Vec<Point> = (0..sides)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / sides as f64;
            Point::new(radius * a.cos(), radius * a.sin())
        })
        .collect();
    (0..sides)
        .map(|i| Segment::new(vertices[i], vertices[(i + 1) % sides]))
        .collect()
}

proptest! {
    #[test]
    fn dedup_idempotence(segments in prop::collection::vec(grid_segment(), 0..24)) {
        let once = assemble_contours(&segments, 1e-4);

        let mut appended = segments.clone();
        appended.extend(segments.iter().copied());
        prop_assert_eq!(&assemble_contours(&appended, 1e-4), &once);

        let interleaved: Vec<Segment> = segments.iter().flat_map(|s| [*s, *s]).collect();
        prop_assert_eq!(&assemble_contours(&interleaved, 1e-4), &once);
    }

    #[test]
    fn reversal_invariance(segments in prop::collection::vec(grid_segment(), 0..24)) {
        let reversed: Vec<Segment> = segments.iter().map(Segment::reversed).collect();
        prop_assert_eq!(
            assemble_contours(&reversed, 1e-4),
            assemble_contours(&segments, 1e-4)
        );
    }

    #[test]
    fn shuffled_polygon_closes(
        sides in 3usize..12,
        radius in 5.0f64..100.0,
        seed in any::<u64>(),
    ) {
        let mut segments = polygon_segments(sides, radius);
        // Deterministic rotation plus optional flips stand in for an arbitrary order.
        let len = segments.len();
        segments.rotate_left((seed as usize) % len);
        for (i, s) in segments.iter_mut().enumerate() {
            if (seed >> (i % 64)) & 1 == 1 {
                *s = s.reversed();
            }
        }

        let chains = assemble_contours(&segments, 1e-4);
        prop_assert_eq!(chains.len(), 1);
        prop_assert!(chains[0].is_closed());
        prop_assert_eq!(chains[0].len(), sides);
    }

    #[test]
    fn pitch_coverage(length in 1.0f64..200.0, pitch in 0.1f64..20.0) {
        let ratio = length / pitch;
        prop_assume!(ratio.fract() > 1e-6 && ratio.fract() < 1.0 - 1e-6);

        let chain = VertexChain::new(vec![Point::new(0.0, 0.0), Point::new(length, 0.0)], false).unwrap();
        let points = generate_points(&[chain], pitch).unwrap();

        prop_assert_eq!(points.len(), ratio.floor() as usize + 1);
        prop_assert_eq!(points[0], Point::new(0.0, 0.0));
        for pair in points.windows(2) {
            let step = pair[1].x - pair[0].x;
            prop_assert!(step > 0.0 && step <= pitch + 1e-9);
        }
        prop_assert!(points.iter().all(|p| p.x < length && p.y == 0.0));
    }
}
