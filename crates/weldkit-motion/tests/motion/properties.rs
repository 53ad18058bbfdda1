//! Property tests for unit conversion, soft limits and the plane fit

use proptest::prelude::*;
use weldkit_motion::{fit_plane, tilt_targets, AxisConversion, ProbeSample, ZLimits};

proptest! {
    #[test]
    fn conversion_within_half_pulse(
        mm in -500.0f64..500.0,
        ppu in 1.0f64..2_000.0,
        offset in -100_000i32..100_000,
        direction in prop::sample::select(vec![-1i32, 1]),
    ) {
        let conv = AxisConversion::new(ppu, offset, direction);
        let back = conv.to_mm(conv.to_pulses(mm));
        prop_assert!((back - mm).abs() <= 0.5 / ppu + 1e-9);
    }

    #[test]
    fn clamped_target_inside_limits(pulse in any::<i32>(), low in -1_000i32..1_000, span in 0i32..100_000) {
        let limits = ZLimits::new(low, low + span);
        let clamped = limits.clamp(pulse);
        prop_assert!(limits.contains(clamped));
        if limits.contains(pulse) {
            prop_assert_eq!(clamped, pulse);
        }
    }

    #[test]
    fn grid_fit_recovers_plane(a in -0.05f64..0.05, b in -0.05f64..0.05, c in -10.0f64..10.0) {
        let samples: Vec<ProbeSample> = tilt_targets(16, 600.0, 400.0)
            .unwrap()
            .into_iter()
            .map(|p| ProbeSample::new(p.x, p.y, a * p.x + b * p.y + c))
            .collect();
        let plane = fit_plane(&samples).unwrap();
        prop_assert!((plane.a - a).abs() < 1e-8);
        prop_assert!((plane.b - b).abs() < 1e-8);
        prop_assert!((plane.c - c).abs() < 1e-6);
    }
}
