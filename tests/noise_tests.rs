// Host-side tests for the CPU noise functions.

use glam::{Vec2, Vec3};
use halo_core::noise::{fbm2, flow3, simplex2, to_unit, value2, value3};

fn sample_points() -> impl Iterator<Item = Vec2> {
    (-40..40).flat_map(|i| (-40..40).map(move |j| Vec2::new(i as f32 * 0.37, j as f32 * 0.53)))
}

#[test]
fn value_and_simplex_noise_stay_in_unit_range() {
    for p in sample_points() {
        for n in [value2(p), simplex2(p), fbm2(p, 5), value3(p.extend(p.x - p.y))] {
            assert!((-1.0..=1.0).contains(&n), "{n} at {p:?}");
        }
    }
}

#[test]
fn far_coordinates_stay_bounded() {
    for p in [Vec2::new(1.0e6, -3.0e5), Vec2::new(-2.0e7, 9.9e6), Vec2::splat(123_456.7)] {
        assert!((-1.0..=1.0).contains(&value2(p)));
        assert!((-1.0..=1.0).contains(&simplex2(p)));
    }
}

#[test]
fn non_finite_input_yields_zero() {
    assert_eq!(value2(Vec2::new(f32::NAN, 0.0)), 0.0);
    assert_eq!(simplex2(Vec2::new(0.0, f32::INFINITY)), 0.0);
    assert_eq!(value3(Vec3::new(0.0, 0.0, f32::NAN)), 0.0);
}

#[test]
fn value_noise_is_continuous() {
    for p in sample_points() {
        let step = Vec2::new(1e-3, 0.0);
        assert!((value2(p) - value2(p + step)).abs() < 0.01, "jump at {p:?}");
    }
}

#[test]
fn noise_is_deterministic() {
    let p = Vec2::new(3.3, -7.1);
    assert_eq!(simplex2(p), simplex2(p));
    assert_eq!(fbm2(p, 4), fbm2(p, 4));
}

#[test]
fn zero_octaves_still_produce_a_sample() {
    let p = Vec2::new(0.4, 0.9);
    assert_eq!(fbm2(p, 0), fbm2(p, 1));
}

#[test]
fn to_unit_maps_into_zero_one() {
    assert_eq!(to_unit(-1.0), 0.0);
    assert_eq!(to_unit(1.0), 1.0);
    assert_eq!(to_unit(0.0), 0.5);
    assert_eq!(to_unit(5.0), 1.0);
}

#[test]
fn flow_field_components_are_bounded() {
    for i in 0..200 {
        let t = i as f32 * 0.1;
        let f = flow3(Vec3::new(t.sin() * 4.0, t.cos() * 3.0, t), t);
        assert!(f.abs().max_element() <= 1.0);
    }
}
