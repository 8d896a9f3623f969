// Per-effect animation rules, the ripple latch and the frame clock.

use glam::{Mat4, Vec2};
use halo_core::constants::*;
use halo_core::effects::lanes::wrap_lane;
use halo_core::effects::particles::CloudAnimator;
use halo_core::effects::{AnimTarget, Animator, CascadeSide, CloudMode, RippleLatch, TickInfo};
use halo_core::{
    AnimationDriver, BufferGenerator, Clock, EffectKind, InputState, Semantic, ShaderRegistry,
};

fn input(influence: f32, pointer: Vec2) -> InputState {
    InputState {
        pointer_ndc: pointer,
        pointer_velocity: influence,
        influence,
        scroll_normalized: 0.0,
        camera_distance: CAMERA_START_DISTANCE,
        drag_delta: Vec2::ZERO,
        pointer_down: false,
    }
}

/// Drive one effect's animator for `frames` ticks at 60 fps.
fn animate(kind: EffectKind, seed: u64, frames: usize, state: InputState) -> halo_core::AttributeSet {
    let mut generator = BufferGenerator::from_seed(seed);
    let mut buffers = kind.generate(&mut generator);
    let mut animator = kind.animator(&mut generator, &buffers);
    let mut program = ShaderRegistry::new().instantiate(kind.recipe()).unwrap();
    let mut transform = kind.placement();
    let dt = 1.0 / 60.0;
    for i in 0..frames {
        let tick = TickInfo {
            dt,
            time: i as f32 * dt,
            input: &state,
        };
        let mut target = AnimTarget {
            buffers: &mut buffers,
            uniforms: program.uniforms_mut(),
            transform: &mut transform,
        };
        animator.animate(&tick, &mut target).unwrap();
    }
    buffers
}

#[test]
fn ripple_latch_fires_once_per_burst() {
    let mut latch = RippleLatch::new(0.6);
    assert!(!latch.poll(0.3));
    assert!(latch.poll(0.7));
    // sustained drag
    assert!(!latch.poll(0.9));
    assert!(!latch.poll(1.5));
    // still above the re-arm level
    assert!(!latch.poll(0.4));
    assert!(!latch.poll(0.2));
    assert!(latch.poll(0.61));
}

#[test]
fn lanes_wrap_into_their_span() {
    assert!((wrap_lane(7.5, 14.0) - -6.5).abs() < 1e-5);
    assert_eq!(wrap_lane(-7.0, 14.0), -7.0);
    assert!((wrap_lane(-7.5, 14.0) - 6.5).abs() < 1e-5);
    assert_eq!(wrap_lane(3.0, 0.0), 0.0);
    assert_eq!(wrap_lane(f32::NAN, 14.0), 0.0);
    for z in [-1000.0f32, -7.0, 0.0, 6.99, 42.0, 1.0e6] {
        let w = wrap_lane(z, LANE_LENGTH);
        assert!((-LANE_LENGTH / 2.0..LANE_LENGTH / 2.0).contains(&w), "{z} -> {w}");
    }
}

#[test]
fn lane_particles_stay_on_their_track() {
    let buffers = animate(EffectKind::Lanes, 5, 600, input(1.5, Vec2::ZERO));
    assert_eq!(buffers.len(), LANE_COUNT * LANE_PARTICLES);
    for i in 0..buffers.len() {
        let p = buffers.vec3(Semantic::Position, i).unwrap();
        assert!(p.z.abs() <= LANE_LENGTH / 2.0, "particle {i} at {p}");
    }
}

#[test]
fn cascade_respawns_keep_phase_normalized() {
    // longer than the longest lifetime, so every particle has respawned
    let buffers = animate(EffectKind::Cascade(CascadeSide::Left), 11, 400, input(0.0, Vec2::ZERO));
    assert_eq!(buffers.len(), CASCADE_COUNT);
    let phases = buffers.get(Semantic::Phase).unwrap();
    assert!(phases.iter().all(|p| (0.0..=1.0).contains(p)));
    for i in 0..buffers.len() {
        let p = buffers.vec3(Semantic::Position, i).unwrap();
        assert!(p.is_finite());
        // particles only fall
        assert!(p.y <= 0.21 && p.y > -9.0, "particle {i} at {p}");
    }
}

#[test]
fn cascade_sides_differ_only_in_colour_and_placement() {
    let left = EffectKind::Cascade(CascadeSide::Left);
    let right = EffectKind::Cascade(CascadeSide::Right);
    assert_eq!(left.recipe().label, right.recipe().label);
    assert_ne!(left.placement(), right.placement());
    assert_ne!(CascadeSide::Left.color(), CascadeSide::Right.color());
    assert_ne!(left.label(), right.label());
}

#[test]
fn repelling_cloud_stays_bounded_under_heavy_influence() {
    let kind = EffectKind::ParticleCloud(CloudMode::Repel);
    let buffers = animate(kind, 9, 300, input(INFLUENCE_CAP, Vec2::new(0.9, -0.2)));
    assert_eq!(buffers.len(), PARTICLE_CLOUD_COUNT);
    for i in 0..buffers.len() {
        let p = buffers.vec3(Semantic::Position, i).unwrap();
        assert!(p.length() <= PARTICLE_CLOUD_RADIUS + 1e-3, "particle {i} at {p}");
    }
}

#[test]
fn idle_cloud_stays_bounded_for_five_seconds() {
    let kind = EffectKind::ParticleCloud(CloudMode::Attract);
    let buffers = animate(kind, 4, 300, input(0.0, Vec2::ZERO));
    assert_eq!(buffers.len(), PARTICLE_CLOUD_COUNT);
    for i in 0..buffers.len() {
        let p = buffers.vec3(Semantic::Position, i).unwrap();
        assert!(p.is_finite() && p.length() <= PARTICLE_CLOUD_RADIUS + 1e-3, "particle {i} at {p}");
    }
}

#[test]
fn cloud_ignores_zero_length_frames() {
    let kind = EffectKind::ParticleCloud(CloudMode::Attract);
    let mut generator = BufferGenerator::from_seed(2);
    let mut buffers = kind.generate(&mut generator);
    let before = buffers.get(Semantic::Position).unwrap().to_vec();
    let _ = buffers.take_dirty();
    let mut animator = CloudAnimator::new(CloudMode::Attract, &buffers);
    let mut program = ShaderRegistry::new().instantiate(kind.recipe()).unwrap();
    let mut transform = Mat4::IDENTITY;
    let state = input(1.0, Vec2::ZERO);
    let tick = TickInfo {
        dt: 0.0,
        time: 0.0,
        input: &state,
    };
    animator
        .animate(
            &tick,
            &mut AnimTarget {
                buffers: &mut buffers,
                uniforms: program.uniforms_mut(),
                transform: &mut transform,
            },
        )
        .unwrap();
    assert_eq!(buffers.get(Semantic::Position).unwrap(), &before[..]);
    assert!(buffers.take_dirty().is_empty());
}

#[test]
fn every_kind_allocates_its_declared_topology() {
    use halo_core::{DepthMode, Topology};
    assert_eq!(EffectKind::BackgroundField.topology(), Topology::Fullscreen);
    assert_eq!(EffectKind::BackgroundField.depth(), DepthMode::Off);
    assert_eq!(EffectKind::CubeCluster.depth(), DepthMode::TestWrite);
    assert_eq!(EffectKind::Rings.depth(), DepthMode::Test);
    assert_eq!(
        EffectKind::BackgroundField.generate(&mut BufferGenerator::from_seed(0)).len(),
        0
    );
}

#[test]
fn clock_is_monotonic_and_clamped() {
    let mut clock = Clock::new(0.1);
    assert_eq!(clock.advance(1000.0), 0.0);
    assert!((clock.advance(1016.0) - 0.016).abs() < 1e-6);
    // timestamps that go backwards count as an empty frame
    assert_eq!(clock.advance(900.0), 0.0);
    assert!((clock.advance(1032.0) - 0.016).abs() < 1e-6);
    // background tab
    assert_eq!(clock.advance(60_000.0), 0.1);
    assert_eq!(clock.advance(f64::NAN), 0.0);
    assert_eq!(clock.advance(f64::INFINITY), 0.0);
    assert!((clock.elapsed() - 0.132).abs() < 1e-5);
}

#[test]
fn negative_max_dt_freezes_the_clock() {
    let mut clock = Clock::new(-1.0);
    clock.advance(0.0);
    assert_eq!(clock.advance(500.0), 0.0);
    assert_eq!(clock.elapsed(), 0.0);
}

#[test]
fn driver_starts_at_frame_zero() {
    let driver = AnimationDriver::with_clock(Clock::default());
    assert_eq!(driver.frames(), 0);
    assert_eq!(driver.elapsed(), 0.0);
}

#[test]
fn tuning_constants_are_consistent() {
    assert!(CAMERA_MIN_DISTANCE < CAMERA_START_DISTANCE && CAMERA_START_DISTANCE < CAMERA_MAX_DISTANCE);
    assert!(CAMERA_MIN_POLAR < CAMERA_START_POLAR && CAMERA_START_POLAR < CAMERA_MAX_POLAR);
    assert!((0.0..1.0).contains(&CAMERA_DAMPING));
    assert!(RIPPLE_TRIGGER_INFLUENCE < INFLUENCE_CAP);
    assert!(INFLUENCE_EPSILON > 0.0 && MAX_FRAME_DT > 0.0);
    assert!((0.0..1.0).contains(&CUBE_SKIP_PROBABILITY));
    assert!(CAMERA_ZNEAR < CAMERA_ZFAR);
}

/// One 60 fps tick of `animator` over `buffers`, returning the arrays it flagged.
fn tick_once(
    kind: EffectKind,
    animator: &mut dyn Animator,
    buffers: &mut halo_core::AttributeSet,
    state: &InputState,
) -> Vec<Semantic> {
    let _ = buffers.take_dirty();
    let mut program = ShaderRegistry::new().instantiate(kind.recipe()).unwrap();
    let mut transform = kind.placement();
    let tick = TickInfo {
        dt: 1.0 / 60.0,
        time: 1.0,
        input: state,
    };
    animator
        .animate(
            &tick,
            &mut AnimTarget {
                buffers: &mut *buffers,
                uniforms: program.uniforms_mut(),
                transform: &mut transform,
            },
        )
        .unwrap();
    buffers.take_dirty().to_vec()
}

#[test]
fn cascade_never_reuploads_velocity() {
    let kind = EffectKind::Cascade(CascadeSide::Right);
    let mut generator = BufferGenerator::from_seed(21);
    let mut buffers = kind.generate(&mut generator);
    let mut animator = kind.animator(&mut generator, &buffers);
    let state = input(0.0, Vec2::ZERO);
    for _ in 0..5 {
        let dirty = tick_once(kind, animator.as_mut(), &mut buffers, &state);
        assert!(dirty.contains(&Semantic::Position));
        assert!(dirty.contains(&Semantic::Phase));
        assert!(!dirty.contains(&Semantic::Velocity));
    }
}

#[test]
fn still_cloud_flags_nothing_for_upload() {
    use halo_core::effects::particles::CloudParams;
    use halo_core::{GenerationRule, Shape};
    let kind = EffectKind::ParticleCloud(CloudMode::Attract);
    // zero initial velocity and no flow: nothing can move
    let rule = GenerationRule::new(Shape::Sphere {
        radius: PARTICLE_CLOUD_RADIUS * 0.9,
    });
    let mut buffers = BufferGenerator::from_seed(22).generate(500, &rule);
    let params = CloudParams {
        flow_accel: 0.0,
        ..CloudParams::default()
    };
    let mut animator = CloudAnimator::with_params(CloudMode::Attract, params, &buffers);
    let state = input(0.0, Vec2::ZERO);
    assert!(tick_once(kind, &mut animator, &mut buffers, &state).is_empty());

    let mut drifting = kind.generate(&mut BufferGenerator::from_seed(23));
    let mut animator = CloudAnimator::new(CloudMode::Attract, &drifting);
    let dirty = tick_once(kind, &mut animator, &mut drifting, &state);
    assert!(dirty.contains(&Semantic::Position));
    assert!(dirty.contains(&Semantic::Velocity));
    assert!(!dirty.contains(&Semantic::Size));
}
