// Scene composition and mount lifecycle against the recording backend.

mod common;

use common::FakeGpu;
use halo_core::effects::{CascadeSide, CloudMode};
use halo_core::{
    EffectConfig, EffectKind, FxError, MountHandle, PageVariant, Semantic, TickOutcome, Viewport,
};
use std::cell::Cell;
use std::rc::Rc;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn viewport() -> Viewport {
    Viewport::new(800.0, 600.0, 1.0).unwrap()
}

fn mount(variant: PageVariant) -> (MountHandle<FakeGpu>, Rc<std::cell::RefCell<common::GpuLog>>) {
    let (gpu, log) = FakeGpu::new();
    let handle = MountHandle::mount(gpu, &EffectConfig::new(variant).with_seed(1), viewport()).unwrap();
    (handle, log)
}

fn run(handle: &MountHandle<FakeGpu>, frames: usize) {
    for i in 0..frames {
        let outcome = handle.tick(i as f64 * FRAME_MS);
        assert!(matches!(outcome, TickOutcome::Rendered(_)), "frame {i}: {outcome:?}");
    }
}

#[test]
fn variant_names_parse_loosely() {
    assert_eq!(" Hero ".parse::<PageVariant>().unwrap(), PageVariant::Hero);
    assert_eq!("PARTICLE-GRID".parse::<PageVariant>().unwrap(), PageVariant::ParticleGrid);
    for v in PageVariant::ALL {
        assert_eq!(v.to_string().parse::<PageVariant>().unwrap(), v);
    }
    assert!(matches!(
        "carousel".parse::<PageVariant>(),
        Err(FxError::InvalidConfiguration(_))
    ));
}

#[test]
fn variants_compose_their_layers_and_post_chains() {
    let kinds: Vec<_> = PageVariant::ParticleGrid.layers().iter().map(|(k, _)| *k).collect();
    assert_eq!(
        kinds,
        [
            EffectKind::BackgroundField,
            EffectKind::GroundPlane,
            EffectKind::Lanes,
            EffectKind::Cascade(CascadeSide::Left),
            EffectKind::Cascade(CascadeSide::Right),
        ]
    );
    let post: Vec<_> = PageVariant::Hero.post_chain().plan().iter().map(|s| s.name()).collect();
    assert_eq!(post, ["bloom", "chromatic"]);
    for v in PageVariant::ALL {
        assert_eq!(v.layers()[0].0, EffectKind::BackgroundField, "{v}");
    }
}

#[test]
fn viewport_rejects_non_sizes() {
    assert!(Viewport::new(-1.0, 600.0, 1.0).is_err());
    assert!(Viewport::new(f32::NAN, 600.0, 1.0).is_err());
    assert!(Viewport::new(800.0, 600.0, 0.0).is_err());
    assert_eq!(Viewport::new(0.0, 0.0, 1.0).unwrap().backing_size(), (1, 1));
    assert_eq!(Viewport::new(800.4, 600.0, 1.5).unwrap().backing_size(), (1201, 900));
}

#[test]
fn invalid_config_is_rejected_before_any_allocation() {
    for config in [
        EffectConfig {
            opacity: 1.5,
            ..EffectConfig::new(PageVariant::Hero)
        },
        EffectConfig {
            opacity: f32::NAN,
            ..EffectConfig::new(PageVariant::Hero)
        },
        EffectConfig {
            layer_order: 20_000,
            ..EffectConfig::new(PageVariant::Hero)
        },
    ] {
        let (gpu, log) = FakeGpu::new();
        let err = MountHandle::mount(gpu, &config, viewport()).err();
        assert!(matches!(err, Some(FxError::InvalidConfiguration(_))));
        let log = log.borrow();
        assert_eq!(log.programs_created + log.geometries_created, 0);
        assert!(log.resizes.is_empty());
    }
}

#[test]
fn mount_then_unmount_releases_everything() {
    for variant in PageVariant::ALL {
        let (handle, log) = mount(variant);
        assert_eq!(log.borrow().live(), 2 * variant.layers().len(), "{variant}");
        run(&handle, 30);
        handle.unmount();
        handle.unmount();
        assert!(!handle.is_mounted());
        assert_eq!(log.borrow().live(), 0, "{variant} leaked");
        assert_eq!(handle.tick(10_000.0), TickOutcome::Stopped);
    }
}

#[test]
fn seeded_remount_reproduces_the_scene() {
    let config = EffectConfig::new(PageVariant::Hero).with_seed(42);
    let (a, _) = FakeGpu::new();
    let first = MountHandle::mount(a, &config, viewport()).unwrap();
    let counts = first.inspect(|s| s.layer_counts()).unwrap();
    first.unmount();

    let (b, log) = FakeGpu::new();
    let second = MountHandle::mount(b, &config, viewport()).unwrap();
    assert_eq!(second.inspect(|s| s.layer_counts()).unwrap(), counts);
    second.unmount();
    assert_eq!(log.borrow().live(), 0);
}

#[test]
fn failed_layer_rolls_back_the_whole_mount() {
    let (gpu, log) = FakeGpu::new();
    log.borrow_mut().fail_geometry_at = Some(1);
    let result = MountHandle::mount(gpu, &EffectConfig::new(PageVariant::Hero), viewport());
    assert!(matches!(result, Err(FxError::ResourceAllocation { .. })));
    let log = log.borrow();
    assert_eq!(log.programs_created, 2);
    assert_eq!(log.live(), 0);
}

#[test]
fn failed_program_rolls_back_the_whole_mount() {
    let (gpu, log) = FakeGpu::new();
    log.borrow_mut().fail_program_at = Some(3);
    let result = MountHandle::mount(gpu, &EffectConfig::new(PageVariant::ParticleGrid), viewport());
    assert!(result.is_err());
    assert_eq!(log.borrow().live(), 0);
}

#[test]
fn unmount_from_inside_a_frame_defers_release() {
    let (handle, log) = mount(PageVariant::Hero);
    let calls = Rc::new(Cell::new(0u32));
    let seen = calls.clone();
    handle.set_frame_hook(move |h, report| {
        seen.set(seen.get() + 1);
        if report.frame == 3 {
            h.unmount();
        }
    });

    assert!(matches!(handle.tick(0.0), TickOutcome::Rendered(_)));
    assert!(matches!(handle.tick(FRAME_MS), TickOutcome::Rendered(_)));
    assert_eq!(handle.tick(2.0 * FRAME_MS), TickOutcome::Stopped);
    assert_eq!(log.borrow().renders, 3);
    assert_eq!(log.borrow().live(), 0);

    assert_eq!(handle.tick(3.0 * FRAME_MS), TickOutcome::Stopped);
    assert_eq!(calls.get(), 3);
    assert_eq!(log.borrow().renders, 3);
}

#[test]
fn render_failure_tears_the_scene_down() {
    let (handle, log) = mount(PageVariant::ShaderBackground);
    run(&handle, 2);
    log.borrow_mut().fail_render = true;
    assert_eq!(handle.tick(100.0), TickOutcome::Failed(FxError::ContextLost));
    assert!(!handle.is_mounted());
    assert_eq!(log.borrow().live(), 0);
    assert_eq!(handle.tick(120.0), TickOutcome::Stopped);
}

#[test]
fn draws_follow_render_order() {
    let (gpu, log) = FakeGpu::new();
    let config = EffectConfig {
        layer_order: 5,
        ..EffectConfig::new(PageVariant::Hero).with_seed(3)
    };
    let handle = MountHandle::mount(gpu, &config, viewport()).unwrap();
    run(&handle, 1);
    let log = log.borrow();
    let plan = log.last_plan.as_ref().unwrap();
    let orders: Vec<_> = plan.draws.iter().map(|d| d.render_order).collect();
    assert_eq!(orders, [5, 15, 25, 35]);
    assert_eq!(plan.post.len(), 2);
    assert_eq!(plan.draws[0].instance_count, 1);
}

#[test]
fn zero_opacity_layers_are_not_drawn() {
    let (gpu, log) = FakeGpu::new();
    let config = EffectConfig {
        opacity: 0.0,
        ..EffectConfig::new(PageVariant::Hero).with_seed(3)
    };
    let handle = MountHandle::mount(gpu, &config, viewport()).unwrap();
    run(&handle, 1);
    assert!(log.borrow().last_plan.as_ref().unwrap().draws.is_empty());
}

#[test]
fn disabled_post_pass_leaves_the_frame_plan() {
    let (handle, log) = mount(PageVariant::Hero);
    handle.set_post_enabled("bloom", false);
    run(&handle, 1);
    let log = log.borrow();
    let names: Vec<_> = log.last_plan.as_ref().unwrap().post.iter().map(|s| s.name()).collect();
    assert_eq!(names, ["chromatic"]);
}

#[test]
fn frames_upload_uniforms_and_animated_attributes() {
    let (handle, log) = mount(PageVariant::Hero);
    run(&handle, 3);
    let log = log.borrow();
    assert!(log.uniform_writes >= 4);
    assert!(log.attribute_writes > 0);
}

#[test]
fn extreme_wheel_saturates_the_camera() {
    let (handle, _log) = mount(PageVariant::Hero);
    let max = EffectConfig::new(PageVariant::Hero).tracker_params().max_distance;
    handle.wheel(10_000.0);
    run(&handle, 240);
    assert_eq!(handle.input_state().unwrap().camera_distance, max);
    let distance = handle.inspect(|s| s.camera().distance).unwrap();
    assert!(distance <= max);
    assert!(max - distance < 0.05, "camera stalled at {distance}");
}

#[test]
fn degenerate_resize_keeps_the_previous_viewport() {
    let (handle, log) = mount(PageVariant::ShaderBackground);
    assert_eq!(log.borrow().resizes, [(800, 600)]);

    handle.resize(0.0, 600.0, 1.0).unwrap();
    assert_eq!(handle.inspect(|s| s.viewport()).unwrap(), viewport());
    assert_eq!(log.borrow().resizes.len(), 1);

    assert!(handle.resize(-5.0, 600.0, 1.0).is_err());

    handle.resize(1024.0, 768.0, 2.0).unwrap();
    assert_eq!(log.borrow().resizes.last(), Some(&(2048, 1536)));
    run(&handle, 1);
}

#[test]
fn events_after_unmount_are_ignored() {
    let (handle, _log) = mount(PageVariant::Hero);
    handle.unmount();
    handle.pointer_move(10.0, 10.0);
    handle.pointer_down();
    handle.wheel(50.0);
    handle.scroll(300.0);
    assert!(handle.input_state().is_none());
    assert!(handle.inspect(|s| s.layers().len()).is_none());
}

#[test]
fn dropping_the_last_handle_releases_resources() {
    let (handle, log) = mount(PageVariant::ParticleGrid);
    run(&handle, 2);
    drop(handle);
    assert_eq!(log.borrow().live(), 0);
}

#[test]
fn large_particle_field_stays_inside_its_sphere() {
    let (handle, _log) = mount(PageVariant::ParticleField);
    let radius = halo_core::constants::PARTICLE_CLOUD_RADIUS;
    let count = handle
        .inspect(|s| {
            s.layer_counts()
                .into_iter()
                .find(|(k, _)| *k == EffectKind::ParticleCloud(CloudMode::Attract))
                .map(|(_, n)| n)
        })
        .flatten()
        .unwrap();
    assert_eq!(count, 15_000);

    // five seconds of a pointer sweeping the canvas
    for i in 0..300 {
        let t = i as f32 / 300.0;
        handle.pointer_move(800.0 * t, 300.0 + 250.0 * (t * 12.0).sin());
        let outcome = handle.tick(i as f64 * FRAME_MS);
        assert!(matches!(outcome, TickOutcome::Rendered(_)));
    }
    assert!(handle.input_state().unwrap().influence > 0.0);

    let escaped = handle
        .inspect(|s| {
            let cloud = &s.layers()[1];
            (0..cloud.len())
                .filter_map(|i| cloud.buffers().vec3(Semantic::Position, i))
                .filter(|p| !p.is_finite() || p.length() > radius + 1e-3)
                .count()
        })
        .unwrap();
    assert_eq!(escaped, 0);
}

#[test]
fn idle_particle_field_stays_inside_its_sphere() {
    let (handle, log) = mount(PageVariant::ParticleField);
    let radius = halo_core::constants::PARTICLE_CLOUD_RADIUS;
    // five seconds with no input at all
    run(&handle, 300);
    assert_eq!(log.borrow().renders, 300);
    assert_eq!(handle.input_state().unwrap().influence, 0.0);

    let (count, escaped) = handle
        .inspect(|s| {
            let cloud = &s.layers()[1];
            let escaped = (0..cloud.len())
                .filter_map(|i| cloud.buffers().vec3(Semantic::Position, i))
                .filter(|p| !p.is_finite() || p.length() > radius + 1e-3)
                .count();
            (cloud.len(), escaped)
        })
        .unwrap();
    assert_eq!(count, 15_000);
    assert_eq!(escaped, 0);
}
