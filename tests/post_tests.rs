// Post chain planning and the CPU mirrors of the post shader math.

use glam::{Vec2, Vec3};
use halo_core::post::{blur_weight_total, bright_pass, chroma_offset, luminance, tonemap, BLUR_WEIGHTS};
use halo_core::{BloomSettings, ChromaticSettings, PageVariant, PostChain, PostStep, PostUniforms};

fn hero_chain() -> PostChain {
    PostChain::empty()
        .with(PostStep::Bloom(BloomSettings::default()))
        .with(PostStep::ChromaticAberration(ChromaticSettings::default()))
}

#[test]
fn disabled_pass_drops_out_of_the_plan() {
    let mut chain = hero_chain();
    let names: Vec<_> = chain.plan().iter().map(|s| s.name()).collect();
    assert_eq!(names, ["bloom", "chromatic"]);

    chain.set_enabled("bloom", false);
    let names: Vec<_> = chain.plan().iter().map(|s| s.name()).collect();
    assert_eq!(names, ["chromatic"]);
    // still listed, just switched off
    assert_eq!(chain.passes().len(), 2);

    chain.set_enabled("bloom", true);
    assert_eq!(chain.plan().len(), 2);
}

#[test]
fn unknown_pass_name_is_ignored() {
    let mut chain = hero_chain();
    chain.set_enabled("vignette", false);
    assert_eq!(chain.plan().len(), 2);
}

#[test]
fn empty_chain_plans_nothing() {
    assert!(PostChain::empty().plan().is_empty());
    assert!(PageVariant::ShaderBackground.post_chain().plan().is_empty());
}

#[test]
fn blur_kernel_is_normalized() {
    assert!((blur_weight_total() - 1.0).abs() < 1e-4);
    assert!(BLUR_WEIGHTS.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn bright_pass_keeps_only_light_above_threshold() {
    let dim = Vec3::splat(0.2);
    assert_eq!(bright_pass(dim, 0.6), Vec3::ZERO);
    assert_eq!(bright_pass(Vec3::ZERO, 0.6), Vec3::ZERO);

    let hot = Vec3::new(2.0, 1.8, 1.5);
    let kept = bright_pass(hot, 0.6);
    assert!(kept.x > 0.0 && kept.y > 0.0 && kept.z > 0.0);
    assert!(luminance(kept) < luminance(hot));
    // hue is preserved
    assert!((kept.x / kept.y - hot.x / hot.y).abs() < 1e-5);
}

#[test]
fn chroma_offset_vanishes_at_the_centre() {
    assert_eq!(chroma_offset(Vec2::splat(0.5), 0.004), Vec2::ZERO);
    let edge = chroma_offset(Vec2::new(1.0, 0.5), 0.004);
    assert!((edge.x - 0.002).abs() < 1e-7);
    assert_eq!(edge.y, 0.0);
}

#[test]
fn tonemap_stays_below_one() {
    for v in [0.0f32, 0.5, 1.0, 10.0, 1.0e4] {
        let c = tonemap(Vec3::splat(v), 1.0);
        assert!(c.x >= 0.0 && c.x < 1.0, "{v} -> {c}");
    }
    assert!(tonemap(Vec3::ONE, 2.0).x > tonemap(Vec3::ONE, 1.0).x);
}

#[test]
fn post_uniforms_carry_step_settings() {
    assert_eq!(std::mem::size_of::<PostUniforms>(), 48);

    let bloom = BloomSettings {
        strength: 0.7,
        threshold: 0.5,
        radius: 2.0,
    };
    let u = PostUniforms::for_step(&PostStep::Bloom(bloom), [640.0, 480.0], 1.5, 1.2)
        .with_blur_dir([0.0, 1.0]);
    assert_eq!(u.resolution, [640.0, 480.0]);
    assert_eq!(u.blur_dir, [0.0, 1.0]);
    assert_eq!((u.threshold, u.bloom_strength, u.bloom_radius), (0.5, 0.7, 2.0));
    assert_eq!(u.chroma_strength, 0.0);
    assert_eq!((u.time, u.exposure), (1.5, 1.2));

    let c = PostUniforms::for_step(
        &PostStep::ChromaticAberration(ChromaticSettings { strength: 0.01 }),
        [1.0, 1.0],
        0.0,
        1.0,
    );
    assert_eq!(c.chroma_strength, 0.01);
    assert_eq!(c.bloom_strength, 0.0);
}
