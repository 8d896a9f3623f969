// Host-side tests for uniform layout, the shader registry and WGSL checks.

use glam::{Mat4, Vec2, Vec3};
use halo_core::effects::{CascadeSide, CloudMode};
use halo_core::shader::{self, ProgramRecipe};
use halo_core::{EffectKind, FxError, FxResult, ShaderRegistry, UniformSchema, UniformType, UniformValue};

const ALL_KINDS: [EffectKind; 9] = [
    EffectKind::BackgroundField,
    EffectKind::GroundPlane,
    EffectKind::ParticleCloud(CloudMode::Attract),
    EffectKind::ParticleCloud(CloudMode::Repel),
    EffectKind::Rings,
    EffectKind::Lanes,
    EffectKind::Cascade(CascadeSide::Left),
    EffectKind::Cascade(CascadeSide::Right),
    EffectKind::CubeCluster,
];

fn tiny_schema() -> FxResult<UniformSchema> {
    UniformSchema::builder()
        .field("time", 0.0f32)
        .field("tint", Vec3::ONE)
        .build()
}

const TINY_WGSL: &str = "
struct Uniforms {
    time: f32,
    tint: vec3<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    // u.ghost lives in a comment and must not count
    return vec4<f32>(f32(vi) * u.time, 0.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(u.tint, 1.0);
}
";

static TINY: ProgramRecipe = ProgramRecipe {
    label: "tiny",
    wgsl: TINY_WGSL,
    schema: tiny_schema,
};

#[test]
fn every_effect_program_validates() {
    let mut registry = ShaderRegistry::new();
    for kind in ALL_KINDS {
        let program = registry
            .instantiate(kind.recipe())
            .unwrap_or_else(|e| panic!("{}: {e}", kind.label()));
        assert!(program.source().contains("fn vs_main("));
        assert_eq!(program.uniforms().as_bytes().len(), program.schema().size());
        assert_eq!(program.schema().size() % 16, 0);
    }
}

#[test]
fn post_module_composes_with_the_prelude() {
    let src = shader::compose(halo_core::POST_WGSL);
    assert!(src.starts_with(halo_core::PRELUDE_WGSL));
    assert!(src.contains("fn fullscreen_corner("));
    let fields = shader::parse_struct_fields(&src, "PostUniforms").unwrap();
    let bytes: usize = fields.iter().map(|(_, t)| t.size()).sum();
    assert_eq!(bytes, std::mem::size_of::<halo_core::PostUniforms>());
}

#[test]
fn registry_validates_once_but_never_shares_storage() {
    let mut registry = ShaderRegistry::new();
    let mut a = registry.instantiate(&TINY).unwrap();
    let b = registry.instantiate(&TINY).unwrap();
    assert_eq!(registry.len(), 1);

    a.uniforms_mut().set("time", 4.0f32).unwrap();
    assert_eq!(a.uniforms().get_f32("time"), Some(4.0));
    assert_eq!(b.uniforms().get_f32("time"), Some(0.0));
}

#[test]
fn unknown_and_mistyped_uniforms_are_rejected() {
    let mut registry = ShaderRegistry::new();
    let mut p = registry.instantiate(&TINY).unwrap();
    let u = p.uniforms_mut();

    let err = u.set("brightness", 1.0f32).unwrap_err();
    assert!(matches!(err, FxError::UnknownUniform { ref name, .. } if name == "brightness"));

    let err = u.set("tint", 1.0f32).unwrap_err();
    assert!(matches!(
        err,
        FxError::UniformTypeMismatch {
            expected: "vec3<f32>",
            found: "f32",
            ..
        }
    ));
    assert_eq!(u.get("tint"), Some(UniformValue::Vec3(Vec3::ONE)));

    assert!(!u.set_if_declared("brightness", 1.0f32));
    assert!(!u.set_if_declared("time", Vec2::ONE));
    assert!(u.set_if_declared("time", 2.0f32));
}

#[test]
fn validation_catches_schema_drift() {
    let schema = tiny_schema().unwrap();
    assert!(shader::validate("tiny", TINY_WGSL, &schema).is_ok());

    let reordered = TINY_WGSL.replace("time: f32,\n    tint: vec3<f32>,", "tint: vec3<f32>,\n    time: f32,");
    assert!(matches!(
        shader::validate("tiny", &reordered, &schema),
        Err(FxError::ShaderValidation { .. })
    ));

    let retyped = TINY_WGSL.replace("time: f32", "time: vec2<f32>");
    assert!(shader::validate("tiny", &retyped, &schema).is_err());

    let stray = TINY_WGSL.replace("u.tint, 1.0", "u.tint * u.glow, 1.0");
    assert!(shader::validate("tiny", &stray, &schema).is_err());

    let headless = TINY_WGSL.replace("fn fs_main(", "fn fs_other(");
    assert!(shader::validate("tiny", &headless, &schema).is_err());
}

#[test]
fn referenced_fields_respect_identifier_boundaries() {
    let src = "let a = u.time + menu.open + u.tint.x + u.time;";
    assert_eq!(shader::referenced_fields(src, "u"), vec!["time", "tint"]);
}

#[test]
fn schema_layout_follows_uniform_alignment() {
    let schema = UniformSchema::builder()
        .field("a", 0.0f32)
        .field("b", Vec3::ZERO)
        .field("c", 0.0f32)
        .field("d", Mat4::IDENTITY)
        .field("e", Vec2::ZERO)
        .build()
        .unwrap();
    let offsets: Vec<usize> = schema.fields().iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, 16, 28, 32, 96]);
    assert_eq!(schema.size(), 112);
}

#[test]
fn duplicate_fields_fail_to_build() {
    let err = UniformSchema::builder()
        .field("time", 0.0f32)
        .field("time", 1.0f32)
        .build()
        .unwrap_err();
    assert!(matches!(err, FxError::ShaderValidation { .. }));
}

#[test]
fn wgsl_type_names_parse_both_spellings() {
    assert_eq!(UniformType::from_wgsl(" vec3f "), Some(UniformType::Vec3));
    assert_eq!(UniformType::from_wgsl("mat4x4<f32>"), Some(UniformType::Mat4));
    assert_eq!(UniformType::from_wgsl("i32"), None);
}

#[test]
fn storage_reports_changes_once() {
    let mut registry = ShaderRegistry::new();
    let mut p = registry.instantiate(&TINY).unwrap();
    let u = p.uniforms_mut();
    assert!(u.take_dirty());
    assert!(!u.take_dirty());
    u.set("time", 1.0f32).unwrap();
    assert!(u.take_dirty());
    u.reset_defaults();
    assert_eq!(u.get_f32("time"), Some(0.0));
}
