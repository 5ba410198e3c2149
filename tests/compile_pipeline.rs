use std::sync::Arc;

use shadegraph::algebra::Swizzle;
use shadegraph::context::{PixelFormat, TextureTarget};
use shadegraph::kinds::NodeKind;
use shadegraph::validation::validate_bundle;
use shadegraph::{
    signature, CompileContext, Compiler, Dialect, Graph, LightKind, SharedTextures, TextureRef,
};

fn texture(id: u32) -> TextureRef {
    TextureRef {
        id,
        format: PixelFormat::Rgba8,
        target: TextureTarget::D2,
    }
}

fn context() -> CompileContext {
    CompileContext::new(SharedTextures {
        screen: texture(100),
        noise: texture(101),
    })
}

/// Tinted texture lookup: constant * sample, straight to the output.
fn tinted_sample_graph() -> Graph {
    let mut g = Graph::new();
    let tint = g.add_node(NodeKind::ConstantColor {
        rgba: [1.0, 0.5, 0.25, 1.0],
    });
    let sample = g.add_node(NodeKind::TextureSample {
        texture: texture(7),
    });
    let mul = g.add_node(NodeKind::Multiply);
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(tint, mul, 0, false, Swizzle::IDENTITY).unwrap();
    g.connect(sample, mul, 1, false, Swizzle::IDENTITY).unwrap();
    g.connect(mul, out, 0, false, Swizzle::IDENTITY).unwrap();
    g
}

fn lit_graph() -> Graph {
    let mut g = Graph::new();
    let base = g.add_node(NodeKind::ConstantColor {
        rgba: [0.8, 0.2, 0.2, 1.0],
    });
    let diffuse = g.add_node(NodeKind::DiffuseLight);
    let specular = g.add_node(NodeKind::SpecularLight { shininess: 32.0 });
    let light = g.add_node(NodeKind::Add);
    let shaded = g.add_node(NodeKind::Multiply);
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(diffuse, light, 0, false, Swizzle::IDENTITY).unwrap();
    g.connect(specular, light, 1, false, Swizzle::IDENTITY).unwrap();
    g.connect(base, shaded, 0, false, Swizzle::IDENTITY).unwrap();
    g.connect(light, shaded, 1, false, Swizzle::IDENTITY).unwrap();
    g.connect(shaded, out, 0, false, Swizzle::IDENTITY).unwrap();
    g
}

#[test]
fn tinted_sample_lowers_to_valid_wgsl() {
    let compiler = Compiler::new();
    let (program, hit) = compiler
        .compile(&tinted_sample_graph(), &context(), Dialect::Wgsl)
        .unwrap();
    assert!(!hit);

    let fragment = &program.bundle.fragment;
    assert!(fragment.contains("textureSample(t0, s0, in.v_uv0)"));
    assert!(fragment.contains("let r1 = k0 * r0;"));
    assert!(fragment.contains("return r1;"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn tinted_sample_lowers_to_valid_glsl() {
    let compiler = Compiler::new();
    let (program, _) = compiler
        .compile(&tinted_sample_graph(), &context(), Dialect::Glsl)
        .unwrap();

    let fragment = &program.bundle.fragment;
    assert!(fragment.starts_with("#version 450"));
    assert!(fragment.contains("layout(set = 1, binding = 0) uniform texture2D t0;"));
    assert!(fragment.contains("layout(set = 1, binding = 1) uniform sampler s0;"));
    assert!(fragment.contains("vec4 r0 = texture(sampler2D(t0, s0), v_uv0);"));
    assert!(fragment.contains("vec4 r1 = k0 * r0;"));
    assert!(fragment.contains("frag_color = r1;"));
    validate_bundle(&program.bundle, Dialect::Glsl).unwrap();
}

#[test]
fn glsl_occlusion_and_screen_lookups_validate() {
    let mut ctx = context();
    ctx.ambient_occlusion = true;
    let program = shadegraph::compile_uncached(&tinted_sample_graph(), &ctx, Dialect::Glsl).unwrap();
    let fragment = &program.bundle.fragment;
    assert!(fragment.contains("layout(set = 1, binding = 2) uniform texture2D t1;"));
    assert!(fragment.contains("float ao = texture(sampler2D(t1, s1), v_screen_pos).x;"));
    validate_bundle(&program.bundle, Dialect::Glsl).unwrap();

    let mut g = Graph::new();
    let screen = g.add_node(NodeKind::ScreenSample);
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(screen, out, 0, false, Swizzle::IDENTITY).unwrap();
    let program = shadegraph::compile_uncached(&g, &context(), Dialect::Glsl).unwrap();
    assert!(program
        .bundle
        .fragment
        .contains("vec4 r0 = texture(sampler2D(t0, s0), v_screen_pos);"));
    validate_bundle(&program.bundle, Dialect::Glsl).unwrap();
}

#[test]
fn recompilation_hits_the_cache_and_shares_the_program() {
    let compiler = Compiler::new();
    let ctx = context();
    let (first, hit1) = compiler
        .compile(&tinted_sample_graph(), &ctx, Dialect::Wgsl)
        .unwrap();
    // A freshly built but structurally identical graph must hit too.
    let (second, hit2) = compiler
        .compile(&tinted_sample_graph(), &ctx, Dialect::Wgsl)
        .unwrap();
    assert!(!hit1);
    assert!(hit2);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.cache().len(), 1);
}

#[test]
fn context_flags_produce_distinct_programs() {
    let compiler = Compiler::new();
    let plain = context();
    let mut occluded = context();
    occluded.ambient_occlusion = true;

    let g = tinted_sample_graph();
    assert_ne!(signature(&g, &plain).unwrap(), signature(&g, &occluded).unwrap());

    let (a, _) = compiler.compile(&g, &plain, Dialect::Wgsl).unwrap();
    let (b, hit) = compiler.compile(&g, &occluded, Dialect::Wgsl).unwrap();
    assert!(!hit);
    assert!(!a.bundle.fragment.contains("* ao;"));
    assert!(b.bundle.fragment.contains("* ao;"));
    validate_bundle(&b.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn literal_differences_never_share_a_cache_slot() {
    let mut a = Graph::new();
    let c = a.add_node(NodeKind::ScalarConstant { value: 0.5 });
    let out = a.add_node(NodeKind::OutputColor);
    a.connect(c, out, 0, false, Swizzle::IDENTITY).unwrap();

    let mut b = Graph::new();
    let c = b.add_node(NodeKind::ScalarConstant { value: 0.75 });
    let out = b.add_node(NodeKind::OutputColor);
    b.connect(c, out, 0, false, Swizzle::IDENTITY).unwrap();

    let ctx = context();
    assert_ne!(signature(&a, &ctx).unwrap(), signature(&b, &ctx).unwrap());

    let compiler = Compiler::new();
    compiler.compile(&a, &ctx, Dialect::Wgsl).unwrap();
    let (_, hit) = compiler.compile(&b, &ctx, Dialect::Wgsl).unwrap();
    assert!(!hit);
    assert_eq!(compiler.cache().len(), 2);
}

#[test]
fn directional_lighting_expands_and_validates() {
    let compiler = Compiler::new();
    let (program, _) = compiler.compile(&lit_graph(), &context(), Dialect::Wgsl).unwrap();

    let fragment = &program.bundle.fragment;
    assert!(fragment.contains("normalize(in.v_normal)"));
    assert!(fragment.contains("normalize(globals.light_dir)"));
    assert!(fragment.contains("pow(max(dot("));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn point_lighting_reads_the_light_vector_varying() {
    let mut ctx = context();
    ctx.light = LightKind::Point;
    let program = shadegraph::compile_uncached(&lit_graph(), &ctx, Dialect::Wgsl).unwrap();
    assert!(program.bundle.fragment.contains("normalize(in.v_light_vec)"));
    assert!(program
        .bundle
        .vertex
        .contains("out.v_light_vec = globals.light_pos - world_pos;"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn disabling_the_light_collapses_lighting_terms() {
    let mut ctx = context();
    ctx.light = LightKind::None;
    let program = shadegraph::compile_uncached(&lit_graph(), &ctx, Dialect::Wgsl).unwrap();
    let fragment = &program.bundle.fragment;
    assert!(fragment.contains("let r0 = 1.0;") || fragment.contains("let r1 = 1.0;"));
    assert!(!fragment.contains("normalize("));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn single_input_add_passes_through_without_a_register() {
    let mut g = Graph::new();
    let c = g.add_node(NodeKind::ConstantColor {
        rgba: [0.1, 0.2, 0.3, 1.0],
    });
    let add = g.add_node(NodeKind::Add);
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(c, add, 0, false, Swizzle::IDENTITY).unwrap();
    g.connect(add, out, 0, false, Swizzle::IDENTITY).unwrap();

    let program = shadegraph::compile_uncached(&g, &context(), Dialect::Wgsl).unwrap();
    assert_eq!(program.allocation.register_count, 0);
    assert!(program.bundle.fragment.contains("return k0;"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn fog_wraps_the_shaded_color() {
    let mut g = Graph::new();
    let base = g.add_node(NodeKind::ConstantColor {
        rgba: [0.2, 0.6, 0.2, 1.0],
    });
    let fog = g.add_node(NodeKind::Fog {
        density: 0.02,
        color: [0.7, 0.8, 0.9, 1.0],
    });
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(base, fog, 0, false, Swizzle::IDENTITY).unwrap();
    g.connect(fog, out, 0, false, Swizzle::IDENTITY).unwrap();

    let program = shadegraph::compile_uncached(&g, &context(), Dialect::Wgsl).unwrap();
    let fragment = &program.bundle.fragment;
    assert!(fragment.contains("clamp(exp(-k"));
    assert!(fragment.contains("length(in.v_view_dir)"));
    assert!(fragment.contains("mix(k"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn swizzle_and_negate_survive_the_whole_pipeline() {
    let mut g = Graph::new();
    let c = g.add_node(NodeKind::ConstantColor {
        rgba: [0.9, 0.1, 0.4, 1.0],
    });
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(c, out, 0, true, Swizzle::from_letters("bgra").unwrap())
        .unwrap();

    let program = shadegraph::compile_uncached(&g, &context(), Dialect::Wgsl).unwrap();
    // Color letters canonicalize to positional ones.
    assert!(program.bundle.fragment.contains("return -k0.zyxw;"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn low_detail_folds_noise_to_a_constant() {
    let mut g = Graph::new();
    let noise = g.add_node(NodeKind::NoiseSample);
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(noise, out, 0, false, Swizzle::IDENTITY).unwrap();

    let mut low = context();
    low.detail = shadegraph::DetailLevel::Low;
    let program = shadegraph::compile_uncached(&g, &low, Dialect::Wgsl).unwrap();
    assert!(program.allocation.textures.is_empty());
    assert!(program.bundle.fragment.contains("return k0;"));

    let high = context();
    let program = shadegraph::compile_uncached(&g, &high, Dialect::Wgsl).unwrap();
    assert_eq!(program.allocation.textures.len(), 1);
    assert!(program.bundle.fragment.contains("textureSample(t0, s0, in.v_uv0)"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}

#[test]
fn compressed_normal_maps_reconstruct_z() {
    let mut g = Graph::new();
    let normal_map = g.add_node(NodeKind::TextureSample {
        texture: TextureRef {
            id: 3,
            format: PixelFormat::NormalCompressed,
            target: TextureTarget::D2,
        },
    });
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(normal_map, out, 0, false, Swizzle::IDENTITY).unwrap();

    let program = shadegraph::compile_uncached(&g, &context(), Dialect::Wgsl).unwrap();
    let fragment = &program.bundle.fragment;
    assert!(fragment.contains("let r0_nxy = textureSample(t0, s0, in.v_uv0).xy * 2.0 - 1.0;"));
    assert!(fragment.contains("sqrt(max(0.0, 1.0 - dot(r0_nxy, r0_nxy)))"));
    validate_bundle(&program.bundle, Dialect::Wgsl).unwrap();
}
