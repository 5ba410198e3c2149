use serde_json::json;

use shadegraph::algebra::Swizzle;
use shadegraph::context::{PixelFormat, TextureTarget};
use shadegraph::error::CompileError;
use shadegraph::kinds::NodeKind;
use shadegraph::{serialize, CompileContext, Dialect, Graph, SharedTextures, TextureRef};

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

fn material_graph() -> Graph {
    let mut g = Graph::new();
    let tint = g.add_node(NodeKind::MaterialParam {
        name: "tint".to_string(),
    });
    let sample = g.add_node(NodeKind::TextureSample {
        texture: TextureRef {
            id: 5,
            format: PixelFormat::Rgba8Srgb,
            target: TextureTarget::D2,
        },
    });
    let diffuse = g.add_node(NodeKind::DiffuseLight);
    let mul = g.add_node(NodeKind::Multiply);
    let shaded = g.add_node(NodeKind::Multiply);
    let out = g.add_node(NodeKind::OutputColor);
    g.connect(tint, mul, 0, true, Swizzle::from_letters("rgba").unwrap())
        .unwrap();
    g.connect(sample, mul, 1, false, Swizzle::broadcast(3)).unwrap();
    g.connect(mul, shaded, 0, false, Swizzle::IDENTITY).unwrap();
    g.connect(diffuse, shaded, 1, false, Swizzle::IDENTITY).unwrap();
    g.connect(shaded, out, 0, false, Swizzle::IDENTITY).unwrap();
    g
}

#[test]
fn saving_twice_is_byte_identical() {
    let first = serialize::to_json(&material_graph()).unwrap();
    let reloaded = serialize::from_json(&first).unwrap();
    let second = serialize::to_json(&reloaded).unwrap();
    assert_eq!(first, second);
}

#[test]
fn a_reloaded_graph_compiles_to_the_same_program() {
    let original = material_graph();
    let reloaded = serialize::from_json(&serialize::to_json(&original).unwrap()).unwrap();

    let ctx = context();
    assert_eq!(
        shadegraph::signature(&original, &ctx).unwrap(),
        shadegraph::signature(&reloaded, &ctx).unwrap()
    );
    let a = shadegraph::compile_uncached(&original, &ctx, Dialect::Wgsl).unwrap();
    let b = shadegraph::compile_uncached(&reloaded, &ctx, Dialect::Wgsl).unwrap();
    assert_eq!(a.bundle.fragment, b.bundle.fragment);
    assert_eq!(a.bundle.vertex, b.bundle.vertex);
}

#[test]
fn foreign_nodes_survive_a_save_and_stay_out_of_compiles() {
    let mut g = material_graph();
    let mut params = serde_json::Map::new();
    params.insert("strength".to_string(), json!(0.35));
    params.insert("mode".to_string(), json!("screen"));
    g.add_node(NodeKind::Unknown {
        tag: "LensFlare".to_string(),
        params,
    });

    let first = serialize::to_json(&g).unwrap();
    let reloaded = serialize::from_json(&first).unwrap();
    assert_eq!(first, serialize::to_json(&reloaded).unwrap());

    // Off to the side of the output, the foreign node is harmless.
    let ctx = context();
    assert!(shadegraph::compile_uncached(&reloaded, &ctx, Dialect::Wgsl).is_ok());

    // Wired into the program, it must refuse to compile.
    let mut wired = reloaded.clone();
    let unknown = wired
        .nodes()
        .find(|(_, n)| matches!(n.kind, NodeKind::Unknown { .. }))
        .map(|(id, _)| id)
        .unwrap();
    let mul = wired
        .nodes()
        .find(|(_, n)| matches!(n.kind, NodeKind::Multiply))
        .map(|(id, _)| id)
        .unwrap();
    // Unknown kinds accept edges on any port, so wiring one in is legal.
    wired
        .connect(mul, unknown, 0, false, Swizzle::IDENTITY)
        .unwrap();
    let out = wired
        .nodes()
        .find(|(_, n)| matches!(n.kind, NodeKind::OutputColor))
        .map(|(id, _)| id)
        .unwrap();
    wired.disconnect(out, 0).unwrap();
    wired
        .connect(unknown, out, 0, false, Swizzle::IDENTITY)
        .unwrap();
    assert!(matches!(
        shadegraph::compile_uncached(&wired, &ctx, Dialect::Wgsl),
        Err(CompileError::UnknownKind { .. })
    ));
}

#[test]
fn editor_metadata_round_trips() {
    let mut g = material_graph();
    let (id, _) = g.nodes().next().unwrap();
    {
        let node = g.node_mut(id).unwrap();
        node.comment = "base tint from the asset pipeline".to_string();
        node.position = [120.0, -48.5];
    }
    let reloaded = serialize::from_json(&serialize::to_json(&g).unwrap()).unwrap();
    let node = reloaded.node(id).unwrap();
    assert_eq!(node.comment, "base tint from the asset pipeline");
    assert_eq!(node.position, [120.0, -48.5]);
}
