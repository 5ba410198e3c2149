//! The node-kind roster and the per-kind dispatch surface.
//!
//! Each kind answers four questions: what ports it exposes, what resources it
//! pulls in (`generate_data`), what it contributes to the structural signature
//! (`signature_extras`), and what statements it emits (`templates`). The
//! per-family modules hold the actual logic; this module owns the types and
//! the match-based dispatch.

pub mod input_nodes;
pub mod interpolant_nodes;
pub mod lighting_nodes;
pub mod math_nodes;
pub mod output_nodes;
pub mod texture_nodes;

pub use interpolant_nodes::Interpolant;

use crate::context::{CompileContext, Dialect, LightKind, TextureRef};
use crate::error::CompileError;
use crate::graph::{Graph, NodeId, PortIndex};
use crate::schedule::Allocation;
use crate::signature::push_str_words;

/// Quantities synthesized on demand by dependency expansion rather than
/// wired explicitly by the author.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Derived {
    Normal,
    ViewDir,
    LightDir,
    HalfDir,
}

impl Derived {
    /// Quantities this quantity itself depends on, in derived-port order.
    pub fn requests(self) -> &'static [Derived] {
        match self {
            Derived::HalfDir => &[Derived::ViewDir, Derived::LightDir],
            _ => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Derived::Normal => "normal",
            Derived::ViewDir => "view_dir",
            Derived::LightDir => "light_dir",
            Derived::HalfDir => "half_dir",
        }
    }

    pub fn from_name(name: &str) -> Option<Derived> {
        match name {
            "normal" => Some(Derived::Normal),
            "view_dir" => Some(Derived::ViewDir),
            "light_dir" => Some(Derived::LightDir),
            "half_dir" => Some(Derived::HalfDir),
            _ => None,
        }
    }

    pub(crate) fn tag(self) -> u32 {
        match self {
            Derived::Normal => 0,
            Derived::ViewDir => 1,
            Derived::LightDir => 2,
            Derived::HalfDir => 3,
        }
    }
}

/// Coarse classification used by expansion and scheduling.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BaseKind {
    /// Fixed value folded into the program text.
    Constant,
    /// Engine-supplied uniform value.
    Param,
    /// Samples a bound texture.
    TextureMap,
    /// Reads a vertex-stage interpolated value.
    Interpolant,
    /// Synthesized by dependency expansion.
    Derived,
    /// Ordinary computing operation.
    Op,
    /// Program root; exactly one may be reachable.
    Terminal,
    /// Preserved payload from a newer format; cannot compile.
    Unknown,
}

/// One declared input port.
#[derive(Clone, Copy, Debug)]
pub struct PortSpec {
    pub name: &'static str,
    /// Optional ports may be left unconnected; the kind substitutes a
    /// default or passes the other operand through.
    pub optional: bool,
}

const fn port(name: &'static str, optional: bool) -> PortSpec {
    PortSpec { name, optional }
}

const NO_PORTS: &[PortSpec] = &[];
const UV_PORT: &[PortSpec] = &[port("uv", true)];
const ADD_PORTS: &[PortSpec] = &[port("a", true), port("b", true)];
const BINARY_PORTS: &[PortSpec] = &[port("a", false), port("b", false)];
const MIX_PORTS: &[PortSpec] = &[port("a", false), port("b", false), port("t", false)];
const COLOR_PORT: &[PortSpec] = &[port("color", false)];

/// Everything a node can be.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    ConstantColor { rgba: [f32; 4] },
    ScalarConstant { value: f32 },
    MaterialParam { name: String },
    TexCoord { set: u8 },
    VertexColor,
    TextureSample { texture: TextureRef },
    ScreenSample,
    NoiseSample,
    Add,
    Multiply,
    Dot,
    Mix,
    DiffuseLight,
    SpecularLight { shininess: f32 },
    Fog { density: f32, color: [f32; 4] },
    DerivedQuantity { quantity: Derived },
    OutputColor,
    /// A kind tag this build does not understand, with its raw parameters.
    /// Round-trips through serialization untouched.
    Unknown {
        tag: String,
        params: serde_json::Map<String, serde_json::Value>,
    },
}

impl NodeKind {
    /// Stable serialization tag.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::ConstantColor { .. } => "ConstantColor",
            NodeKind::ScalarConstant { .. } => "ScalarConstant",
            NodeKind::MaterialParam { .. } => "MaterialParam",
            NodeKind::TexCoord { .. } => "TexCoord",
            NodeKind::VertexColor => "VertexColor",
            NodeKind::TextureSample { .. } => "TextureSample",
            NodeKind::ScreenSample => "ScreenSample",
            NodeKind::NoiseSample => "NoiseSample",
            NodeKind::Add => "Add",
            NodeKind::Multiply => "Multiply",
            NodeKind::Dot => "Dot",
            NodeKind::Mix => "Mix",
            NodeKind::DiffuseLight => "DiffuseLight",
            NodeKind::SpecularLight { .. } => "SpecularLight",
            NodeKind::Fog { .. } => "Fog",
            NodeKind::DerivedQuantity { .. } => "Derived",
            NodeKind::OutputColor => "OutputColor",
            NodeKind::Unknown { tag, .. } => tag,
        }
    }

    pub fn base(&self) -> BaseKind {
        match self {
            NodeKind::ConstantColor { .. } | NodeKind::ScalarConstant { .. } => BaseKind::Constant,
            NodeKind::MaterialParam { .. } => BaseKind::Param,
            NodeKind::TexCoord { .. } | NodeKind::VertexColor => BaseKind::Interpolant,
            NodeKind::TextureSample { .. } | NodeKind::ScreenSample | NodeKind::NoiseSample => {
                BaseKind::TextureMap
            }
            NodeKind::Add
            | NodeKind::Multiply
            | NodeKind::Dot
            | NodeKind::Mix
            | NodeKind::DiffuseLight
            | NodeKind::SpecularLight { .. }
            | NodeKind::Fog { .. } => BaseKind::Op,
            NodeKind::DerivedQuantity { .. } => BaseKind::Derived,
            NodeKind::OutputColor => BaseKind::Terminal,
            NodeKind::Unknown { .. } => BaseKind::Unknown,
        }
    }

    /// Explicit (author-wired) input ports.
    pub fn ports(&self) -> &'static [PortSpec] {
        match self {
            NodeKind::TextureSample { .. } | NodeKind::NoiseSample => UV_PORT,
            NodeKind::Add => ADD_PORTS,
            NodeKind::Multiply | NodeKind::Dot => BINARY_PORTS,
            NodeKind::Mix => MIX_PORTS,
            NodeKind::Fog { .. } | NodeKind::OutputColor => COLOR_PORT,
            _ => NO_PORTS,
        }
    }

    /// Stable numeric tag for the signature. Unknown kinds never reach the
    /// signature generator.
    pub(crate) fn tag(&self) -> u32 {
        match self {
            NodeKind::ConstantColor { .. } => 1,
            NodeKind::ScalarConstant { .. } => 2,
            NodeKind::MaterialParam { .. } => 3,
            NodeKind::TexCoord { .. } => 4,
            NodeKind::VertexColor => 5,
            NodeKind::TextureSample { .. } => 6,
            NodeKind::ScreenSample => 7,
            NodeKind::NoiseSample => 8,
            NodeKind::Add => 9,
            NodeKind::Multiply => 10,
            NodeKind::Dot => 11,
            NodeKind::Mix => 12,
            NodeKind::DiffuseLight => 13,
            NodeKind::SpecularLight { .. } => 14,
            NodeKind::Fog { .. } => 15,
            NodeKind::DerivedQuantity { .. } => 16,
            NodeKind::OutputColor => 17,
            NodeKind::Unknown { .. } => u32::MAX,
        }
    }
}

/// A deduplicated constant. Bit patterns rather than floats, so `-0.0` and
/// `0.0` intern separately and `NaN` payloads compare exactly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Literal {
    Scalar(u32),
    Vec4([u32; 4]),
}

impl Literal {
    pub fn scalar(v: f32) -> Literal {
        Literal::Scalar(v.to_bits())
    }

    pub fn vec4(v: [f32; 4]) -> Literal {
        Literal::Vec4(v.map(f32::to_bits))
    }

    pub fn width(&self) -> usize {
        match self {
            Literal::Scalar(_) => 1,
            Literal::Vec4(_) => 4,
        }
    }
}

/// What a node needs from the surrounding program, gathered during
/// scheduling.
#[derive(Clone, Debug, Default)]
pub struct NodeData {
    /// Emits one or more statements producing a fresh register.
    pub needs_register: bool,
    /// Forwards its single connected input without emitting anything.
    pub passthrough: bool,
    /// Extra scratch identifiers the templates use beyond the register.
    pub temporaries: u16,
    pub interpolants: Vec<Interpolant>,
    pub literals: Vec<(&'static str, Literal)>,
    pub textures: Vec<TextureRef>,
    pub params: Vec<String>,
}

impl NodeData {
    pub(crate) fn register() -> NodeData {
        NodeData {
            needs_register: true,
            ..NodeData::default()
        }
    }

    pub(crate) fn inline() -> NodeData {
        NodeData::default()
    }
}

/// Derived quantities a node's templates consume, in derived-port order.
pub(crate) fn derived_requests(kind: &NodeKind, ctx: &CompileContext) -> Vec<Derived> {
    match kind {
        NodeKind::DiffuseLight if ctx.light == LightKind::None => Vec::new(),
        NodeKind::DiffuseLight => vec![Derived::Normal, Derived::LightDir],
        NodeKind::SpecularLight { .. } if ctx.light == LightKind::None => Vec::new(),
        NodeKind::SpecularLight { .. } => vec![Derived::Normal, Derived::HalfDir],
        NodeKind::DerivedQuantity { quantity } => quantity.requests().to_vec(),
        _ => Vec::new(),
    }
}

/// Per-kind contribution to the structural signature: every parameter that
/// can change the emitted text, as raw words.
pub(crate) fn signature_extras(kind: &NodeKind, ctx: &CompileContext, out: &mut Vec<u32>) {
    match kind {
        NodeKind::ConstantColor { rgba } => out.extend(rgba.iter().map(|v| v.to_bits())),
        NodeKind::ScalarConstant { value } => out.push(value.to_bits()),
        NodeKind::MaterialParam { name } => push_str_words(out, name),
        NodeKind::TexCoord { set } => out.push(*set as u32),
        NodeKind::TextureSample { texture } => texture.signature_words(out),
        NodeKind::NoiseSample => {
            out.push((ctx.detail == crate::context::DetailLevel::Low) as u32)
        }
        NodeKind::DiffuseLight => {
            out.push(ctx.light.tag());
            out.push((ctx.shadows as u32) | ((ctx.two_sided as u32) << 1));
        }
        NodeKind::SpecularLight { shininess } => {
            out.push(ctx.light.tag());
            out.push(shininess.to_bits());
        }
        NodeKind::Fog { density, color } => {
            out.push(density.to_bits());
            out.extend(color.iter().map(|v| v.to_bits()));
        }
        NodeKind::DerivedQuantity { quantity } => {
            out.push(quantity.tag());
            out.push(ctx.light.tag());
        }
        NodeKind::OutputColor => out.push(ctx.ambient_occlusion as u32),
        _ => {}
    }
}

/// Parameter equality for structural node comparison. Floats compare by bit
/// pattern so two nodes are equal only when their text would be.
pub fn structurally_equal(a: &NodeKind, b: &NodeKind) -> bool {
    use NodeKind::*;
    fn bits4(v: &[f32; 4]) -> [u32; 4] {
        v.map(f32::to_bits)
    }
    match (a, b) {
        (ConstantColor { rgba: x }, ConstantColor { rgba: y }) => bits4(x) == bits4(y),
        (ScalarConstant { value: x }, ScalarConstant { value: y }) => x.to_bits() == y.to_bits(),
        (SpecularLight { shininess: x }, SpecularLight { shininess: y }) => {
            x.to_bits() == y.to_bits()
        }
        (Fog { density: dx, color: cx }, Fog { density: dy, color: cy }) => {
            dx.to_bits() == dy.to_bits() && bits4(cx) == bits4(cy)
        }
        _ => a == b,
    }
}

/// Carried width of the value arriving at `(node, port)`, after the edge
/// routing. `None` when the port is unconnected.
pub(crate) fn input_width(
    graph: &Graph,
    node: NodeId,
    port: PortIndex,
) -> Result<Option<usize>, CompileError> {
    match graph.edge_at(node, port) {
        Some(edge) => {
            let source = output_width(graph, edge.from)?;
            Ok(Some(edge.routing().carried_size(source)))
        }
        None => Ok(None),
    }
}

pub(crate) fn require_input(
    graph: &Graph,
    node: NodeId,
    kind: &NodeKind,
    port: PortIndex,
) -> Result<usize, CompileError> {
    input_width(graph, node, port)?.ok_or(CompileError::MissingInput {
        node,
        kind: kind_name_static(kind),
        port,
    })
}

/// `NodeKind::name` narrowed to the static tags; unknown kinds are rejected
/// before any path that needs this.
pub(crate) fn kind_name_static(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::ConstantColor { .. } => "ConstantColor",
        NodeKind::ScalarConstant { .. } => "ScalarConstant",
        NodeKind::MaterialParam { .. } => "MaterialParam",
        NodeKind::TexCoord { .. } => "TexCoord",
        NodeKind::VertexColor => "VertexColor",
        NodeKind::TextureSample { .. } => "TextureSample",
        NodeKind::ScreenSample => "ScreenSample",
        NodeKind::NoiseSample => "NoiseSample",
        NodeKind::Add => "Add",
        NodeKind::Multiply => "Multiply",
        NodeKind::Dot => "Dot",
        NodeKind::Mix => "Mix",
        NodeKind::DiffuseLight => "DiffuseLight",
        NodeKind::SpecularLight { .. } => "SpecularLight",
        NodeKind::Fog { .. } => "Fog",
        NodeKind::DerivedQuantity { .. } => "Derived",
        NodeKind::OutputColor => "OutputColor",
        NodeKind::Unknown { .. } => "Unknown",
    }
}

/// Width of the value a node produces.
pub(crate) fn output_width(graph: &Graph, id: NodeId) -> Result<usize, CompileError> {
    let node = graph
        .node(id)
        .ok_or(CompileError::Graph(crate::error::GraphError::MissingNode(id)))?;
    match &node.kind {
        NodeKind::ConstantColor { .. }
        | NodeKind::MaterialParam { .. }
        | NodeKind::VertexColor
        | NodeKind::TextureSample { .. }
        | NodeKind::ScreenSample
        | NodeKind::NoiseSample
        | NodeKind::Fog { .. }
        | NodeKind::OutputColor => Ok(4),
        NodeKind::ScalarConstant { .. }
        | NodeKind::Dot
        | NodeKind::DiffuseLight
        | NodeKind::SpecularLight { .. } => Ok(1),
        NodeKind::TexCoord { .. } => Ok(2),
        NodeKind::DerivedQuantity { .. } => Ok(3),
        NodeKind::Add => math_nodes::add_width(graph, id, &node.kind),
        NodeKind::Multiply | NodeKind::Mix => math_nodes::binary_op_width(graph, id, &node.kind),
        NodeKind::Unknown { tag, .. } => Err(CompileError::UnknownKind {
            node: id,
            tag: tag.clone(),
        }),
    }
}

/// Resources and scheduling shape for one node under one context.
pub(crate) fn generate_data(
    graph: &Graph,
    id: NodeId,
    ctx: &CompileContext,
) -> Result<NodeData, CompileError> {
    let node = graph
        .node(id)
        .ok_or(CompileError::Graph(crate::error::GraphError::MissingNode(id)))?;
    match &node.kind {
        NodeKind::ConstantColor { rgba } => Ok(input_nodes::constant_color_data(*rgba)),
        NodeKind::ScalarConstant { value } => Ok(input_nodes::scalar_constant_data(*value)),
        NodeKind::MaterialParam { name } => Ok(input_nodes::material_param_data(name)),
        NodeKind::TexCoord { set } => Ok(interpolant_nodes::tex_coord_data(*set)),
        NodeKind::VertexColor => Ok(interpolant_nodes::vertex_color_data()),
        NodeKind::TextureSample { texture } => {
            texture_nodes::texture_sample_data(graph, id, &node.kind, *texture)
        }
        NodeKind::ScreenSample => Ok(texture_nodes::screen_sample_data(ctx)),
        NodeKind::NoiseSample => texture_nodes::noise_sample_data(graph, id, &node.kind, ctx),
        NodeKind::Add => math_nodes::add_data(graph, id, &node.kind),
        NodeKind::Multiply | NodeKind::Mix | NodeKind::Dot => {
            math_nodes::strict_op_data(graph, id, &node.kind)
        }
        NodeKind::DiffuseLight => Ok(lighting_nodes::diffuse_data(ctx)),
        NodeKind::SpecularLight { shininess } => Ok(lighting_nodes::specular_data(ctx, *shininess)),
        NodeKind::Fog { density, color } => Ok(lighting_nodes::fog_data(*density, *color)),
        NodeKind::DerivedQuantity { quantity } => lighting_nodes::derived_data(id, *quantity, ctx),
        NodeKind::OutputColor => output_nodes::output_color_data(graph, id, &node.kind, ctx),
        NodeKind::Unknown { tag, .. } => Err(CompileError::UnknownKind {
            node: id,
            tag: tag.clone(),
        }),
    }
}

/// Statement templates for one node, in emission order. Kinds whose data is
/// inline return no templates.
pub(crate) fn templates(
    graph: &Graph,
    id: NodeId,
    ctx: &CompileContext,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    let node = graph
        .node(id)
        .ok_or(CompileError::Graph(crate::error::GraphError::MissingNode(id)))?;
    match &node.kind {
        NodeKind::TextureSample { texture } => {
            texture_nodes::texture_sample_templates(graph, id, *texture, dialect, alloc)
        }
        NodeKind::ScreenSample => texture_nodes::screen_sample_templates(id, ctx, dialect, alloc),
        NodeKind::NoiseSample => texture_nodes::noise_sample_templates(graph, id, ctx, dialect, alloc),
        NodeKind::Add | NodeKind::Multiply | NodeKind::Dot | NodeKind::Mix => {
            math_nodes::op_templates(graph, id, &node.kind, dialect)
        }
        NodeKind::DiffuseLight => Ok(lighting_nodes::diffuse_templates(ctx, dialect)),
        NodeKind::SpecularLight { .. } => Ok(lighting_nodes::specular_templates(ctx, dialect)),
        NodeKind::Fog { .. } => lighting_nodes::fog_templates(graph, id, &node.kind, dialect),
        NodeKind::DerivedQuantity { quantity } => {
            lighting_nodes::derived_templates(id, *quantity, ctx, dialect)
        }
        NodeKind::OutputColor => output_nodes::output_color_templates(graph, id, ctx, dialect, alloc),
        _ => Ok(Vec::new()),
    }
}

/// Dialect spelling of an n-wide float type.
pub(crate) fn type_name(dialect: Dialect, width: usize) -> &'static str {
    match (dialect, width) {
        (Dialect::Wgsl, 1) => "f32",
        (Dialect::Wgsl, 2) => "vec2f",
        (Dialect::Wgsl, 3) => "vec3f",
        (Dialect::Wgsl, _) => "vec4f",
        (Dialect::Glsl, 1) => "float",
        (Dialect::Glsl, 2) => "vec2",
        (Dialect::Glsl, 3) => "vec3",
        (Dialect::Glsl, _) => "vec4",
    }
}

/// Opening of a register-binding statement: `let # = ` in WGSL, a typed
/// declaration in GLSL.
pub(crate) fn decl(dialect: Dialect, width: usize) -> String {
    match dialect {
        Dialect::Wgsl => "let # = ".to_string(),
        Dialect::Glsl => format!("{} # = ", type_name(dialect, width)),
    }
}

/// Like [`decl`] but for a named scratch temporary (`#_nxy` style).
pub(crate) fn decl_named(dialect: Dialect, width: usize, suffix: &str) -> String {
    match dialect {
        Dialect::Wgsl => format!("let #_{suffix} = "),
        Dialect::Glsl => format!("{} #_{suffix} = ", type_name(dialect, width)),
    }
}

/// Wraps an expression of the given width into a vec4 color, padding the
/// missing channels the way the fixed pipeline would.
pub(crate) fn coerce_vec4(dialect: Dialect, expr: &str, width: usize) -> String {
    let ctor = type_name(dialect, 4);
    match width {
        4 => expr.to_string(),
        3 => format!("{ctor}({expr}, 1.0)"),
        2 => format!("{ctor}({expr}, 0.0, 1.0)"),
        _ => format!("{ctor}({expr}, {expr}, {expr}, 1.0)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_tables_are_static_and_match_their_kinds() {
        assert_eq!(NodeKind::Add.ports().len(), 2);
        assert!(NodeKind::Add.ports().iter().all(|p| p.optional));
        assert_eq!(NodeKind::Mix.ports().len(), 3);
        assert!(NodeKind::Mix.ports().iter().all(|p| !p.optional));
        assert_eq!(NodeKind::OutputColor.ports().len(), 1);
        assert_eq!(NodeKind::NoiseSample.ports()[0].name, "uv");
        assert!(NodeKind::VertexColor.ports().is_empty());
    }

    #[test]
    fn structural_equality_is_bitwise_on_floats() {
        let a = NodeKind::ScalarConstant { value: 0.0 };
        let b = NodeKind::ScalarConstant { value: -0.0 };
        assert!(!structurally_equal(&a, &b));
        assert!(structurally_equal(&a, &a.clone()));
    }

    #[test]
    fn half_dir_requests_its_operands() {
        assert_eq!(
            Derived::HalfDir.requests(),
            &[Derived::ViewDir, Derived::LightDir]
        );
        assert!(Derived::Normal.requests().is_empty());
    }

    #[test]
    fn lights_request_nothing_without_a_light() {
        let shared = crate::context::SharedTextures {
            screen: TextureRef {
                id: 0,
                format: crate::context::PixelFormat::Rgba8,
                target: crate::context::TextureTarget::D2,
            },
            noise: TextureRef {
                id: 1,
                format: crate::context::PixelFormat::Rgba8,
                target: crate::context::TextureTarget::D2,
            },
        };
        let mut ctx = CompileContext::new(shared);
        assert_eq!(
            derived_requests(&NodeKind::DiffuseLight, &ctx),
            vec![Derived::Normal, Derived::LightDir]
        );
        ctx.light = LightKind::None;
        assert!(derived_requests(&NodeKind::DiffuseLight, &ctx).is_empty());
        assert!(derived_requests(&NodeKind::SpecularLight { shininess: 8.0 }, &ctx).is_empty());
    }

    #[test]
    fn coercion_pads_toward_vec4() {
        assert_eq!(coerce_vec4(Dialect::Wgsl, "%0", 4), "%0");
        assert_eq!(coerce_vec4(Dialect::Wgsl, "%0", 3), "vec4f(%0, 1.0)");
        assert_eq!(coerce_vec4(Dialect::Glsl, "%0", 1), "vec4(%0, %0, %0, 1.0)");
    }
}
