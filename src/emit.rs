//! Source emission: turns a scheduled allocation into shader text.
//!
//! Node templates use a small placeholder language. `#` names the node's own
//! register, `%N` its Nth input (explicit ports first, then derived ports),
//! `$name` an interpolant varying and `&name` a literal the node interned.
//! Substitution resolves `%N` through passthrough nodes by composing the
//! edge routings, then formats the final `[-]base[.letters]` identifier.

use std::fmt::Write as _;

use crate::algebra::format_ident;
use crate::context::{CompileContext, Dialect, TextureTarget};
use crate::error::CompileError;
use crate::graph::{Edge, Graph, NodeId, PortIndex, DERIVED_PORT_BASE};
use crate::kinds::{self, Interpolant, Literal, NodeKind};
use crate::schedule::{Allocation, RegisterAssign};

/// Emitted text for one program. WGSL keeps both entry points in one module;
/// GLSL stages are separate translation units.
#[derive(Clone, Debug)]
pub struct ProgramBundle {
    pub vertex: String,
    pub fragment: String,
    pub module: Option<String>,
}

/// Formats an f32 for embedding in source text: fixed precision, trailing
/// zeros stripped.
pub(crate) fn fmt_f32(v: f32) -> String {
    if v.is_finite() {
        let s = format!("{v:.9}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        "0.0".to_string()
    }
}

fn varying_ref(dialect: Dialect, q: Interpolant) -> String {
    match dialect {
        Dialect::Wgsl => format!("in.{}", q.var()),
        Dialect::Glsl => q.var(),
    }
}

/// Base identifier for a node whose value is folded into consumers.
fn inline_ident(
    graph: &Graph,
    id: NodeId,
    alloc: &Allocation,
    dialect: Dialect,
) -> Result<String, CompileError> {
    let node = graph
        .node(id)
        .ok_or(CompileError::Graph(crate::error::GraphError::MissingNode(id)))?;
    let missing = |name: &str| CompileError::BadPlaceholder {
        node: id,
        placeholder: name.to_string(),
    };
    match &node.kind {
        NodeKind::ConstantColor { .. } | NodeKind::ScalarConstant { .. } => {
            let slot = alloc.literal_index(id, "c").ok_or_else(|| missing("c"))?;
            Ok(format!("k{slot}"))
        }
        NodeKind::NoiseSample => {
            let slot = alloc
                .literal_index(id, "flat")
                .ok_or_else(|| missing("flat"))?;
            Ok(format!("k{slot}"))
        }
        NodeKind::MaterialParam { name } => Ok(format!("material.{name}")),
        NodeKind::TexCoord { set } => {
            let q = if *set == 0 {
                Interpolant::Uv0
            } else {
                Interpolant::Uv1
            };
            Ok(varying_ref(dialect, q))
        }
        NodeKind::VertexColor => Ok(varying_ref(dialect, Interpolant::Color)),
        other => Err(missing(kinds::kind_name_static(other))),
    }
}

/// Resolves the routed identifier for the value an edge delivers, chasing
/// passthrough nodes and composing their routings along the way.
fn resolve_edge(
    graph: &Graph,
    edge: &Edge,
    alloc: &Allocation,
    dialect: Dialect,
) -> Result<String, CompileError> {
    let consumer = edge.to;
    let mut routing = edge.routing();
    let mut source = edge.from;
    loop {
        let assign = alloc
            .assign(source)
            .ok_or(CompileError::BadPlaceholder {
                node: consumer,
                placeholder: format!("unscheduled input {source}"),
            })?
            .assign;
        if assign != RegisterAssign::PassThrough {
            break;
        }
        let inner = graph
            .incoming(source)
            .find(|e| !e.is_order_only())
            .ok_or(CompileError::BadPlaceholder {
                node: source,
                placeholder: "passthrough input".to_string(),
            })?;
        routing = inner.routing().then(routing);
        source = inner.from;
    }

    let base_width = kinds::output_width(graph, source)?;
    let base = match alloc
        .assign(source)
        .map(|a| a.assign)
        .unwrap_or(RegisterAssign::Inline)
    {
        RegisterAssign::Register(n) => format!("r{n}"),
        _ => inline_ident(graph, source, alloc, dialect)?,
    };

    let size = routing.carried_size(base_width);
    if !routing.swizzle.is_identity() {
        for &slot in routing.swizzle.0.iter().take(size) {
            if slot as usize >= base_width {
                return Err(CompileError::SwizzleOutOfRange {
                    node: consumer,
                    component: crate::algebra::component_letter(slot).unwrap_or('?'),
                    width: base_width,
                });
            }
        }
    }
    Ok(format_ident(&base, routing, size, base_width))
}

fn own_register(alloc: &Allocation, id: NodeId) -> Result<String, CompileError> {
    match alloc.assign(id).map(|a| a.assign) {
        Some(RegisterAssign::Register(n)) => Ok(format!("r{n}")),
        _ => Err(CompileError::BadPlaceholder {
            node: id,
            placeholder: "#".to_string(),
        }),
    }
}

/// Expands one template for one node.
fn substitute(
    template: &str,
    graph: &Graph,
    id: NodeId,
    alloc: &Allocation,
    dialect: Dialect,
) -> Result<String, CompileError> {
    let node = graph
        .node(id)
        .ok_or(CompileError::Graph(crate::error::GraphError::MissingNode(id)))?;
    let explicit = node.kind.ports().len();
    let bad = |p: &str| CompileError::BadPlaceholder {
        node: id,
        placeholder: p.to_string(),
    };

    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '#' => out.push_str(&own_register(alloc, id)?),
            '%' => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().filter(|c| c.is_ascii_digit()) {
                    digits.push(*d);
                    chars.next();
                }
                let n: usize = digits.parse().map_err(|_| bad("%"))?;
                let port = if n < explicit {
                    n as PortIndex
                } else {
                    DERIVED_PORT_BASE + (n - explicit) as PortIndex
                };
                let edge = graph
                    .edge_at(id, port)
                    .ok_or_else(|| bad(&format!("%{n}")))?;
                out.push_str(&resolve_edge(graph, edge, alloc, dialect)?);
            }
            '$' | '&' => {
                let mut word = String::new();
                while let Some(c) = chars.peek().filter(|c| c.is_ascii_alphanumeric() || **c == '_')
                {
                    word.push(*c);
                    chars.next();
                }
                if ch == '$' {
                    let q = Interpolant::from_name(&word).ok_or_else(|| bad(&format!("${word}")))?;
                    if alloc.interpolant_location(q).is_none() {
                        return Err(bad(&format!("${word}")));
                    }
                    out.push_str(&varying_ref(dialect, q));
                } else {
                    let slot = alloc
                        .literal_index(id, &word)
                        .ok_or_else(|| bad(&format!("&{word}")))?;
                    let _ = write!(out, "k{slot}");
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// All fragment-main statements, in schedule order, fully substituted.
fn fragment_statements(
    graph: &Graph,
    ctx: &CompileContext,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    let mut out = Vec::new();
    for &id in &alloc.order {
        for template in kinds::templates(graph, id, ctx, dialect, alloc)? {
            out.push(substitute(&template, graph, id, alloc, dialect)?);
        }
    }
    Ok(out)
}

fn literal_text(dialect: Dialect, lit: Literal) -> String {
    match lit {
        Literal::Scalar(bits) => fmt_f32(f32::from_bits(bits)),
        Literal::Vec4(bits) => {
            let parts: Vec<String> = bits.iter().map(|&b| fmt_f32(f32::from_bits(b))).collect();
            format!("{}({})", kinds::type_name(dialect, 4), parts.join(", "))
        }
    }
}

fn wgsl_common(alloc: &Allocation) -> String {
    let mut s = String::new();
    for (i, &lit) in alloc.literals.iter().enumerate() {
        let ty = kinds::type_name(Dialect::Wgsl, lit.width());
        let _ = writeln!(s, "const k{i}: {ty} = {};", literal_text(Dialect::Wgsl, lit));
    }
    if !alloc.literals.is_empty() {
        s.push('\n');
    }
    s.push_str(
        "struct Globals {\n    mvp: mat4x4f,\n    model: mat4x4f,\n    eye: vec3f,\n    _pad0: f32,\n    light_dir: vec3f,\n    _pad1: f32,\n    light_pos: vec3f,\n    _pad2: f32,\n}\n\n@group(0) @binding(0) var<uniform> globals: Globals;\n",
    );
    if !alloc.params.is_empty() {
        s.push_str("\nstruct MaterialParams {\n");
        for name in &alloc.params {
            let _ = writeln!(s, "    {name}: vec4f,");
        }
        s.push_str("}\n\n@group(0) @binding(1) var<uniform> material: MaterialParams;\n");
    }
    for (i, tex) in alloc.textures.iter().enumerate() {
        let ty = match tex.target {
            TextureTarget::Cube => "texture_cube<f32>",
            _ => "texture_2d<f32>",
        };
        let _ = writeln!(s, "\n@group(1) @binding({}) var t{i}: {ty};", 2 * i);
        let _ = writeln!(s, "@group(1) @binding({}) var s{i}: sampler;", 2 * i + 1);
    }
    s.push_str("\nstruct VsOut {\n    @builtin(position) position: vec4f,\n");
    for (loc, q) in alloc.interpolants.iter().enumerate() {
        let ty = kinds::type_name(Dialect::Wgsl, q.width());
        let _ = writeln!(s, "    @location({loc}) {}: {ty},", q.var());
    }
    s.push_str("}\n");
    s
}

fn wgsl_vertex(alloc: &Allocation) -> String {
    let mut s = String::new();
    s.push_str(
        "\n@vertex\nfn vs_main(\n    @location(0) position: vec3f,\n    @location(1) normal: vec3f,\n    @location(2) uv0: vec2f,\n    @location(3) uv1: vec2f,\n    @location(4) color: vec4f,\n) -> VsOut {\n    var out: VsOut;\n    let world_pos = (globals.model * vec4f(position, 1.0)).xyz;\n    out.position = globals.mvp * vec4f(position, 1.0);\n",
    );
    for &q in &alloc.interpolants {
        let _ = writeln!(s, "    {}", q.vertex_assignment(Dialect::Wgsl));
    }
    s.push_str("    return out;\n}\n");
    s
}

fn wgsl_fragment(statements: &[String]) -> String {
    let mut s = String::new();
    s.push_str("\n@fragment\nfn fs_main(in: VsOut) -> @location(0) vec4f {\n");
    for stmt in statements {
        let _ = writeln!(s, "    {stmt}");
    }
    s.push_str("}\n");
    s
}

fn glsl_globals() -> &'static str {
    "layout(std140, binding = 0) uniform Globals {\n    mat4 mvp;\n    mat4 model;\n    vec3 eye;\n    vec3 light_dir;\n    vec3 light_pos;\n};\n"
}

fn glsl_vertex(alloc: &Allocation) -> String {
    let mut s = String::from("#version 450\n\n");
    s.push_str(glsl_globals());
    s.push_str(
        "\nlayout(location = 0) in vec3 position;\nlayout(location = 1) in vec3 normal;\nlayout(location = 2) in vec2 uv0;\nlayout(location = 3) in vec2 uv1;\nlayout(location = 4) in vec4 color;\n",
    );
    for (loc, q) in alloc.interpolants.iter().enumerate() {
        let ty = kinds::type_name(Dialect::Glsl, q.width());
        let _ = writeln!(s, "layout(location = {loc}) out {ty} {};", q.var());
    }
    s.push_str(
        "\nvoid main() {\n    vec3 world_pos = (model * vec4(position, 1.0)).xyz;\n    gl_Position = mvp * vec4(position, 1.0);\n",
    );
    for &q in &alloc.interpolants {
        let _ = writeln!(s, "    {}", q.vertex_assignment(Dialect::Glsl));
    }
    s.push_str("}\n");
    s
}

fn glsl_fragment(alloc: &Allocation, statements: &[String]) -> String {
    let mut s = String::from("#version 450\n\n");
    for (i, &lit) in alloc.literals.iter().enumerate() {
        let ty = kinds::type_name(Dialect::Glsl, lit.width());
        let _ = writeln!(s, "const {ty} k{i} = {};", literal_text(Dialect::Glsl, lit));
    }
    if !alloc.literals.is_empty() {
        s.push('\n');
    }
    s.push_str(glsl_globals());
    if !alloc.params.is_empty() {
        s.push_str("\nlayout(std140, binding = 1) uniform MaterialParams {\n");
        for name in &alloc.params {
            let _ = writeln!(s, "    vec4 {name};");
        }
        s.push_str("} material;\n");
    }
    // Separate texture and sampler globals, combined at each call site;
    // bindings mirror the WGSL layout.
    for (i, tex) in alloc.textures.iter().enumerate() {
        let ty = match tex.target {
            TextureTarget::Cube => "textureCube",
            _ => "texture2D",
        };
        let _ = writeln!(s, "layout(set = 1, binding = {}) uniform {ty} t{i};", 2 * i);
        let _ = writeln!(s, "layout(set = 1, binding = {}) uniform sampler s{i};", 2 * i + 1);
    }
    s.push('\n');
    for (loc, q) in alloc.interpolants.iter().enumerate() {
        let ty = kinds::type_name(Dialect::Glsl, q.width());
        let _ = writeln!(s, "layout(location = {loc}) in {ty} {};", q.var());
    }
    s.push_str("layout(location = 0) out vec4 frag_color;\n\nvoid main() {\n");
    for stmt in statements {
        let _ = writeln!(s, "    {stmt}");
    }
    s.push_str("}\n");
    s
}

/// Assembles the final text for one dialect from a finished allocation.
pub fn emit(
    graph: &Graph,
    ctx: &CompileContext,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<ProgramBundle, CompileError> {
    let statements = fragment_statements(graph, ctx, dialect, alloc)?;
    match dialect {
        Dialect::Wgsl => {
            let common = wgsl_common(alloc);
            let vertex_fn = wgsl_vertex(alloc);
            let fragment_fn = wgsl_fragment(&statements);
            let module = format!("{common}{vertex_fn}{fragment_fn}");
            Ok(ProgramBundle {
                vertex: format!("{common}{vertex_fn}"),
                fragment: format!("{common}{fragment_fn}"),
                module: Some(module),
            })
        }
        Dialect::Glsl => Ok(ProgramBundle {
            vertex: glsl_vertex(alloc),
            fragment: glsl_fragment(alloc, &statements),
            module: None,
        }),
    }
}
