//! Sampling kinds. Each registers the textures it binds and the
//! interpolants it falls back to when no coordinate is wired in.

use crate::context::{CompileContext, DetailLevel, Dialect, PixelFormat, TextureRef, TextureTarget};
use crate::error::CompileError;
use crate::graph::{Graph, NodeId};
use crate::schedule::Allocation;

use super::{decl, decl_named, input_width, kind_name_static, Interpolant, Literal, NodeData, NodeKind};

/// Resolves a sample's coordinate source: the wired edge, or the default uv
/// interpolant when the port is open and the target takes a 2-wide coord.
fn coordinate(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
    texture: TextureRef,
) -> Result<Option<Interpolant>, CompileError> {
    let want = texture.target.coord_width();
    match input_width(graph, id, 0)? {
        Some(got) if got == want => Ok(None),
        Some(got) => Err(CompileError::WidthMismatch {
            node: id,
            left: want,
            right: got,
        }),
        None if want == 2 => Ok(Some(Interpolant::Uv0)),
        None => Err(CompileError::MissingInput {
            node: id,
            kind: kind_name_static(kind),
            port: 0,
        }),
    }
}

pub(super) fn texture_sample_data(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
    texture: TextureRef,
) -> Result<NodeData, CompileError> {
    let mut data = NodeData::register();
    data.textures.push(texture);
    if let Some(fallback) = coordinate(graph, id, kind, texture)? {
        data.interpolants.push(fallback);
    }
    if texture.format == PixelFormat::NormalCompressed {
        data.temporaries = 1;
    }
    Ok(data)
}

pub(super) fn screen_sample_data(ctx: &CompileContext) -> NodeData {
    let mut data = NodeData::register();
    data.textures.push(ctx.shared.screen);
    data.interpolants.push(Interpolant::ScreenPos);
    data
}

pub(super) fn noise_sample_data(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
    ctx: &CompileContext,
) -> Result<NodeData, CompileError> {
    // Low detail skips the lookup entirely and folds to mid-grey.
    if ctx.detail == DetailLevel::Low {
        let mut data = NodeData::inline();
        data.literals
            .push(("flat", Literal::vec4([0.5, 0.5, 0.5, 1.0])));
        return Ok(data);
    }
    texture_sample_data(graph, id, kind, ctx.shared.noise)
}

pub(super) fn texture_slot(alloc: &Allocation, id: NodeId) -> Result<usize, CompileError> {
    alloc
        .texture_index(id)
        .ok_or_else(|| CompileError::BadPlaceholder {
            node: id,
            placeholder: "texture slot".to_string(),
        })
}

pub(super) fn sample_call(
    dialect: Dialect,
    slot: usize,
    coord: &str,
    target: TextureTarget,
) -> String {
    match dialect {
        Dialect::Wgsl => format!("textureSample(t{slot}, s{slot}, {coord})"),
        // Textures and samplers are declared separately and combined at the
        // call site; naga's GLSL frontend has no global combined samplers.
        Dialect::Glsl => {
            let combined = match target {
                TextureTarget::Cube => "samplerCube",
                _ => "sampler2D",
            };
            format!("texture({combined}(t{slot}, s{slot}), {coord})")
        }
    }
}

fn sample_templates(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
    texture: TextureRef,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    let slot = texture_slot(alloc, id)?;
    let coord = match coordinate(graph, id, kind, texture)? {
        Some(fallback) => format!("${}", fallback.name()),
        None => "%0".to_string(),
    };
    let call = sample_call(dialect, slot, &coord, texture.target);
    if texture.format == PixelFormat::NormalCompressed {
        // Two-channel map: reconstruct z from the unit-length constraint.
        let ctor = super::type_name(dialect, 4);
        return Ok(vec![
            format!("{}{call}.xy * 2.0 - 1.0;", decl_named(dialect, 2, "nxy")),
            format!(
                "{}{ctor}(#_nxy, sqrt(max(0.0, 1.0 - dot(#_nxy, #_nxy))), 1.0);",
                decl(dialect, 4)
            ),
        ]);
    }
    Ok(vec![format!("{}{call};", decl(dialect, 4))])
}

pub(super) fn texture_sample_templates(
    graph: &Graph,
    id: NodeId,
    texture: TextureRef,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    let kind = NodeKind::TextureSample { texture };
    sample_templates(graph, id, &kind, texture, dialect, alloc)
}

pub(super) fn screen_sample_templates(
    id: NodeId,
    ctx: &CompileContext,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    let slot = texture_slot(alloc, id)?;
    let call = sample_call(dialect, slot, "$screen_pos", ctx.shared.screen.target);
    Ok(vec![format!("{}{call};", decl(dialect, 4))])
}

pub(super) fn noise_sample_templates(
    graph: &Graph,
    id: NodeId,
    ctx: &CompileContext,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    if ctx.detail == DetailLevel::Low {
        return Ok(Vec::new());
    }
    sample_templates(graph, id, &NodeKind::NoiseSample, ctx.shared.noise, dialect, alloc)
}
