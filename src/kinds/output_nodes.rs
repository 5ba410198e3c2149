//! The program terminal. Coerces whatever arrives on its color port into a
//! vec4 and returns it, optionally attenuated by the screen-space occlusion
//! buffer.

use crate::context::{CompileContext, Dialect};
use crate::error::CompileError;
use crate::graph::{Graph, NodeId};
use crate::schedule::Allocation;

use super::texture_nodes::{sample_call, texture_slot};
use super::{coerce_vec4, require_input, Interpolant, NodeData, NodeKind};

pub(super) fn output_color_data(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
    ctx: &CompileContext,
) -> Result<NodeData, CompileError> {
    require_input(graph, id, kind, 0)?;
    let mut data = NodeData::inline();
    if ctx.ambient_occlusion {
        data.textures.push(ctx.shared.screen);
        data.interpolants.push(Interpolant::ScreenPos);
    }
    Ok(data)
}

pub(super) fn output_color_templates(
    graph: &Graph,
    id: NodeId,
    ctx: &CompileContext,
    dialect: Dialect,
    alloc: &Allocation,
) -> Result<Vec<String>, CompileError> {
    let width = require_input(graph, id, &NodeKind::OutputColor, 0)?;
    let color = coerce_vec4(dialect, "%0", width);
    let emit = |expr: String| match dialect {
        Dialect::Wgsl => format!("return {expr};"),
        Dialect::Glsl => format!("frag_color = {expr};"),
    };
    if !ctx.ambient_occlusion {
        return Ok(vec![emit(color)]);
    }
    let slot = texture_slot(alloc, id)?;
    let ty = match dialect {
        Dialect::Wgsl => "let",
        Dialect::Glsl => "float",
    };
    Ok(vec![
        format!(
            "{ty} ao = {}.x;",
            sample_call(dialect, slot, "$screen_pos", ctx.shared.screen.target)
        ),
        emit(format!("{color} * ao")),
    ])
}
