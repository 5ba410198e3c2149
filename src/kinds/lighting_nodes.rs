//! Lighting terms, fog, and the derived-quantity node the expansion pass
//! wires them to. These kinds are where context specialization bites
//! hardest: the same graph lowers to different statements per light kind
//! and per shadow/two-sided flag.

use crate::context::{CompileContext, Dialect, LightKind};
use crate::error::CompileError;
use crate::graph::NodeId;

use super::{decl, Derived, Interpolant, Literal, NodeData};

pub(super) fn diffuse_data(ctx: &CompileContext) -> NodeData {
    let mut data = NodeData::register();
    if ctx.light != LightKind::None && ctx.shadows {
        data.interpolants.push(Interpolant::Shadow);
    }
    data
}

pub(super) fn specular_data(ctx: &CompileContext, shininess: f32) -> NodeData {
    let mut data = NodeData::register();
    if ctx.light != LightKind::None {
        data.literals.push(("shine", Literal::scalar(shininess)));
    }
    data
}

pub(super) fn fog_data(density: f32, color: [f32; 4]) -> NodeData {
    let mut data = NodeData::register();
    data.interpolants.push(Interpolant::ViewDir);
    data.literals.push(("fog_color", Literal::vec4(color)));
    data.literals.push(("fog_density", Literal::scalar(density)));
    data.temporaries = 1;
    data
}

pub(super) fn derived_data(
    id: NodeId,
    quantity: Derived,
    ctx: &CompileContext,
) -> Result<NodeData, CompileError> {
    let mut data = NodeData::register();
    match quantity {
        Derived::Normal => data.interpolants.push(Interpolant::WorldNormal),
        Derived::ViewDir => data.interpolants.push(Interpolant::ViewDir),
        Derived::LightDir => match ctx.light {
            LightKind::None => {
                return Err(CompileError::UnsatisfiedDerived {
                    node: id,
                    quantity: quantity.name(),
                    light: ctx.light,
                });
            }
            // Directional lights read the constant direction uniform.
            LightKind::Directional => {}
            LightKind::Point | LightKind::Spot => data.interpolants.push(Interpolant::LightVec),
        },
        // Normalized sum of two derived inputs; nothing of its own.
        Derived::HalfDir => {}
    }
    Ok(data)
}

pub(super) fn diffuse_templates(ctx: &CompileContext, dialect: Dialect) -> Vec<String> {
    if ctx.light == LightKind::None {
        return vec![format!("{}1.0;", decl(dialect, 1))];
    }
    // Two-sided surfaces light both faces; one-sided clamp at the horizon.
    let body = if ctx.two_sided {
        "abs(dot(%0, %1))"
    } else {
        "max(dot(%0, %1), 0.0)"
    };
    let shadow = if ctx.shadows { " * $shadow" } else { "" };
    vec![format!("{}{body}{shadow};", decl(dialect, 1))]
}

pub(super) fn specular_templates(ctx: &CompileContext, dialect: Dialect) -> Vec<String> {
    if ctx.light == LightKind::None {
        return vec![format!("{}0.0;", decl(dialect, 1))];
    }
    vec![format!(
        "{}pow(max(dot(%0, %1), 0.0), &shine);",
        decl(dialect, 1)
    )]
}

pub(super) fn fog_templates(
    graph: &crate::graph::Graph,
    id: NodeId,
    kind: &super::NodeKind,
    dialect: Dialect,
) -> Result<Vec<String>, CompileError> {
    let width = super::require_input(graph, id, kind, 0)?;
    let (fog_decl, mix_decl) = (super::decl_named(dialect, 1, "fog"), decl(dialect, 4));
    let color = super::coerce_vec4(dialect, "%0", width);
    Ok(vec![
        format!("{fog_decl}clamp(exp(-&fog_density * length($view_dir)), 0.0, 1.0);"),
        format!("{mix_decl}mix(&fog_color, {color}, #_fog);"),
    ])
}

pub(super) fn derived_templates(
    id: NodeId,
    quantity: Derived,
    ctx: &CompileContext,
    dialect: Dialect,
) -> Result<Vec<String>, CompileError> {
    let body = match quantity {
        Derived::Normal => "normalize($normal)".to_string(),
        Derived::ViewDir => "normalize($view_dir)".to_string(),
        Derived::LightDir => match (ctx.light, dialect) {
            (LightKind::None, _) => {
                return Err(CompileError::UnsatisfiedDerived {
                    node: id,
                    quantity: quantity.name(),
                    light: ctx.light,
                });
            }
            (LightKind::Directional, Dialect::Wgsl) => "normalize(globals.light_dir)".to_string(),
            (LightKind::Directional, Dialect::Glsl) => "normalize(light_dir)".to_string(),
            (LightKind::Point | LightKind::Spot, _) => "normalize($light_vec)".to_string(),
        },
        Derived::HalfDir => "normalize(%0 + %1)".to_string(),
    };
    Ok(vec![format!("{}{body};", decl(dialect, 3))])
}
