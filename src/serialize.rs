//! JSON persistence for graphs.
//!
//! The on-disk shape is deliberately loose: node kinds are string tags with
//! a free-form params object, so files written by a newer build load here
//! with their unrecognized nodes preserved as [`NodeKind::Unknown`] and
//! survive a save untouched. Encoding is canonical (sorted maps, defaults
//! omitted), so encode ∘ decode ∘ encode is byte-identical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::algebra::Swizzle;
use crate::context::TextureRef;
use crate::error::DecodeError;
use crate::graph::{Graph, Node, NodeId, PortIndex};
use crate::kinds::{Derived, NodeKind};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct GraphFile {
    version: u32,
    nodes: BTreeMap<u32, NodeRecord>,
    edges: Vec<EdgeRecord>,
    next_id: u32,
}

#[derive(Serialize, Deserialize)]
struct NodeRecord {
    kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,
    #[serde(default, skip_serializing_if = "position_is_origin")]
    position: [f32; 2],
}

#[derive(Serialize, Deserialize)]
struct EdgeRecord {
    from: u32,
    to: u32,
    port: PortIndex,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    negate: bool,
    #[serde(default = "identity_swizzle", skip_serializing_if = "swizzle_is_identity")]
    swizzle: String,
}

fn position_is_origin(p: &[f32; 2]) -> bool {
    *p == [0.0, 0.0]
}

fn identity_swizzle() -> String {
    "xyzw".to_string()
}

fn swizzle_is_identity(s: &str) -> bool {
    s == "xyzw"
}

fn get_f32(params: &Map<String, Value>, key: &str, default: f32) -> f32 {
    params
        .get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(default)
}

fn get_vec4(params: &Map<String, Value>, key: &str, default: [f32; 4]) -> [f32; 4] {
    let Some(items) = params.get(key).and_then(Value::as_array) else {
        return default;
    };
    let mut out = default;
    for (slot, item) in out.iter_mut().zip(items) {
        if let Some(v) = item.as_f64() {
            *slot = v as f32;
        }
    }
    out
}

fn get_str<'a>(params: &'a Map<String, Value>, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or("")
}

fn get_u8(params: &Map<String, Value>, key: &str) -> u8 {
    params.get(key).and_then(Value::as_u64).unwrap_or(0) as u8
}

fn kind_to_record(kind: &NodeKind) -> (String, Map<String, Value>) {
    let mut params = Map::new();
    match kind {
        NodeKind::ConstantColor { rgba } => {
            params.insert("rgba".into(), json!(rgba));
        }
        NodeKind::ScalarConstant { value } => {
            params.insert("value".into(), json!(value));
        }
        NodeKind::MaterialParam { name } => {
            params.insert("name".into(), json!(name));
        }
        NodeKind::TexCoord { set } => {
            params.insert("set".into(), json!(set));
        }
        NodeKind::TextureSample { texture } => {
            params.insert("texture".into(), json!(texture));
        }
        NodeKind::SpecularLight { shininess } => {
            params.insert("shininess".into(), json!(shininess));
        }
        NodeKind::Fog { density, color } => {
            params.insert("density".into(), json!(density));
            params.insert("color".into(), json!(color));
        }
        NodeKind::DerivedQuantity { quantity } => {
            params.insert("quantity".into(), json!(quantity.name()));
        }
        NodeKind::Unknown { params: raw, .. } => {
            params = raw.clone();
        }
        _ => {}
    }
    (kind.name().to_string(), params)
}

fn kind_from_record(record: &NodeRecord) -> Result<NodeKind, DecodeError> {
    let p = &record.params;
    let unknown = || NodeKind::Unknown {
        tag: record.kind.clone(),
        params: p.clone(),
    };
    Ok(match record.kind.as_str() {
        "ConstantColor" => NodeKind::ConstantColor {
            rgba: get_vec4(p, "rgba", [0.0, 0.0, 0.0, 1.0]),
        },
        "ScalarConstant" => NodeKind::ScalarConstant {
            value: get_f32(p, "value", 0.0),
        },
        "MaterialParam" => NodeKind::MaterialParam {
            name: get_str(p, "name").to_string(),
        },
        "TexCoord" => NodeKind::TexCoord { set: get_u8(p, "set") },
        "VertexColor" => NodeKind::VertexColor,
        "TextureSample" => {
            let value = p.get("texture").cloned().unwrap_or(Value::Null);
            let texture: TextureRef = serde_json::from_value(value)?;
            NodeKind::TextureSample { texture }
        }
        "ScreenSample" => NodeKind::ScreenSample,
        "NoiseSample" => NodeKind::NoiseSample,
        "Add" => NodeKind::Add,
        "Multiply" => NodeKind::Multiply,
        "Dot" => NodeKind::Dot,
        "Mix" => NodeKind::Mix,
        "DiffuseLight" => NodeKind::DiffuseLight,
        "SpecularLight" => NodeKind::SpecularLight {
            shininess: get_f32(p, "shininess", 16.0),
        },
        "Fog" => NodeKind::Fog {
            density: get_f32(p, "density", 0.05),
            color: get_vec4(p, "color", [0.5, 0.5, 0.5, 1.0]),
        },
        // A derived tag with an unrecognized quantity stays opaque rather
        // than guessing.
        "Derived" => match Derived::from_name(get_str(p, "quantity")) {
            Some(quantity) => NodeKind::DerivedQuantity { quantity },
            None => unknown(),
        },
        "OutputColor" => NodeKind::OutputColor,
        _ => unknown(),
    })
}

pub fn to_json(graph: &Graph) -> Result<String, serde_json::Error> {
    let nodes = graph
        .nodes()
        .map(|(id, node)| {
            let (kind, params) = kind_to_record(&node.kind);
            (
                id.0,
                NodeRecord {
                    kind,
                    params,
                    comment: node.comment.clone(),
                    position: node.position,
                },
            )
        })
        .collect();
    let edges = graph
        .edges()
        .iter()
        .map(|e| EdgeRecord {
            from: e.from.0,
            to: e.to.0,
            port: e.port,
            negate: e.negate,
            swizzle: e.swizzle.letters(4),
        })
        .collect();
    serde_json::to_string_pretty(&GraphFile {
        version: FORMAT_VERSION,
        nodes,
        edges,
        next_id: graph.next_id(),
    })
}

pub fn from_json(text: &str) -> Result<Graph, DecodeError> {
    let file: GraphFile = serde_json::from_str(text)?;
    if file.version != FORMAT_VERSION {
        return Err(DecodeError::Version(file.version));
    }
    let mut graph = Graph::new();
    for (&id, record) in &file.nodes {
        let mut node = Node::new(kind_from_record(record)?);
        node.comment = record.comment.clone();
        node.position = record.position;
        graph.insert_with_id(NodeId(id), node);
    }
    graph.set_next_id(file.next_id);
    for e in &file.edges {
        let swizzle = Swizzle::from_letters(&e.swizzle)
            .ok_or_else(|| DecodeError::Swizzle(e.swizzle.clone()))?;
        graph
            .connect(NodeId(e.from), NodeId(e.to), e.port, e.negate, swizzle)
            .map_err(|err| DecodeError::Edge {
                from: e.from,
                to: e.to,
                reason: err.to_string(),
            })?;
    }
    Ok(graph)
}
