//! Vertex-stage interpolated values and the kinds that read them directly.
//!
//! The interpolant table is closed: every quantity a fragment program can
//! read from the vertex stage is listed here, with its width and the vertex
//! main snippet that feeds it. Binding locations are assigned per program in
//! table order, so two programs using the same interpolant set agree on the
//! layout.

use crate::context::Dialect;

use super::NodeData;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Interpolant {
    Uv0,
    Uv1,
    Color,
    WorldNormal,
    ViewDir,
    LightVec,
    ScreenPos,
    Shadow,
}

/// Table order; doubles as the location-assignment order.
pub const ALL: [Interpolant; 8] = [
    Interpolant::Uv0,
    Interpolant::Uv1,
    Interpolant::Color,
    Interpolant::WorldNormal,
    Interpolant::ViewDir,
    Interpolant::LightVec,
    Interpolant::ScreenPos,
    Interpolant::Shadow,
];

impl Interpolant {
    pub fn name(self) -> &'static str {
        match self {
            Interpolant::Uv0 => "uv0",
            Interpolant::Uv1 => "uv1",
            Interpolant::Color => "color",
            Interpolant::WorldNormal => "normal",
            Interpolant::ViewDir => "view_dir",
            Interpolant::LightVec => "light_vec",
            Interpolant::ScreenPos => "screen_pos",
            Interpolant::Shadow => "shadow",
        }
    }

    pub fn from_name(name: &str) -> Option<Interpolant> {
        ALL.into_iter().find(|q| q.name() == name)
    }

    /// Varying variable name in the emitted source.
    pub fn var(self) -> String {
        format!("v_{}", self.name())
    }

    pub fn width(self) -> usize {
        match self {
            Interpolant::Uv0 | Interpolant::Uv1 | Interpolant::ScreenPos => 2,
            Interpolant::Color => 4,
            Interpolant::WorldNormal | Interpolant::ViewDir | Interpolant::LightVec => 3,
            Interpolant::Shadow => 1,
        }
    }

    pub(crate) fn tag(self) -> u32 {
        ALL.iter().position(|&q| q == self).unwrap_or(0) as u32
    }

    /// Vertex-main statement that fills this varying. The WGSL form writes
    /// into `out`, the GLSL form into the bare varying; both assume the
    /// fixed vertex inputs and the `globals` uniform block are in scope.
    pub(crate) fn vertex_assignment(self, dialect: Dialect) -> String {
        let value = match (self, dialect) {
            (Interpolant::Uv0, _) => "uv0".to_string(),
            (Interpolant::Uv1, _) => "uv1".to_string(),
            (Interpolant::Color, _) => "color".to_string(),
            (Interpolant::WorldNormal, Dialect::Wgsl) => {
                "(globals.model * vec4f(normal, 0.0)).xyz".to_string()
            }
            (Interpolant::WorldNormal, Dialect::Glsl) => {
                "(model * vec4(normal, 0.0)).xyz".to_string()
            }
            (Interpolant::ViewDir, Dialect::Wgsl) => "globals.eye - world_pos".to_string(),
            (Interpolant::ViewDir, Dialect::Glsl) => "eye - world_pos".to_string(),
            (Interpolant::LightVec, Dialect::Wgsl) => {
                "globals.light_pos - world_pos".to_string()
            }
            (Interpolant::LightVec, Dialect::Glsl) => "light_pos - world_pos".to_string(),
            (Interpolant::ScreenPos, Dialect::Wgsl) => {
                "out.position.xy * vec2f(0.5, -0.5) + vec2f(0.5, 0.5)".to_string()
            }
            (Interpolant::ScreenPos, Dialect::Glsl) => {
                "gl_Position.xy * vec2(0.5, 0.5) + vec2(0.5, 0.5)".to_string()
            }
            (Interpolant::Shadow, Dialect::Wgsl) => {
                "max(dot((globals.model * vec4f(normal, 0.0)).xyz, globals.light_dir), 0.0)"
                    .to_string()
            }
            (Interpolant::Shadow, Dialect::Glsl) => {
                "max(dot((model * vec4(normal, 0.0)).xyz, light_dir), 0.0)".to_string()
            }
        };
        match dialect {
            Dialect::Wgsl => format!("out.{} = {};", self.var(), value),
            Dialect::Glsl => format!("{} = {};", self.var(), value),
        }
    }
}

pub(super) fn tex_coord_data(set: u8) -> NodeData {
    let mut data = NodeData::inline();
    // Two uv sets exist; higher indices clamp to the second.
    data.interpolants.push(if set == 0 {
        Interpolant::Uv0
    } else {
        Interpolant::Uv1
    });
    data
}

pub(super) fn vertex_color_data() -> NodeData {
    let mut data = NodeData::inline();
    data.interpolants.push(Interpolant::Color);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip_through_the_table() {
        for q in ALL {
            assert_eq!(Interpolant::from_name(q.name()), Some(q));
        }
        assert_eq!(Interpolant::from_name("tangent"), None);
    }

    #[test]
    fn tags_follow_table_order() {
        assert_eq!(Interpolant::Uv0.tag(), 0);
        assert_eq!(Interpolant::Shadow.tag(), 7);
    }

    #[test]
    fn uv_set_selection_clamps() {
        assert_eq!(tex_coord_data(0).interpolants, vec![Interpolant::Uv0]);
        assert_eq!(tex_coord_data(1).interpolants, vec![Interpolant::Uv1]);
        assert_eq!(tex_coord_data(7).interpolants, vec![Interpolant::Uv1]);
    }
}
