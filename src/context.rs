//! The external compilation context: everything outside the graph that can
//! change the emitted text.
//!
//! All of it is hashed into the signature; a flag that is not hashed here (or
//! in a kind's signature extras) must not influence any template.

use serde::{Deserialize, Serialize};

/// Target shading-language dialect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dialect {
    Wgsl,
    Glsl,
}

/// Kind of light the program is being specialized for.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LightKind {
    None,
    #[default]
    Directional,
    Point,
    Spot,
}

impl LightKind {
    /// Point-style lights carry a per-fragment light vector; directional
    /// lights read a constant direction.
    pub fn has_position(self) -> bool {
        matches!(self, LightKind::Point | LightKind::Spot)
    }

    pub(crate) fn tag(self) -> u32 {
        match self {
            LightKind::None => 0,
            LightKind::Directional => 1,
            LightKind::Point => 2,
            LightKind::Spot => 3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum DetailLevel {
    Low,
    Medium,
    #[default]
    High,
}

impl DetailLevel {
    pub(crate) fn tag(self) -> u32 {
        match self {
            DetailLevel::Low => 0,
            DetailLevel::Medium => 1,
            DetailLevel::High => 2,
        }
    }
}

/// Declared storage format of an already-loaded texture.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgba8,
    Rgba8Srgb,
    Rgba16Float,
    R8,
    /// Two-channel compressed normal map; sampling reconstructs z.
    NormalCompressed,
}

impl PixelFormat {
    pub(crate) fn tag(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 0,
            PixelFormat::Rgba8Srgb => 1,
            PixelFormat::Rgba16Float => 2,
            PixelFormat::R8 => 3,
            PixelFormat::NormalCompressed => 4,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureTarget {
    D2,
    Cube,
    Rect,
    Array,
}

impl TextureTarget {
    pub(crate) fn tag(self) -> u32 {
        match self {
            TextureTarget::D2 => 0,
            TextureTarget::Cube => 1,
            TextureTarget::Rect => 2,
            TextureTarget::Array => 3,
        }
    }

    /// Coordinate width required to sample this target.
    pub(crate) fn coord_width(self) -> usize {
        match self {
            TextureTarget::Cube => 3,
            TextureTarget::D2 | TextureTarget::Rect | TextureTarget::Array => 2,
        }
    }
}

/// Opaque handle to an already-resident texture. Only the identity and the
/// declared format/target cross this boundary; contents never do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TextureRef {
    pub id: u32,
    pub format: PixelFormat,
    pub target: TextureTarget,
}

impl TextureRef {
    pub(crate) fn signature_words(&self, out: &mut Vec<u32>) {
        out.push(self.id);
        out.push((self.format.tag() << 8) | self.target.tag());
    }
}

/// Shared engine textures some node kinds sample. These are threaded through
/// the context explicitly so tests can substitute fakes.
#[derive(Clone, Copy, Debug)]
pub struct SharedTextures {
    /// Screen-space buffer (also serves as the occlusion source).
    pub screen: TextureRef,
    /// Fixed tiling noise texture.
    pub noise: TextureRef,
}

/// Per-compilation variant selectors supplied by the surrounding engine.
#[derive(Clone, Debug)]
pub struct CompileContext {
    pub light: LightKind,
    pub detail: DetailLevel,
    pub shadows: bool,
    pub ambient_occlusion: bool,
    pub two_sided: bool,
    pub shared: SharedTextures,
}

impl CompileContext {
    pub fn new(shared: SharedTextures) -> Self {
        CompileContext {
            light: LightKind::default(),
            detail: DetailLevel::default(),
            shadows: false,
            ambient_occlusion: false,
            two_sided: false,
            shared,
        }
    }

    pub(crate) fn signature_words(&self, out: &mut Vec<u32>) {
        out.push(self.light.tag());
        out.push(self.detail.tag());
        out.push(
            (self.shadows as u32)
                | ((self.ambient_occlusion as u32) << 1)
                | ((self.two_sided as u32) << 2),
        );
        self.shared.screen.signature_words(out);
        self.shared.noise.signature_words(out);
    }
}
