//! GPU instance records and the bucket kinds that hold them
//!
//! Every record is plain old data laid out to match the instanced vertex
//! shaders. Index fields pack small dictionary indices:
//! `matrix << 24 | remap << 16 | (palette or sampler) << 8 | texture`.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// World rect, already scaled and offset by the transform position
    pub rect: [f32; 4],
    pub uv_rect: [f32; 4],
    pub color: [f32; 4],
    pub depth: f32,
    pub indexes: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RotatedSpriteInstance {
    pub rect: [f32; 4],
    pub uv_rect: [f32; 4],
    pub color: [f32; 4],
    /// x, y, depth, rotation in degrees counter-clockwise
    pub pos_rot: [f32; 4],
    pub indexes: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LineInstance {
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub start_thickness: f32,
    pub end_thickness: f32,
    pub depth: f32,
    pub matrix_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LineStripInstance {
    pub start: [f32; 2],
    pub end: [f32; 2],
    /// Neighbors used to miter the joints
    pub before_start: [f32; 2],
    pub after_end: [f32; 2],
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub start_thickness: f32,
    pub end_thickness: f32,
    pub depth: f32,
    pub matrix_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TriangleFilledInstance {
    pub position: [[f32; 2]; 3],
    pub color: [[f32; 4]; 3],
    pub depth: f32,
    pub matrix_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RectangleFilledInstance {
    pub rect: [f32; 4],
    pub color: [f32; 4],
    pub depth: f32,
    pub matrix_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RectangleOutlineInstance {
    pub rect: [f32; 4],
    pub color: [f32; 4],
    pub depth: f32,
    pub thickness: f32,
    pub matrix_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CircleFilledInstance {
    /// x, y, depth
    pub position: [f32; 3],
    pub inside_color: [f32; 4],
    pub outside_color: [f32; 4],
    pub radius: f32,
    pub matrix_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CircleOutlineInstance {
    pub position: [f32; 3],
    pub inside_color: [f32; 4],
    pub outside_color: [f32; 4],
    pub radius: f32,
    pub thickness: f32,
    pub matrix_index: u32,
}

/// One bucket per primitive kind, in an opaque and an alpha-ordered family.
///
/// The declaration order is the order opaque buckets are drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstanceBucketType {
    Sprites,
    PaletteSprites,
    RotatedSprites,
    RotatedPaletteSprites,
    Lines,
    LineStrips,
    Triangles,
    RectanglesFilled,
    RectanglesOutline,
    CirclesFilled,
    CirclesOutline,

    SpritesOutTransparent,
    PaletteSpritesOutTransparent,
    RotatedSpritesOutTransparent,
    RotatedPaletteSpritesOutTransparent,
    LinesOutTransparent,
    LineStripsOutTransparent,
    TrianglesOutTransparent,
    RectanglesFilledOutTransparent,
    RectanglesOutlineOutTransparent,
    CirclesFilledOutTransparent,
    CirclesOutlineOutTransparent,
}

impl InstanceBucketType {
    pub const COUNT: usize = 22;
    pub const FIRST_TRANSPARENT: Self = Self::SpritesOutTransparent;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Sprites,
        Self::PaletteSprites,
        Self::RotatedSprites,
        Self::RotatedPaletteSprites,
        Self::Lines,
        Self::LineStrips,
        Self::Triangles,
        Self::RectanglesFilled,
        Self::RectanglesOutline,
        Self::CirclesFilled,
        Self::CirclesOutline,
        Self::SpritesOutTransparent,
        Self::PaletteSpritesOutTransparent,
        Self::RotatedSpritesOutTransparent,
        Self::RotatedPaletteSpritesOutTransparent,
        Self::LinesOutTransparent,
        Self::LineStripsOutTransparent,
        Self::TrianglesOutTransparent,
        Self::RectanglesFilledOutTransparent,
        Self::RectanglesOutlineOutTransparent,
        Self::CirclesFilledOutTransparent,
        Self::CirclesOutlineOutTransparent,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_transparent(self) -> bool {
        self.index() >= Self::FIRST_TRANSPARENT.index()
    }

    /// The same primitive kind in the requested family
    pub fn with_transparency(self, transparent: bool) -> Self {
        let opaque_index = self.index() % Self::FIRST_TRANSPARENT.index();
        let index = if transparent {
            opaque_index + Self::FIRST_TRANSPARENT.index()
        } else {
            opaque_index
        };
        Self::ALL[index]
    }
}
