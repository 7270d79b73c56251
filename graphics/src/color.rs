//! Draw colors: straight RGBA or a palette index

use glam::Vec4;

use crate::palette::PaletteRemap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// Linear RGBA, each channel 0..=1
    Rgba(Vec4),
    /// Palette index with a separate alpha. Index 0 is always transparent.
    Palette { index: u8, alpha: f32 },
}

impl Color {
    pub const NONE: Self = Self::Rgba(Vec4::ZERO);
    pub const WHITE: Self = Self::Rgba(Vec4::ONE);
    pub const BLACK: Self = Self::Rgba(Vec4::new(0.0, 0.0, 0.0, 1.0));

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Rgba(Vec4::new(r, g, b, a))
    }

    pub fn palette(index: u8) -> Self {
        Self::Palette { index, alpha: 1.0 }
    }

    pub fn alpha(&self) -> f32 {
        match self {
            Self::Rgba(rgba) => rgba.w,
            Self::Palette { alpha, .. } => *alpha,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        match self {
            Self::Rgba(rgba) => Self::Rgba(rgba.with_w(alpha)),
            Self::Palette { index, .. } => Self::Palette { index, alpha },
        }
    }

    pub fn is_palette(&self) -> bool {
        matches!(self, Self::Palette { .. })
    }

    /// Color as the shaders expect it.
    ///
    /// Palette colors are encoded in the red channel as `index / 256` after
    /// remapping, with alpha forced to zero for index 0.
    pub fn to_shader_color(&self, remap: &PaletteRemap) -> [f32; 4] {
        match self {
            Self::Rgba(rgba) => rgba.to_array(),
            Self::Palette { index, alpha } => {
                let index = remap.get(*index);
                let alpha = if index != 0 { *alpha } else { 0.0 };
                [index as f32 / 256.0, 0.0, 0.0, alpha]
            }
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<Vec4> for Color {
    fn from(rgba: Vec4) -> Self {
        Self::Rgba(rgba)
    }
}
