//! Render targets and the command context they are drawn through

use std::any::Any;

use glam::Vec2;

use crate::texture::TextureFormat;

/// GPU command recording context, opaque to the draw device.
///
/// Backends downcast through [`CommandContext::as_any_mut`] to reach their
/// concrete context type.
pub trait CommandContext {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Display rotation of a target, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Self::R90,
            180 => Self::R180,
            270 => Self::R270,
            _ => Self::R0,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }
}

/// Size information for a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    /// Size in logical (DPI-independent) pixels, before rotation
    pub logical_pixel_size: Vec2,
    pub dpi_scale: f64,
    pub rotation: Rotation,
}

impl WindowSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            logical_pixel_size: Vec2::new(width, height),
            dpi_scale: 1.0,
            rotation: Rotation::R0,
        }
    }

    pub fn physical_pixel_size(&self) -> Vec2 {
        self.logical_pixel_size * self.dpi_scale as f32
    }
}

/// Something a draw session can render into
pub trait Target {
    fn size(&self) -> WindowSize;

    fn format(&self) -> TextureFormat;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Depth buffer paired with a target
pub trait DepthTarget {
    /// Size in physical pixels
    fn physical_size(&self) -> (u32, u32);

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The set of targets a frame renders to, supplied by the host each frame.
pub trait RenderTargets {
    /// The main target for this frame and its optional depth buffer
    fn target_and_depth(&mut self) -> (&mut dyn Target, Option<&mut dyn DepthTarget>);
}
