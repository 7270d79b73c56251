//! World-to-clip projection for a draw session
//!
//! Matrices use glam's column-vector convention and are uploaded column-major.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::rect::Rect;
use crate::target::{Rotation, WindowSize};

use super::MAX_PALETTE_TEXTURES;

/// Vertex constants slot 0
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VsConstants0 {
    pub projection: [[f32; 4]; 4],
    /// World units per logical pixel
    pub view_scale: [f32; 2],
    pub padding: [f32; 2],
}

impl Default for VsConstants0 {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            view_scale: [1.0, 1.0],
            padding: [0.0; 2],
        }
    }
}

/// Pixel constants slot 0: texel size of each palette texture, xy used
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PsConstants0 {
    pub texture_palette_sizes: [[f32; 4]; MAX_PALETTE_TEXTURES],
}

impl Default for PsConstants0 {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Maps the unit square onto clip space for a target rotation
fn rotate_matrix(rotation: Rotation, ignore_rotation: bool) -> Mat4 {
    let rotation = if ignore_rotation { Rotation::R0 } else { rotation };
    let cols: [f32; 16] = match rotation {
        Rotation::R0 => [
            2.0, 0.0, 0.0, 0.0, //
            0.0, -2.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            -1.0, 1.0, 0.0, 1.0,
        ],
        Rotation::R90 => [
            0.0, 2.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            -1.0, -1.0, 0.0, 1.0,
        ],
        Rotation::R180 => [
            -2.0, 0.0, 0.0, 0.0, //
            0.0, 2.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            1.0, -1.0, 0.0, 1.0,
        ],
        Rotation::R270 => [
            0.0, -2.0, 0.0, 0.0, //
            -2.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            1.0, 1.0, 0.0, 1.0,
        ],
    };
    Mat4::from_cols_array(&cols)
}

/// World rect to clip space, or `None` for a degenerate world or view rect
pub(crate) fn view_matrix(
    target_size: &WindowSize,
    view_rect: &Rect,
    world_rect: &Rect,
    ignore_rotation: bool,
) -> Option<Mat4> {
    if world_rect.area() == 0.0 || view_rect.area() <= 0.0 {
        return None;
    }

    let translate = Mat4::from_translation(Vec3::new(-world_rect.left, -world_rect.top, 0.0));
    let scale = Mat4::from_scale(Vec3::new(
        1.0 / world_rect.width(),
        1.0 / world_rect.height(),
        1.0,
    ));

    Some(rotate_matrix(target_size.rotation, ignore_rotation) * scale * translate)
}

/// World units per logical pixel of the view
pub(crate) fn view_scale(target_size: &WindowSize, view_rect: &Rect, world_rect: &Rect) -> Vec2 {
    let view_size = view_rect.size() / target_size.dpi_scale as f32;
    world_rect.size() / view_size
}
