//! The GPU-specific surface a draw device batches into
//!
//! A backend owns the real GPU objects (buffers, pipelines, the command
//! context captured at setup) and is driven by [`DrawDevice`](super::DrawDevice)
//! strictly inside `internal_setup` .. `internal_flush` brackets, on the thread
//! that owns the device.

use crate::rect::Rect;
use crate::target::{CommandContext, DepthTarget, Target};
use crate::texture::{TextureFormat, TextureViewRef};

use super::instance::InstanceBucketType;

/// A GPU buffer written once per flush
pub trait GpuBuffer {
    /// Replaces the buffer contents. Returns false if the upload failed.
    fn update(&mut self, data: &[u8]) -> bool;

    /// Maps at least `size` writable bytes, growing the buffer if needed
    fn map(&mut self, size: usize) -> Option<&mut [u8]>;

    fn unmap(&mut self);
}

/// Textures bound for one flush
pub struct ShaderInput<'a> {
    /// Color textures, indexed by the texture slot in sprite instances
    pub textures: &'a [TextureViewRef],
    /// Palette-index textures, indexed the same way for palette sprites
    pub textures_using_palette: &'a [TextureViewRef],
    pub palette_texture: Option<&'a TextureViewRef>,
    pub palette_remap_texture: Option<&'a TextureViewRef>,
}

/// Called before each draw call of a flush with the bucket being drawn and
/// whether it is the opaque pass. Returning false skips the draw.
pub type CustomContextFn<B> = Box<dyn FnMut(&mut B, InstanceBucketType, bool) -> bool>;

pub trait DrawBackend {
    /// The device was (re)created. Returns false if GPU resources could not be made.
    fn internal_reset(&mut self) -> bool;

    /// Release everything tied to the GPU device
    fn internal_destroy(&mut self);

    /// Prepare to render into `target`. The backend keeps whatever it needs
    /// from `context` until the matching `internal_flush(true)`.
    fn internal_setup(
        &mut self,
        context: &mut dyn CommandContext,
        target: &mut dyn Target,
        depth: Option<&mut dyn DepthTarget>,
        view_rect: &Rect,
        ignore_rotation: bool,
    ) -> bool;

    fn internal_flush_begin(&mut self);

    fn internal_flush_end(&mut self);

    /// Submit recorded work. `end_draw` is true when the session is ending.
    fn internal_flush(&mut self, end_draw: bool);

    fn instance_buffer(&mut self) -> &mut dyn GpuBuffer;

    /// Projection and view scale
    fn vs_constants_buffer_0(&mut self) -> &mut dyn GpuBuffer;

    /// World matrices
    fn vs_constants_buffer_1(&mut self) -> &mut dyn GpuBuffer;

    /// Palette texture sizes
    fn ps_constants_buffer_0(&mut self) -> &mut dyn GpuBuffer;

    /// Whether a sampler filter change needs a flush to take effect
    fn flush_for_sampler_change(&self) -> bool;

    fn create_texture(&mut self, width: u32, height: u32, format: TextureFormat) -> Option<TextureViewRef>;

    /// Overwrite one row of a texture created by [`DrawBackend::create_texture`]
    fn update_texture_row(&mut self, texture: &TextureViewRef, row: usize, data: &[u8]);

    fn apply_shader_input(&mut self, input: &ShaderInput<'_>);

    fn apply_opaque_state(&mut self);

    fn apply_transparent_state(&mut self, pre_multiplied_alpha: bool);

    /// Bind the pipeline for one bucket kind. Returning false skips its draws.
    fn apply_instance_state(&mut self, bucket_type: InstanceBucketType) -> bool;

    fn draw(&mut self, bucket_type: InstanceBucketType, instance_start: usize, instance_count: usize);
}
