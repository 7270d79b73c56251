//! ff graphics - immediate-mode draw batching
//!
//! Collects sprites, lines, triangles, rectangles and circles submitted during a
//! draw session into per-kind instance buckets and hands them to a GPU backend
//! as a small number of instanced draw calls.
//!
//! # Architecture
//!
//! - [`DrawDevice`] - Batching engine, generic over a [`DrawBackend`]
//! - [`DrawBackend`] - GPU-specific hooks (buffers, textures, pipeline state, draw calls)
//! - [`InstanceBucket`] - Growable staging buffer for one primitive kind
//! - [`Target`] / [`RenderTargets`] - Where a draw session renders to

pub mod color;
pub mod draw;
pub mod palette;
pub mod rect;
pub mod sprite;
pub mod target;
pub mod texture;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_utils;

pub use color::Color;
pub use draw::{
    BatchStats, Bucket, CustomContextFn, DrawBackend, DrawDevice, DrawError, DrawOptions, DrawScope,
    GpuBuffer, InstanceBucket, InstanceBucketType, ShaderInput,
};
pub use palette::{PALETTE_SIZE, Palette, PaletteRemap};
pub use rect::Rect;
pub use sprite::{Endpoint, SpriteData, SpriteType};
pub use target::{CommandContext, DepthTarget, RenderTargets, Rotation, Target, WindowSize};
pub use texture::{TextureFormat, TextureView, TextureViewRef};
pub use transform::{MatrixStack, Transform};
