//! Immediate-mode draw batching
//!
//! A [`DrawDevice`] accepts primitives between `begin_draw` and `end_draw`,
//! sorts them into [`InstanceBucket`]s by kind and alpha behavior, and flushes
//! them to its [`DrawBackend`] as instanced draw calls: opaque buckets first in
//! bucket order, then alpha-blended primitives in submission order.
//!
//! World matrices, textures, palettes and palette remaps used by a batch are
//! deduplicated into small per-batch indices. When one of those dictionaries
//! is full the device flushes early and retries.

mod backend;
mod bucket;
mod depth;
mod flush;
mod index;
mod instance;
mod primitives;
mod view;


use std::ops::{Deref, DerefMut};

use glam::Mat4;

use crate::palette::{PALETTE_SIZE, PaletteRef, PaletteRemap};
use crate::rect::Rect;
use crate::target::{CommandContext, DepthTarget, Target};
use crate::texture::{TextureFormat, TextureViewRef};
use crate::transform::MatrixStack;

pub use backend::{CustomContextFn, DrawBackend, GpuBuffer, ShaderInput};
pub use bucket::{Bucket, InstanceBucket};
pub use instance::{
    CircleFilledInstance, CircleOutlineInstance, InstanceBucketType, LineInstance,
    LineStripInstance, RectangleFilledInstance, RectangleOutlineInstance, RotatedSpriteInstance,
    SpriteInstance, TriangleFilledInstance,
};
pub use view::{PsConstants0, VsConstants0};

use bucket::InstanceBuckets;
use depth::DepthCounter;
use index::{INVALID_INDEX, IndexDictionary, TextureSlots};

pub const MAX_TEXTURES: usize = 32;
pub const MAX_PALETTE_TEXTURES: usize = 32;
/// 256-color palette rows
pub const MAX_PALETTES: usize = 128;
pub const MAX_PALETTE_REMAPS: usize = 128;
pub const MAX_TRANSFORM_MATRIXES: usize = 128;
/// Primitives per session that fit in the depth range (not enforced)
pub const MAX_RENDER_COUNT: usize = 524_288;
pub const MAX_RENDER_DEPTH: f32 = 1.0;
pub const RENDER_DEPTH_DELTA: f32 = MAX_RENDER_DEPTH / MAX_RENDER_COUNT as f32;
pub const MIN_INSTANCE_BUCKET_COUNT: usize = 64;

bitflags::bitflags! {
    /// Per-session options for [`DrawDevice::begin_draw`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DrawOptions: u32 {
        /// Project as if the target were not rotated
        const IGNORE_ROTATION = 0b0000_0001;
        /// Blend with pre-multiplied alpha when the target supports it
        const PRE_MULTIPLIED_ALPHA = 0b0000_0010;
    }
}

/// Draw device errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DrawError {
    #[error("backend failed to create the {0} texture")]
    TextureCreation(&'static str),
    #[error("backend failed to reset")]
    BackendReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceState {
    /// No GPU resources, waiting for `reset`
    Invalid,
    Valid,
    Drawing,
}

/// A transparent primitive in submission order
#[derive(Debug, Clone, Copy, PartialEq)]
struct TransparentEntry {
    bucket_type: InstanceBucketType,
    index: usize,
    depth: f32,
}

/// Snapshot of the current batch, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    pub world_matrices: usize,
    pub textures: usize,
    pub textures_using_palette: usize,
    pub palettes: usize,
    pub palette_remaps: usize,
    /// Instances waiting in buckets
    pub pending_instances: usize,
    pub transparent_instances: usize,
    /// Flushes that submitted a batch since the device was created
    pub flush_count: u64,
}

/// Batching engine over a GPU backend.
///
/// Owned and used by a single thread.
pub struct DrawDevice<B: DrawBackend> {
    backend: B,
    state: DeviceState,

    buckets: InstanceBuckets,
    transparent_instances: Vec<TransparentEntry>,
    depth: DepthCounter,

    view_matrix: Mat4,
    vs_constants_0: VsConstants0,
    ps_constants_0: PsConstants0,
    model_matrices: Vec<[f32; 16]>,

    world_matrix_stack: MatrixStack,
    world_matrices: IndexDictionary<[u32; 16], Mat4>,
    world_matrix_index: u32,
    world_matrix_version: u64,

    textures: TextureSlots,
    textures_using_palette: TextureSlots,

    palette_stack: Vec<Option<PaletteRef>>,
    palettes: IndexDictionary<u64, Option<PaletteRef>>,
    palette_index: u32,
    palette_texture: Option<TextureViewRef>,
    palette_texture_hashes: Vec<u64>,

    palette_remap_stack: Vec<PaletteRemap>,
    palette_remaps: IndexDictionary<u64, PaletteRemap>,
    palette_remap_index: u32,
    palette_remap_texture: Option<TextureViewRef>,
    palette_remap_texture_hashes: Vec<u64>,

    sampler_stack: Vec<bool>,
    custom_context_stack: Vec<CustomContextFn<B>>,
    force_opaque: u32,
    force_pre_multiplied_alpha: u32,
    /// Depth of the pre-multiplied alpha stack set by the draw options
    session_pre_multiplied_alpha: u32,
    target_requires_palette: bool,

    flush_count: u64,
}

impl<B: DrawBackend> DrawDevice<B> {
    /// Creates an invalid device; call [`DrawDevice::reset`] before drawing
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: DeviceState::Invalid,
            buckets: InstanceBuckets::new(),
            transparent_instances: Vec::new(),
            depth: DepthCounter::new(),
            view_matrix: Mat4::IDENTITY,
            vs_constants_0: VsConstants0::default(),
            ps_constants_0: PsConstants0::default(),
            model_matrices: Vec::with_capacity(MAX_TRANSFORM_MATRIXES),
            world_matrix_stack: MatrixStack::new(),
            world_matrices: IndexDictionary::new(MAX_TRANSFORM_MATRIXES),
            world_matrix_index: INVALID_INDEX,
            world_matrix_version: 0,
            textures: TextureSlots::new(MAX_TEXTURES),
            textures_using_palette: TextureSlots::new(MAX_PALETTE_TEXTURES),
            palette_stack: Vec::new(),
            palettes: IndexDictionary::new(MAX_PALETTES),
            palette_index: INVALID_INDEX,
            palette_texture: None,
            palette_texture_hashes: vec![0; MAX_PALETTES],
            palette_remap_stack: Vec::new(),
            palette_remaps: IndexDictionary::new(MAX_PALETTE_REMAPS),
            palette_remap_index: INVALID_INDEX,
            palette_remap_texture: None,
            palette_remap_texture_hashes: vec![0; MAX_PALETTE_REMAPS],
            sampler_stack: Vec::new(),
            custom_context_stack: Vec::new(),
            force_opaque: 0,
            force_pre_multiplied_alpha: 0,
            session_pre_multiplied_alpha: 0,
            target_requires_palette: false,
            flush_count: 0,
        }
    }

    /// (Re)creates GPU resources after device creation or loss.
    ///
    /// Leaves the device valid on success and invalid on failure.
    pub fn reset(&mut self) -> Result<(), DrawError> {
        self.destroy();

        self.palette_stack.push(None);
        self.palette_texture = Some(
            self.backend
                .create_texture(PALETTE_SIZE as u32, MAX_PALETTES as u32, TextureFormat::Rgba8Unorm)
                .ok_or(DrawError::TextureCreation("palette"))?,
        );

        self.palette_remap_stack.push(PaletteRemap::identity());
        self.palette_remap_texture = Some(
            self.backend
                .create_texture(PALETTE_SIZE as u32, MAX_PALETTE_REMAPS as u32, TextureFormat::R8Uint)
                .ok_or(DrawError::TextureCreation("palette remap"))?,
        );

        self.sampler_stack.push(false);
        self.custom_context_stack.push(Box::new(|_, _, _| true));

        if !self.backend.internal_reset() {
            return Err(DrawError::BackendReset);
        }

        self.state = DeviceState::Valid;
        tracing::debug!("Draw device reset");
        Ok(())
    }

    /// Releases GPU resources and returns to the invalid state
    pub fn destroy(&mut self) {
        self.state = DeviceState::Invalid;
        self.backend.internal_destroy();

        self.vs_constants_0 = VsConstants0::default();
        self.ps_constants_0 = PsConstants0::default();
        self.view_matrix = Mat4::IDENTITY;

        self.sampler_stack.clear();
        self.custom_context_stack.clear();

        self.world_matrix_stack.reset();
        self.world_matrices.clear();
        self.world_matrix_index = INVALID_INDEX;

        self.textures.clear();
        self.textures_using_palette.clear();

        self.palette_stack.clear();
        self.palettes.clear();
        self.palette_index = INVALID_INDEX;
        self.palette_texture = None;
        self.palette_texture_hashes.fill(0);

        self.palette_remap_stack.clear();
        self.palette_remaps.clear();
        self.palette_remap_index = INVALID_INDEX;
        self.palette_remap_texture = None;
        self.palette_remap_texture_hashes.fill(0);

        self.transparent_instances.clear();
        self.depth.reset();
        self.force_opaque = 0;
        self.force_pre_multiplied_alpha = 0;
        self.session_pre_multiplied_alpha = 0;
        self.buckets.reset();
    }

    /// Starts a draw session into `target`.
    ///
    /// Ends any session already in progress. Returns `None` when the device
    /// is invalid, `world_rect` has no area, `view_rect` has no positive area,
    /// or the backend cannot set up the target; callers skip drawing for that
    /// frame. The session ends when the returned scope is dropped.
    pub fn begin_draw(
        &mut self,
        context: &mut dyn CommandContext,
        target: &mut dyn Target,
        depth: Option<&mut dyn DepthTarget>,
        view_rect: Rect,
        world_rect: Rect,
        options: DrawOptions,
    ) -> Option<DrawScope<'_, B>> {
        self.end_draw();

        if self.state == DeviceState::Invalid {
            tracing::warn!("begin_draw on a device that has not been reset");
            return None;
        }

        let ignore_rotation = options.contains(DrawOptions::IGNORE_ROTATION);
        let size = target.size();
        let Some(view_matrix) = view::view_matrix(&size, &view_rect, &world_rect, ignore_rotation) else {
            tracing::debug!(?view_rect, ?world_rect, "Rejected draw with an empty view or world rect");
            return None;
        };

        if !self
            .backend
            .internal_setup(context, target, depth, &view_rect, ignore_rotation)
        {
            tracing::debug!("Backend setup failed, skipping draw");
            return None;
        }

        let format = target.format();
        self.view_matrix = view_matrix;
        self.vs_constants_0.view_scale = view::view_scale(&size, &view_rect, &world_rect).to_array();
        self.target_requires_palette = format.is_palette();
        self.session_pre_multiplied_alpha = u32::from(
            options.contains(DrawOptions::PRE_MULTIPLIED_ALPHA) && format.supports_pre_multiplied_alpha(),
        );
        self.force_pre_multiplied_alpha = self.session_pre_multiplied_alpha;
        self.state = DeviceState::Drawing;

        Some(DrawScope { device: self })
    }

    /// Flushes pending geometry and leaves the session. No-op when not drawing.
    pub fn end_draw(&mut self) {
        if self.state != DeviceState::Drawing {
            return;
        }

        self.flush(true);
        self.state = DeviceState::Valid;

        if self.has_unbalanced_state() {
            tracing::warn!("Draw session ended with unbalanced push/pop state");
        }

        self.palette_stack.truncate(1);
        self.palette_remap_stack.truncate(1);
        self.sampler_stack.truncate(1);
        self.custom_context_stack.truncate(1);
        self.palette_index = INVALID_INDEX;
        self.palette_remap_index = INVALID_INDEX;
        self.world_matrix_stack.reset();
        self.depth.reset_session();
        self.force_opaque = 0;
        self.force_pre_multiplied_alpha = 0;
        self.session_pre_multiplied_alpha = 0;
    }

    /// True when a push inside the session has no matching pop
    fn has_unbalanced_state(&self) -> bool {
        self.palette_stack.len() > 1
            || self.palette_remap_stack.len() > 1
            || self.sampler_stack.len() > 1
            || self.custom_context_stack.len() > 1
            || self.depth.no_overlap_active()
            || self.force_opaque > 0
            || self.force_pre_multiplied_alpha != self.session_pre_multiplied_alpha
    }

    pub fn is_valid(&self) -> bool {
        self.state != DeviceState::Invalid
    }

    pub fn is_drawing(&self) -> bool {
        self.state == DeviceState::Drawing
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Matrix applied to everything drawn after it changes
    pub fn world_matrix_stack(&mut self) -> &mut MatrixStack {
        &mut self.world_matrix_stack
    }

    pub fn target_requires_palette(&self) -> bool {
        self.target_requires_palette
    }

    pub fn pre_multiplied_alpha(&self) -> bool {
        self.force_pre_multiplied_alpha > 0
    }

    pub fn linear_sampler(&self) -> bool {
        self.sampler_stack.last().copied().unwrap_or(false)
    }

    pub fn batch_stats(&self) -> BatchStats {
        BatchStats {
            world_matrices: self.world_matrices.len(),
            textures: self.textures.len(),
            textures_using_palette: self.textures_using_palette.len(),
            palettes: self.palettes.len(),
            palette_remaps: self.palette_remaps.len(),
            pending_instances: self.buckets.pending_count(),
            transparent_instances: self.transparent_instances.len(),
            flush_count: self.flush_count,
        }
    }

    // ========================================================================
    // State stacks
    // ========================================================================

    /// Palette used by palette sprites. Ignored for palette-indexed targets,
    /// which keep indices as they are. Also pushes the palette's remap.
    pub fn push_palette(&mut self, palette: PaletteRef) {
        if !self.target_requires_palette {
            self.palette_stack.push(Some(palette.clone()));
            self.palette_index = INVALID_INDEX;
        }

        self.push_palette_remap(palette.remap());
    }

    pub fn pop_palette(&mut self) {
        if !self.target_requires_palette {
            debug_assert!(self.palette_stack.len() > 1, "unbalanced pop_palette");
            if self.palette_stack.len() > 1 {
                self.palette_stack.pop();
            }
            self.palette_index = INVALID_INDEX;
        }

        self.pop_palette_remap();
    }

    pub fn push_palette_remap(&mut self, remap: PaletteRemap) {
        self.palette_remap_stack.push(remap);
        self.palette_remap_index = INVALID_INDEX;
    }

    pub fn pop_palette_remap(&mut self) {
        debug_assert!(self.palette_remap_stack.len() > 1, "unbalanced pop_palette_remap");
        if self.palette_remap_stack.len() > 1 {
            self.palette_remap_stack.pop();
        }
        self.palette_remap_index = INVALID_INDEX;
    }

    /// Primitives drawn until the matching pop share one depth
    pub fn push_no_overlap(&mut self) {
        self.depth.push_no_overlap();
    }

    pub fn pop_no_overlap(&mut self) {
        self.depth.pop_no_overlap();
    }

    /// Treat partially transparent primitives as opaque
    pub fn push_opaque(&mut self) {
        self.force_opaque += 1;
    }

    pub fn pop_opaque(&mut self) {
        debug_assert!(self.force_opaque > 0, "unbalanced pop_opaque");
        self.force_opaque = self.force_opaque.saturating_sub(1);
    }

    pub fn push_pre_multiplied_alpha(&mut self) {
        if self.force_pre_multiplied_alpha == 0 {
            self.flush(false);
        }

        self.force_pre_multiplied_alpha += 1;
    }

    pub fn pop_pre_multiplied_alpha(&mut self) {
        debug_assert!(self.force_pre_multiplied_alpha > 0, "unbalanced pop_pre_multiplied_alpha");

        if self.force_pre_multiplied_alpha == 1 {
            self.flush(false);
        }

        self.force_pre_multiplied_alpha = self.force_pre_multiplied_alpha.saturating_sub(1);
    }

    /// Hook called before each draw call of later flushes
    pub fn push_custom_context(&mut self, func: CustomContextFn<B>) {
        self.flush(false);
        self.custom_context_stack.push(func);
    }

    pub fn pop_custom_context(&mut self) {
        debug_assert!(self.custom_context_stack.len() > 1, "unbalanced pop_custom_context");

        self.flush(false);
        if self.custom_context_stack.len() > 1 {
            self.custom_context_stack.pop();
        }
    }

    pub fn push_sampler_linear_filter(&mut self, linear_filter: bool) {
        if linear_filter != self.linear_sampler() && self.backend.flush_for_sampler_change() {
            self.flush(false);
        }

        self.sampler_stack.push(linear_filter);
    }

    pub fn pop_sampler_linear_filter(&mut self) {
        debug_assert!(self.sampler_stack.len() > 1, "unbalanced pop_sampler_linear_filter");
        if self.sampler_stack.len() <= 1 {
            return;
        }

        let current = self.linear_sampler();
        let previous = self.sampler_stack[self.sampler_stack.len() - 2];
        if current != previous && self.backend.flush_for_sampler_change() {
            self.flush(false);
        }

        self.sampler_stack.pop();
    }

    fn allow_transparent(&self) -> bool {
        self.force_opaque == 0 && !self.target_requires_palette
    }

    fn palette_remap(&self) -> PaletteRemap {
        self.palette_remap_stack
            .last()
            .cloned()
            .unwrap_or_default()
    }

    fn check_drawing(&self) -> bool {
        debug_assert!(
            self.state == DeviceState::Drawing,
            "draw call outside of begin_draw/end_draw"
        );
        self.state == DeviceState::Drawing
    }
}

impl<B: DrawBackend> Drop for DrawDevice<B> {
    fn drop(&mut self) {
        if self.state != DeviceState::Invalid {
            self.destroy();
        }
    }
}

/// An active draw session. Ends the session when dropped.
pub struct DrawScope<'a, B: DrawBackend> {
    device: &'a mut DrawDevice<B>,
}

impl<B: DrawBackend> Deref for DrawScope<'_, B> {
    type Target = DrawDevice<B>;

    fn deref(&self) -> &Self::Target {
        self.device
    }
}

impl<B: DrawBackend> DerefMut for DrawScope<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.device
    }
}

impl<B: DrawBackend> Drop for DrawScope<'_, B> {
    fn drop(&mut self) {
        self.device.end_draw();
    }
}
