//! Test doubles for the draw device
//!
//! `RecordingBackend` logs every backend call so tests can assert on flush
//! structure without a GPU.

use std::any::Any;
use std::sync::Arc;

use crate::draw::{DrawBackend, DrawDevice, DrawOptions, DrawScope, GpuBuffer, InstanceBucketType, ShaderInput};
use crate::palette::{PALETTE_SIZE, Palette, PaletteRemap};
use crate::rect::Rect;
use crate::target::{CommandContext, DepthTarget, Target, WindowSize};
use crate::texture::{TextureFormat, TextureView, TextureViewRef};

/// Shows log output under `RUST_LOG` when tests run
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestTexture {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TestTexture {
    pub fn new_ref(width: u32, height: u32) -> TextureViewRef {
        Self::with_format(width, height, TextureFormat::Rgba8Unorm)
    }

    pub fn with_format(width: u32, height: u32, format: TextureFormat) -> TextureViewRef {
        Arc::new(Self { width, height, format })
    }
}

impl TextureView for TestTexture {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TestTarget {
    pub size: WindowSize,
    pub format: TextureFormat,
}

impl TestTarget {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: WindowSize::new(width, height),
            format: TextureFormat::Rgba8Unorm,
        }
    }

    pub fn palette(width: f32, height: f32) -> Self {
        Self {
            size: WindowSize::new(width, height),
            format: TextureFormat::R8Uint,
        }
    }
}

impl Target for TestTarget {
    fn size(&self) -> WindowSize {
        self.size
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct TestContext;

impl CommandContext for TestContext {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Single-row palette filled with one byte value
pub struct TestPalette {
    row: Vec<u8>,
    remap: PaletteRemap,
}

impl TestPalette {
    pub fn new_ref(fill: u8) -> Arc<dyn Palette> {
        Arc::new(Self {
            row: vec![fill; PALETTE_SIZE * 4],
            remap: PaletteRemap::identity(),
        })
    }

    pub fn with_remap(fill: u8, remap: PaletteRemap) -> Arc<dyn Palette> {
        Arc::new(Self {
            row: vec![fill; PALETTE_SIZE * 4],
            remap,
        })
    }
}

impl Palette for TestPalette {
    fn current_row(&self) -> &[u8] {
        &self.row
    }

    fn remap(&self) -> PaletteRemap {
        self.remap.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Reset,
    Destroy,
    Setup,
    FlushBegin,
    FlushEnd,
    Flush { end_draw: bool },
    ShaderInput { textures: usize, textures_using_palette: usize },
    OpaqueState,
    TransparentState { pre_multiplied_alpha: bool },
    Draw { bucket_type: InstanceBucketType, start: usize, count: usize },
    TextureRow { format: TextureFormat, row: usize },
}

#[derive(Default)]
pub struct TestBuffer {
    pub data: Vec<u8>,
    pub updates: usize,
    pub fail_map: bool,
}

impl GpuBuffer for TestBuffer {
    fn update(&mut self, data: &[u8]) -> bool {
        self.data = data.to_vec();
        self.updates += 1;
        true
    }

    fn map(&mut self, size: usize) -> Option<&mut [u8]> {
        if self.fail_map {
            return None;
        }

        if self.data.len() < size {
            self.data.resize(size, 0);
        }
        Some(&mut self.data[..size])
    }

    fn unmap(&mut self) {
        self.updates += 1;
    }
}

#[derive(Default)]
pub struct RecordingBackend {
    pub events: Vec<BackendEvent>,
    pub instances: TestBuffer,
    pub vs_constants_0: TestBuffer,
    pub vs_constants_1: TestBuffer,
    pub ps_constants_0: TestBuffer,
    pub flush_for_sampler_change: bool,
    pub fail_setup: bool,
    pub fail_reset: bool,
    pub fail_textures: bool,
    /// Buckets whose pipeline is reported as unavailable
    pub rejected_buckets: Vec<InstanceBucketType>,
}

impl RecordingBackend {
    pub fn draws(&self) -> Vec<(InstanceBucketType, usize, usize)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::Draw { bucket_type, start, count } => Some((*bucket_type, *start, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &BackendEvent) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn texture_rows(&self, format: TextureFormat) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::TextureRow { format: f, row } if *f == format => Some(*row),
                _ => None,
            })
            .collect()
    }
}

impl DrawBackend for RecordingBackend {
    fn internal_reset(&mut self) -> bool {
        self.events.push(BackendEvent::Reset);
        !self.fail_reset
    }

    fn internal_destroy(&mut self) {
        self.events.push(BackendEvent::Destroy);
    }

    fn internal_setup(
        &mut self,
        _context: &mut dyn CommandContext,
        _target: &mut dyn Target,
        _depth: Option<&mut dyn DepthTarget>,
        _view_rect: &Rect,
        _ignore_rotation: bool,
    ) -> bool {
        self.events.push(BackendEvent::Setup);
        !self.fail_setup
    }

    fn internal_flush_begin(&mut self) {
        self.events.push(BackendEvent::FlushBegin);
    }

    fn internal_flush_end(&mut self) {
        self.events.push(BackendEvent::FlushEnd);
    }

    fn internal_flush(&mut self, end_draw: bool) {
        self.events.push(BackendEvent::Flush { end_draw });
    }

    fn instance_buffer(&mut self) -> &mut dyn GpuBuffer {
        &mut self.instances
    }

    fn vs_constants_buffer_0(&mut self) -> &mut dyn GpuBuffer {
        &mut self.vs_constants_0
    }

    fn vs_constants_buffer_1(&mut self) -> &mut dyn GpuBuffer {
        &mut self.vs_constants_1
    }

    fn ps_constants_buffer_0(&mut self) -> &mut dyn GpuBuffer {
        &mut self.ps_constants_0
    }

    fn flush_for_sampler_change(&self) -> bool {
        self.flush_for_sampler_change
    }

    fn create_texture(&mut self, width: u32, height: u32, format: TextureFormat) -> Option<TextureViewRef> {
        if self.fail_textures {
            None
        } else {
            Some(TestTexture::with_format(width, height, format))
        }
    }

    fn update_texture_row(&mut self, texture: &TextureViewRef, row: usize, _data: &[u8]) {
        self.events.push(BackendEvent::TextureRow {
            format: texture.format(),
            row,
        });
    }

    fn apply_shader_input(&mut self, input: &ShaderInput<'_>) {
        self.events.push(BackendEvent::ShaderInput {
            textures: input.textures.len(),
            textures_using_palette: input.textures_using_palette.len(),
        });
    }

    fn apply_opaque_state(&mut self) {
        self.events.push(BackendEvent::OpaqueState);
    }

    fn apply_transparent_state(&mut self, pre_multiplied_alpha: bool) {
        self.events.push(BackendEvent::TransparentState { pre_multiplied_alpha });
    }

    fn apply_instance_state(&mut self, bucket_type: InstanceBucketType) -> bool {
        !self.rejected_buckets.contains(&bucket_type)
    }

    fn draw(&mut self, bucket_type: InstanceBucketType, instance_start: usize, instance_count: usize) {
        self.events.push(BackendEvent::Draw {
            bucket_type,
            start: instance_start,
            count: instance_count,
        });
    }
}

/// A reset device over a fresh recording backend
pub fn test_device() -> DrawDevice<RecordingBackend> {
    let mut device = DrawDevice::new(RecordingBackend::default());
    device.reset().expect("reset");
    device.backend_mut().events.clear();
    device
}

/// Starts a session mapping a 256x128 world onto `target`
pub fn begin<'a>(
    device: &'a mut DrawDevice<RecordingBackend>,
    target: &mut TestTarget,
) -> DrawScope<'a, RecordingBackend> {
    device
        .begin_draw(
            &mut TestContext,
            target,
            None,
            Rect::new(0.0, 0.0, 512.0, 256.0),
            Rect::new(0.0, 0.0, 256.0, 128.0),
            DrawOptions::empty(),
        )
        .expect("begin_draw")
}
