//! Index allocation and batch submission

use bytemuck::Pod;

use crate::texture::TextureViewRef;

use super::backend::{DrawBackend, ShaderInput};
use super::bucket::{Bucket, InstanceBuckets};
use super::index::INVALID_INDEX;
use super::instance::InstanceBucketType;
use super::{DrawDevice, TransparentEntry};

impl<B: DrawBackend> DrawDevice<B> {
    /// Submits pending instances to the backend and starts a new batch
    pub(crate) fn flush(&mut self, end_draw: bool) {
        if !self.depth.has_pending() {
            if end_draw {
                self.backend.internal_flush(true);
            }
            return;
        }

        match self.create_instance_buffer() {
            Some(0) => {}
            Some(_) => self.submit_batch(),
            None => {
                tracing::warn!(
                    "Failed to map instance buffer, dropping {} instances",
                    self.buckets.pending_count()
                );
                for bucket in self.buckets.iter_mut() {
                    bucket.clear_items();
                }
            }
        }

        self.world_matrices.clear();
        self.world_matrix_index = INVALID_INDEX;
        self.textures.clear();
        self.textures_using_palette.clear();
        self.palettes.clear();
        self.palette_index = INVALID_INDEX;
        self.palette_remaps.clear();
        self.palette_remap_index = INVALID_INDEX;
        self.transparent_instances.clear();
        self.depth.batch_flushed();
        self.flush_count += 1;

        self.backend.internal_flush(end_draw);
    }

    /// Packs every bucket into the shared instance buffer.
    ///
    /// Returns the packed size in bytes, or `None` if the buffer could not be mapped.
    fn create_instance_buffer(&mut self) -> Option<usize> {
        let mut byte_size: usize = 0;
        for bucket in self.buckets.iter_mut() {
            let item_size = bucket.item_size();
            byte_size = byte_size.next_multiple_of(item_size);
            bucket.render_start(byte_size / item_size);
            byte_size += bucket.byte_size();
        }

        if byte_size == 0 {
            return Some(0);
        }

        let buffer = self.backend.instance_buffer();
        let mapped = buffer.map(byte_size)?;
        if mapped.len() < byte_size {
            buffer.unmap();
            return None;
        }

        for bucket in self.buckets.iter_mut() {
            if bucket.render_count() > 0 {
                let start = bucket.render_offset() * bucket.item_size();
                mapped[start..start + bucket.byte_size()].copy_from_slice(bucket.data());
                bucket.clear_items();
            }
        }

        buffer.unmap();
        Some(byte_size)
    }

    fn submit_batch(&mut self) {
        self.backend.internal_flush_begin();

        self.vs_constants_0.projection = self.view_matrix.to_cols_array_2d();
        upload(self.backend.vs_constants_buffer_0(), &[self.vs_constants_0]);

        self.model_matrices.clear();
        self.model_matrices.resize(self.world_matrices.len(), [0.0; 16]);
        for (_, matrix, index) in self.world_matrices.iter() {
            self.model_matrices[index as usize] = matrix.to_cols_array();
        }
        upload(self.backend.vs_constants_buffer_1(), &self.model_matrices);

        if self.textures_using_palette.len() > 0 {
            for (i, view) in self.textures_using_palette.views().iter().enumerate() {
                let (width, height) = view.size();
                self.ps_constants_0.texture_palette_sizes[i] = [width as f32, height as f32, 0.0, 0.0];
            }
            upload(self.backend.ps_constants_buffer_0(), &[self.ps_constants_0]);
        }

        if self.target_requires_palette || self.textures_using_palette.len() > 0 {
            self.update_palette_textures();
        }

        self.backend.apply_shader_input(&ShaderInput {
            textures: self.textures.views(),
            textures_using_palette: self.textures_using_palette.views(),
            palette_texture: self.palette_texture.as_ref(),
            palette_remap_texture: self.palette_remap_texture.as_ref(),
        });

        let pre_multiplied_alpha = self.force_pre_multiplied_alpha > 0;
        if let Some(custom) = self.custom_context_stack.last_mut() {
            draw_opaque_instances(&mut self.backend, &self.buckets, custom.as_mut());
            draw_transparent_instances(
                &mut self.backend,
                &self.buckets,
                &self.transparent_instances,
                pre_multiplied_alpha,
                custom.as_mut(),
            );
        }

        self.backend.internal_flush_end();
    }

    /// Uploads palette and remap rows whose content changed since their last upload
    fn update_palette_textures(&mut self) {
        if let Some(texture) = &self.palette_texture {
            for (hash, palette, index) in self.palettes.iter() {
                let Some(palette) = palette else { continue };
                let slot = &mut self.palette_texture_hashes[index as usize];
                if *slot != *hash {
                    *slot = *hash;
                    self.backend
                        .update_texture_row(texture, index as usize, palette.current_row());
                }
            }
        }

        if let Some(texture) = &self.palette_remap_texture {
            for (hash, remap, index) in self.palette_remaps.iter() {
                let slot = &mut self.palette_remap_texture_hashes[index as usize];
                if *slot != *hash {
                    *slot = *hash;
                    self.backend
                        .update_texture_row(texture, index as usize, remap.table());
                }
            }
        }
    }

    // ========================================================================
    // Batch indices
    // ========================================================================

    fn world_matrix_index_no_flush(&mut self) -> u32 {
        let version = self.world_matrix_stack.version();
        if self.world_matrix_version != version {
            self.world_matrix_version = version;
            self.world_matrix_index = INVALID_INDEX;
        }

        if self.world_matrix_index == INVALID_INDEX {
            let matrix = *self.world_matrix_stack.matrix();
            let key = matrix.to_cols_array().map(f32::to_bits);
            self.world_matrix_index = self.world_matrices.get_or_insert(key, || matrix);
        }

        self.world_matrix_index
    }

    /// Index of the current world matrix, flushing once if the batch is full
    pub(crate) fn world_matrix_index(&mut self) -> u32 {
        let index = self.world_matrix_index_no_flush();
        if index != INVALID_INDEX {
            return index;
        }

        tracing::trace!("World matrix slots full, flushing");
        self.flush(false);
        self.world_matrix_index_no_flush()
    }

    fn texture_index_no_flush(&mut self, view: &TextureViewRef, use_palette: bool) -> u32 {
        // A texture only takes a slot once its palette and remap rows fit
        if use_palette {
            let palette = self.palette_index_no_flush();
            let remap = self.palette_remap_index_no_flush();
            if palette == INVALID_INDEX || remap == INVALID_INDEX {
                return INVALID_INDEX;
            }

            let texture = self.textures_using_palette.get_or_insert(view);
            if texture != INVALID_INDEX {
                return texture | (palette << 8) | (remap << 16);
            }
        } else {
            let remap = if self.target_requires_palette {
                self.palette_remap_index_no_flush()
            } else {
                0
            };
            if remap == INVALID_INDEX {
                return INVALID_INDEX;
            }

            let texture = self.textures.get_or_insert(view);
            let sampler = u32::from(self.linear_sampler());
            if texture != INVALID_INDEX {
                return texture | (sampler << 8) | (remap << 16);
            }
        }

        INVALID_INDEX
    }

    fn palette_index_no_flush(&mut self) -> u32 {
        if self.target_requires_palette {
            return 0;
        }

        if self.palette_index == INVALID_INDEX {
            let palette = self.palette_stack.last().cloned().flatten();
            let hash = palette.as_ref().map_or(0, |palette| palette.row_hash());
            self.palette_index = self.palettes.get_or_insert(hash, || palette);
        }

        self.palette_index
    }

    fn palette_remap_index_no_flush(&mut self) -> u32 {
        if self.palette_remap_index == INVALID_INDEX {
            let remap = self.palette_remap();
            self.palette_remap_index = self.palette_remaps.get_or_insert(remap.hash(), || remap);
        }

        self.palette_remap_index
    }

    fn world_matrix_and_texture_index_no_flush(&mut self, view: &TextureViewRef, use_palette: bool) -> u32 {
        let matrix = self.world_matrix_index_no_flush();
        let texture = self.texture_index_no_flush(view, use_palette);

        if matrix == INVALID_INDEX || texture == INVALID_INDEX {
            INVALID_INDEX
        } else {
            (matrix << 24) | texture
        }
    }

    /// Packed matrix and texture indices for a sprite, flushing once if the
    /// batch is full. `INVALID_INDEX` means the sprite cannot be drawn.
    pub(crate) fn world_matrix_and_texture_index(&mut self, view: &TextureViewRef, use_palette: bool) -> u32 {
        let indexes = self.world_matrix_and_texture_index_no_flush(view, use_palette);
        if indexes != INVALID_INDEX {
            return indexes;
        }

        tracing::trace!("Texture or palette slots full, flushing");
        self.flush(false);
        self.world_matrix_and_texture_index_no_flush(view, use_palette)
    }

    /// Appends an instance, recording its submission order when transparent
    pub(crate) fn add_instance<T: Pod>(&mut self, bucket_type: InstanceBucketType, depth: f32, item: &T) {
        let Some(bucket) = self.buckets.typed_mut::<T>(bucket_type) else {
            debug_assert!(false, "{bucket_type:?} does not hold {}", std::any::type_name::<T>());
            return;
        };

        if bucket_type.is_transparent() {
            debug_assert!(self.force_opaque == 0, "transparent instance while opaque is forced");
            self.transparent_instances.push(TransparentEntry {
                bucket_type,
                index: bucket.count(),
                depth,
            });
        }

        bucket.add(Some(item));
    }
}

fn upload<T: Pod>(buffer: &mut dyn super::GpuBuffer, data: &[T]) {
    if !buffer.update(bytemuck::cast_slice(data)) {
        tracing::warn!("Failed to update constant buffer ({} bytes)", std::mem::size_of_val(data));
    }
}

fn draw_opaque_instances<B: DrawBackend>(backend: &mut B, buckets: &InstanceBuckets, custom: &mut dyn FnMut(&mut B, InstanceBucketType, bool) -> bool) {
    let mut state_applied = false;

    for bucket_type in &InstanceBucketType::ALL[..InstanceBucketType::FIRST_TRANSPARENT.index()] {
        let bucket = buckets.get(*bucket_type);
        if bucket.render_count() == 0 {
            continue;
        }

        if !state_applied {
            backend.apply_opaque_state();
            state_applied = true;
        }

        if backend.apply_instance_state(*bucket_type) && custom(backend, *bucket_type, true) {
            backend.draw(*bucket_type, bucket.render_offset(), bucket.render_count());
        }
    }
}

/// Draws transparent instances in submission order, merging consecutive
/// entries that share a bucket and depth and sit next to each other.
fn draw_transparent_instances<B: DrawBackend>(
    backend: &mut B,
    buckets: &InstanceBuckets,
    entries: &[TransparentEntry],
    pre_multiplied_alpha: bool,
    custom: &mut dyn FnMut(&mut B, InstanceBucketType, bool) -> bool,
) {
    if entries.is_empty() {
        return;
    }

    backend.apply_transparent_state(pre_multiplied_alpha);

    let mut i = 0;
    while i < entries.len() {
        let entry = entries[i];
        let mut count = 1;
        i += 1;

        while let Some(next) = entries.get(i) {
            if next.bucket_type != entry.bucket_type
                || next.depth != entry.depth
                || next.index != entry.index + count
            {
                break;
            }
            count += 1;
            i += 1;
        }

        if backend.apply_instance_state(entry.bucket_type) && custom(backend, entry.bucket_type, false) {
            let start = buckets.get(entry.bucket_type).render_offset() + entry.index;
            backend.draw(entry.bucket_type, start, count);
        }
    }
}
