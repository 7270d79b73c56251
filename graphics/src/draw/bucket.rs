//! Per-kind instance staging buffers

use std::any::Any;

use bytemuck::Pod;

use super::MIN_INSTANCE_BUCKET_COUNT;
use super::instance::{
    CircleFilledInstance, CircleOutlineInstance, InstanceBucketType, LineInstance,
    LineStripInstance, RectangleFilledInstance, RectangleOutlineInstance, RotatedSpriteInstance,
    SpriteInstance, TriangleFilledInstance,
};

/// The operations the flush loop needs without knowing a bucket's item type
pub trait Bucket {
    fn bucket_type(&self) -> InstanceBucketType;
    fn item_size(&self) -> usize;
    fn item_align(&self) -> usize;
    fn count(&self) -> usize;
    fn byte_size(&self) -> usize;
    /// Raw bytes of every item added since the last `clear_items`
    fn data(&self) -> &[u8];
    fn clear_items(&mut self);
    /// Releases the backing storage
    fn reset(&mut self);
    /// Records where this bucket's items start in the shared instance buffer,
    /// in items, and freezes the render count
    fn render_start(&mut self, start: usize);
    fn render_offset(&self) -> usize;
    fn render_count(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Growable buffer of one POD instance type
#[derive(Debug)]
pub struct InstanceBucket<T: Pod> {
    bucket_type: InstanceBucketType,
    items: Vec<T>,
    render_start: usize,
    render_count: usize,
}

impl<T: Pod> InstanceBucket<T> {
    pub fn new(bucket_type: InstanceBucketType) -> Self {
        Self {
            bucket_type,
            items: Vec::new(),
            render_start: 0,
            render_count: 0,
        }
    }

    /// Appends a copy of `item`, or a zeroed slot when `None`, and returns the
    /// new slot for the caller to fill in.
    pub fn add(&mut self, item: Option<&T>) -> &mut T {
        if self.items.len() == self.items.capacity() {
            let new_capacity = (self.items.capacity() * 2).max(MIN_INSTANCE_BUCKET_COUNT);
            tracing::debug!(
                "Growing {:?} bucket: {} → {}",
                self.bucket_type,
                self.items.capacity(),
                new_capacity
            );
            self.items.reserve_exact(new_capacity - self.items.len());
        }

        let index = self.items.len();
        self.items.push(item.copied().unwrap_or_else(T::zeroed));
        &mut self.items[index]
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }
}

impl<T: Pod> Bucket for InstanceBucket<T> {
    fn bucket_type(&self) -> InstanceBucketType {
        self.bucket_type
    }

    fn item_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn item_align(&self) -> usize {
        std::mem::align_of::<T>()
    }

    fn count(&self) -> usize {
        self.items.len()
    }

    fn byte_size(&self) -> usize {
        self.items.len() * std::mem::size_of::<T>()
    }

    fn data(&self) -> &[u8] {
        bytemuck::cast_slice(&self.items)
    }

    fn clear_items(&mut self) {
        self.items.clear();
    }

    fn reset(&mut self) {
        self.items = Vec::new();
        self.render_start = 0;
        self.render_count = 0;
    }

    fn render_start(&mut self, start: usize) {
        self.render_start = start;
        self.render_count = self.items.len();
    }

    fn render_offset(&self) -> usize {
        self.render_start
    }

    fn render_count(&self) -> usize {
        self.render_count
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One bucket per [`InstanceBucketType`], indexed by the type
pub(crate) struct InstanceBuckets {
    buckets: Vec<Box<dyn Bucket>>,
}

impl InstanceBuckets {
    pub fn new() -> Self {
        let buckets = InstanceBucketType::ALL
            .iter()
            .map(|&bucket_type| create_bucket(bucket_type))
            .collect();
        Self { buckets }
    }

    pub fn get(&self, bucket_type: InstanceBucketType) -> &dyn Bucket {
        self.buckets[bucket_type.index()].as_ref()
    }

    /// The bucket for `bucket_type` with its concrete item type.
    ///
    /// `None` when `T` is not the item type of that bucket.
    pub fn typed_mut<T: Pod>(&mut self, bucket_type: InstanceBucketType) -> Option<&mut InstanceBucket<T>> {
        self.buckets[bucket_type.index()]
            .as_any_mut()
            .downcast_mut::<InstanceBucket<T>>()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Bucket> {
        self.buckets.iter().map(|bucket| bucket.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Bucket>> {
        self.buckets.iter_mut()
    }

    pub fn pending_count(&self) -> usize {
        self.iter().map(|bucket| bucket.count()).sum()
    }

    pub fn reset(&mut self) {
        for bucket in &mut self.buckets {
            bucket.reset();
        }
    }
}

fn create_bucket(bucket_type: InstanceBucketType) -> Box<dyn Bucket> {
    use InstanceBucketType::*;

    match bucket_type.with_transparency(false) {
        Sprites | PaletteSprites => Box::new(InstanceBucket::<SpriteInstance>::new(bucket_type)),
        RotatedSprites | RotatedPaletteSprites => {
            Box::new(InstanceBucket::<RotatedSpriteInstance>::new(bucket_type))
        }
        Lines => Box::new(InstanceBucket::<LineInstance>::new(bucket_type)),
        LineStrips => Box::new(InstanceBucket::<LineStripInstance>::new(bucket_type)),
        Triangles => Box::new(InstanceBucket::<TriangleFilledInstance>::new(bucket_type)),
        RectanglesFilled => Box::new(InstanceBucket::<RectangleFilledInstance>::new(bucket_type)),
        RectanglesOutline => {
            Box::new(InstanceBucket::<RectangleOutlineInstance>::new(bucket_type))
        }
        CirclesFilled => Box::new(InstanceBucket::<CircleFilledInstance>::new(bucket_type)),
        _ => Box::new(InstanceBucket::<CircleOutlineInstance>::new(bucket_type)),
    }
}
