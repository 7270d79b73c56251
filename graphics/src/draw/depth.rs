//! Depth assignment for submitted primitives

use super::RENDER_DEPTH_DELTA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastDepthType {
    /// Nothing submitted since the last flush
    None,
    Instance,
    InstanceNoOverlap,
}

/// Monotonic depth counter with no-overlap runs.
///
/// Each submission moves the depth forward by [`RENDER_DEPTH_DELTA`], except
/// consecutive submissions while no-overlap is pushed, which share one depth.
#[derive(Debug, Clone)]
pub(crate) struct DepthCounter {
    depth: f32,
    last: LastDepthType,
    no_overlap: u32,
}

impl DepthCounter {
    pub fn new() -> Self {
        Self {
            depth: 0.0,
            last: LastDepthType::None,
            no_overlap: 0,
        }
    }

    pub fn nudge(&mut self) -> f32 {
        let depth_type = if self.no_overlap > 0 {
            LastDepthType::InstanceNoOverlap
        } else {
            LastDepthType::Instance
        };

        if depth_type != LastDepthType::InstanceNoOverlap || self.last != depth_type {
            self.depth += RENDER_DEPTH_DELTA;
        }

        self.last = depth_type;
        self.depth
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Whether anything was submitted since the last [`DepthCounter::batch_flushed`]
    pub fn has_pending(&self) -> bool {
        self.last != LastDepthType::None
    }

    pub fn batch_flushed(&mut self) {
        self.last = LastDepthType::None;
    }

    pub fn push_no_overlap(&mut self) {
        self.no_overlap += 1;
    }

    pub fn pop_no_overlap(&mut self) {
        debug_assert!(self.no_overlap > 0, "unbalanced pop_no_overlap");
        self.no_overlap = self.no_overlap.saturating_sub(1);

        if self.no_overlap == 0 && self.last == LastDepthType::InstanceNoOverlap {
            self.last = LastDepthType::Instance;
        }
    }

    pub fn no_overlap_active(&self) -> bool {
        self.no_overlap > 0
    }

    /// Start of a new draw session
    pub fn reset_session(&mut self) {
        self.depth = 0.0;
        self.no_overlap = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
