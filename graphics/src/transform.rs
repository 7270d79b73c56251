//! Sprite transforms and the world matrix stack

use glam::{Mat4, Vec2};
use smallvec::SmallVec;

use crate::color::Color;

/// Placement of a single sprite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub scale: Vec2,
    /// Counter-clockwise, in degrees
    pub rotation: f32,
    pub color: Color,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            color: Color::WHITE,
        }
    }

    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Stack of world matrices applied to everything drawn.
///
/// Every change bumps [`MatrixStack::version`] so the draw device can tell
/// when its cached matrix index is stale.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: SmallVec<[Mat4; 8]>,
    version: u64,
}

impl MatrixStack {
    pub fn new() -> Self {
        let mut stack = SmallVec::new();
        stack.push(Mat4::IDENTITY);
        Self { stack, version: 0 }
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.stack[self.stack.len() - 1]
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Duplicates the current matrix
    pub fn push(&mut self) {
        let top = *self.matrix();
        self.stack.push(top);
    }

    pub fn pop(&mut self) {
        debug_assert!(self.stack.len() > 1, "matrix stack underflow");
        if self.stack.len() > 1 {
            let previous = self.stack.pop();
            if previous.as_ref() != Some(self.matrix()) {
                self.version += 1;
            }
        }
    }

    pub fn set(&mut self, matrix: Mat4) {
        let last = self.stack.len() - 1;
        if self.stack[last] != matrix {
            self.stack[last] = matrix;
            self.version += 1;
        }
    }

    /// Post-multiplies the current matrix by `matrix`
    pub fn transform(&mut self, matrix: &Mat4) {
        let combined = *self.matrix() * *matrix;
        self.set(combined);
    }

    /// Back to a single identity entry
    pub fn reset(&mut self) {
        let changed = self.stack.len() > 1 || *self.matrix() != Mat4::IDENTITY;
        self.stack.truncate(1);
        self.stack[0] = Mat4::IDENTITY;
        if changed {
            self.version += 1;
        }
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}
