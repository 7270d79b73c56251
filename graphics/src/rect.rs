//! Axis-aligned float rectangles

use glam::Vec2;

/// Rectangle in left/top/right/bottom form.
///
/// Not required to be normalized: world rectangles may be flipped to mirror
/// the projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_points(top_left: Vec2, bottom_right: Vec2) -> Self {
        Self::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
    }

    pub fn from_size(size: Vec2) -> Self {
        Self::new(0.0, 0.0, size.x, size.y)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// Signed area, negative when exactly one axis is flipped
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.right, self.bottom)
    }

    /// Swaps edges so that `left <= right` and `top <= bottom`
    pub fn normalize(&self) -> Self {
        Self::new(
            self.left.min(self.right),
            self.top.min(self.bottom),
            self.left.max(self.right),
            self.top.max(self.bottom),
        )
    }

    /// Moves every edge inward by `amount` (outward when negative)
    pub fn deflate(&self, amount: f32) -> Self {
        Self::new(
            self.left + amount,
            self.top + amount,
            self.right - amount,
            self.bottom - amount,
        )
    }

    pub fn offset(&self, by: Vec2) -> Self {
        Self::new(
            self.left + by.x,
            self.top + by.y,
            self.right + by.x,
            self.bottom + by.y,
        )
    }

    pub fn scale(&self, by: Vec2) -> Self {
        Self::new(
            self.left * by.x,
            self.top * by.y,
            self.right * by.x,
            self.bottom * by.y,
        )
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_flipped() {
        let rect = Rect::new(10.0, 20.0, 0.0, 5.0).normalize();
        assert_eq!(rect, Rect::new(0.0, 5.0, 10.0, 20.0));
        assert_eq!(rect.area(), 150.0);
    }

    #[test]
    fn test_signed_area() {
        assert_eq!(Rect::new(0.0, 1.0, 1.0, 0.0).area(), -1.0);
        assert_eq!(Rect::new(0.0, 0.0, 0.0, 5.0).area(), 0.0);
    }

    #[test]
    fn test_deflate() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(rect.deflate(2.0), Rect::new(2.0, 2.0, 8.0, 8.0));
        assert_eq!(rect.deflate(-1.0), Rect::new(-1.0, -1.0, 11.0, 11.0));
    }
}
