//! Sprite geometry and polyline endpoints

use glam::Vec2;

use crate::color::Color;
use crate::rect::Rect;
use crate::texture::TextureViewRef;

bitflags::bitflags! {
    /// Sprite content flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SpriteType: u8 {
        /// Texture holds palette indices
        const PALETTE = 0b0000_0001;
        /// Texture has partially transparent texels
        const TRANSPARENT = 0b0000_0010;
    }
}

/// A rectangular region of a texture, placed relative to a handle point
#[derive(Clone)]
pub struct SpriteData {
    view: Option<TextureViewRef>,
    texture_uv: Rect,
    world: Rect,
    sprite_type: SpriteType,
}

impl SpriteData {
    /// Builds a sprite from a texel rectangle of `view`.
    ///
    /// `handle` is the origin in texels relative to the rectangle's top-left;
    /// `scale` converts texels to world units.
    pub fn new(
        view: TextureViewRef,
        texture_rect: Rect,
        handle: Vec2,
        scale: Vec2,
        sprite_type: SpriteType,
    ) -> Self {
        let (width, height) = view.size();
        let texture_size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        let texture_uv = Rect::new(
            texture_rect.left / texture_size.x,
            texture_rect.top / texture_size.y,
            texture_rect.right / texture_size.x,
            texture_rect.bottom / texture_size.y,
        );
        let world = Rect::from_points(-handle * scale, (texture_rect.size() - handle) * scale);

        Self {
            view: Some(view),
            texture_uv,
            world,
            sprite_type,
        }
    }

    pub fn from_parts(
        view: Option<TextureViewRef>,
        texture_uv: Rect,
        world: Rect,
        sprite_type: SpriteType,
    ) -> Self {
        Self {
            view,
            texture_uv,
            world,
            sprite_type,
        }
    }

    pub fn view(&self) -> Option<&TextureViewRef> {
        self.view.as_ref()
    }

    pub fn texture_uv(&self) -> Rect {
        self.texture_uv
    }

    pub fn world(&self) -> Rect {
        self.world
    }

    pub fn sprite_type(&self) -> SpriteType {
        self.sprite_type
    }
}

/// One point of a line, line strip, triangle or circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub pos: Vec2,
    /// `None` inherits the color of a neighboring point
    pub color: Option<Color>,
    /// Thickness for lines, radius for circles
    pub size: f32,
}

impl Endpoint {
    pub fn new(pos: Vec2, color: Option<Color>, size: f32) -> Self {
        Self { pos, color, size }
    }
}
