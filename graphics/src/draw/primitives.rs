//! Primitive submission: classification and instance building

use glam::Vec2;

use crate::color::Color;
use crate::rect::Rect;
use crate::sprite::{Endpoint, SpriteData, SpriteType};
use crate::transform::Transform;

use super::backend::DrawBackend;
use super::index::INVALID_INDEX;
use super::instance::{
    CircleFilledInstance, CircleOutlineInstance, InstanceBucketType, LineInstance,
    LineStripInstance, RectangleFilledInstance, RectangleOutlineInstance, RotatedSpriteInstance,
    SpriteInstance, TriangleFilledInstance,
};
use super::DrawDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AlphaType {
    Opaque,
    Transparent,
    Invisible,
}

impl AlphaType {
    pub fn from_alpha(alpha: f32, allow_transparent: bool) -> Self {
        if alpha == 0.0 {
            Self::Invisible
        } else if alpha == 1.0 || !allow_transparent {
            Self::Opaque
        } else {
            Self::Transparent
        }
    }

    /// Combines the alpha types of the vertices of one primitive.
    /// Any disagreement needs blending, unless blending is not allowed.
    pub fn combine(self, alpha: f32, allow_transparent: bool) -> Self {
        let other = Self::from_alpha(alpha, allow_transparent);
        if other == self {
            self
        } else if allow_transparent {
            Self::Transparent
        } else {
            Self::Opaque
        }
    }

    pub fn for_sprite(sprite_type: SpriteType, alpha: f32, allow_transparent: bool) -> Self {
        match Self::from_alpha(alpha, allow_transparent) {
            // Palette textures have no partial alpha to blend
            Self::Transparent if sprite_type.contains(SpriteType::PALETTE) => Self::Opaque,
            Self::Opaque if allow_transparent && sprite_type.contains(SpriteType::TRANSPARENT) => {
                Self::Transparent
            }
            alpha_type => alpha_type,
        }
    }

    fn is_transparent(self) -> bool {
        self == Self::Transparent
    }
}

impl<B: DrawBackend> DrawDevice<B> {
    /// Draws a sprite placed by `transform`. Rotation is in degrees.
    pub fn draw_sprite(&mut self, sprite: &SpriteData, transform: &Transform) {
        if !self.check_drawing() {
            return;
        }

        let sprite_type = sprite.sprite_type();
        let alpha_type = AlphaType::for_sprite(sprite_type, transform.color.alpha(), self.allow_transparent());
        if alpha_type == AlphaType::Invisible {
            return;
        }

        let Some(view) = sprite.view() else {
            return;
        };

        let use_palette = sprite_type.contains(SpriteType::PALETTE);
        let indexes = self.world_matrix_and_texture_index(view, use_palette);
        if indexes == INVALID_INDEX {
            tracing::debug!("Dropped sprite with no free texture slot");
            return;
        }

        let color = transform.color.to_shader_color(&self.palette_remap());
        let depth = self.depth.nudge();
        let world = sprite.world().scale(transform.scale);
        let transparent = alpha_type.is_transparent();

        if transform.rotation == 0.0 {
            let bucket_type = if use_palette {
                InstanceBucketType::PaletteSprites
            } else {
                InstanceBucketType::Sprites
            };

            let instance = SpriteInstance {
                rect: world.offset(transform.position).to_array(),
                uv_rect: sprite.texture_uv().to_array(),
                color,
                depth,
                indexes,
            };
            self.add_instance(bucket_type.with_transparency(transparent), depth, &instance);
        } else {
            let bucket_type = if use_palette {
                InstanceBucketType::RotatedPaletteSprites
            } else {
                InstanceBucketType::RotatedSprites
            };

            let instance = RotatedSpriteInstance {
                rect: world.to_array(),
                uv_rect: sprite.texture_uv().to_array(),
                color,
                pos_rot: [transform.position.x, transform.position.y, depth, transform.rotation],
                indexes,
            };
            self.add_instance(bucket_type.with_transparency(transparent), depth, &instance);
        }
    }

    /// Draws a polyline through `points`.
    ///
    /// Two points make a plain line; more make a mitered strip that closes
    /// when the first and last points coincide. Points without a color use
    /// the first point's color. The whole call shares one depth.
    pub fn draw_lines(&mut self, points: &[Endpoint]) {
        if !self.check_drawing() || points.len() < 2 {
            return;
        }

        let matrix_index = self.world_matrix_index();
        if matrix_index == INVALID_INDEX {
            return;
        }

        let count = points.len();
        let closed = count > 2 && points[0].pos == points[count - 1].pos;
        let depth = self.depth.nudge();
        let default_color = points[0].color.unwrap_or(Color::NONE);
        let allow_transparent = self.allow_transparent();
        let remap = self.palette_remap();

        for i in 0..count - 1 {
            let p0 = &points[i];
            let p1 = &points[i + 1];
            if p0.pos == p1.pos || (p0.size == 0.0 && p1.size == 0.0) {
                continue;
            }

            let color0 = p0.color.unwrap_or(default_color);
            let color1 = p1.color.unwrap_or(default_color);
            let alpha_type =
                AlphaType::from_alpha(color0.alpha(), allow_transparent).combine(color1.alpha(), allow_transparent);
            if alpha_type == AlphaType::Invisible {
                continue;
            }

            let transparent = alpha_type.is_transparent();
            let start_color = color0.to_shader_color(&remap);
            let end_color = color1.to_shader_color(&remap);

            if count == 2 {
                let instance = LineInstance {
                    start: p0.pos.to_array(),
                    end: p1.pos.to_array(),
                    start_color,
                    end_color,
                    start_thickness: p0.size.abs(),
                    end_thickness: p1.size.abs(),
                    depth,
                    matrix_index,
                };
                self.add_instance(InstanceBucketType::Lines.with_transparency(transparent), depth, &instance);
            } else {
                let before_start = if i > 0 {
                    points[i - 1].pos
                } else if closed {
                    points[count - 2].pos
                } else {
                    p0.pos
                };
                let after_end = if i + 2 < count {
                    points[i + 2].pos
                } else if closed {
                    points[1].pos
                } else {
                    p1.pos
                };

                let instance = LineStripInstance {
                    start: p0.pos.to_array(),
                    end: p1.pos.to_array(),
                    before_start: before_start.to_array(),
                    after_end: after_end.to_array(),
                    start_color,
                    end_color,
                    start_thickness: p0.size.abs(),
                    end_thickness: p1.size.abs(),
                    depth,
                    matrix_index,
                };
                self.add_instance(
                    InstanceBucketType::LineStrips.with_transparency(transparent),
                    depth,
                    &instance,
                );
            }
        }
    }

    /// Draws filled triangles from consecutive point triples.
    ///
    /// A point without a color takes the previous point's color. The whole
    /// call shares one depth.
    pub fn draw_triangles(&mut self, points: &[Endpoint]) {
        debug_assert!(points.len() % 3 == 0, "triangle list length must be a multiple of 3");
        if !self.check_drawing() || points.len() < 3 {
            return;
        }

        let matrix_index = self.world_matrix_index();
        if matrix_index == INVALID_INDEX {
            return;
        }

        let depth = self.depth.nudge();
        let allow_transparent = self.allow_transparent();
        let remap = self.palette_remap();

        for triangle in points.chunks_exact(3) {
            let color0 = triangle[0].color.unwrap_or(Color::NONE);
            let color1 = triangle[1].color.unwrap_or(color0);
            let color2 = triangle[2].color.unwrap_or(color1);

            let alpha_type = AlphaType::from_alpha(color0.alpha(), allow_transparent)
                .combine(color1.alpha(), allow_transparent)
                .combine(color2.alpha(), allow_transparent);
            if alpha_type == AlphaType::Invisible {
                continue;
            }

            let instance = TriangleFilledInstance {
                position: [
                    triangle[0].pos.to_array(),
                    triangle[1].pos.to_array(),
                    triangle[2].pos.to_array(),
                ],
                color: [
                    color0.to_shader_color(&remap),
                    color1.to_shader_color(&remap),
                    color2.to_shader_color(&remap),
                ],
                depth,
                matrix_index,
            };
            self.add_instance(
                InstanceBucketType::Triangles.with_transparency(alpha_type.is_transparent()),
                depth,
                &instance,
            );
        }
    }

    /// Draws a rectangle, filled when `thickness` is `None`.
    ///
    /// A negative thickness grows the outline outward. An outline at least
    /// half as thick as the rectangle is drawn filled.
    pub fn draw_rectangle(&mut self, rect: &Rect, color: Color, thickness: Option<f32>) {
        if !self.check_drawing() {
            return;
        }

        let alpha_type = AlphaType::from_alpha(color.alpha(), self.allow_transparent());
        let mut rect = rect.normalize();
        if alpha_type == AlphaType::Invisible || rect.area() == 0.0 {
            return;
        }

        let mut outline = None;
        if let Some(mut thickness) = thickness {
            if thickness == 0.0 {
                return;
            }

            if thickness < 0.0 {
                rect = rect.deflate(thickness);
                thickness = -thickness;
            }

            if thickness * 2.0 < rect.width() && thickness * 2.0 < rect.height() {
                outline = Some(thickness);
            }
        }

        let matrix_index = self.world_matrix_index();
        if matrix_index == INVALID_INDEX {
            return;
        }

        let depth = self.depth.nudge();
        let color = color.to_shader_color(&self.palette_remap());
        let transparent = alpha_type.is_transparent();

        match outline {
            Some(thickness) => {
                let instance = RectangleOutlineInstance {
                    rect: rect.to_array(),
                    color,
                    depth,
                    thickness,
                    matrix_index,
                };
                self.add_instance(
                    InstanceBucketType::RectanglesOutline.with_transparency(transparent),
                    depth,
                    &instance,
                );
            }
            None => {
                let instance = RectangleFilledInstance {
                    rect: rect.to_array(),
                    color,
                    depth,
                    matrix_index,
                };
                self.add_instance(
                    InstanceBucketType::RectanglesFilled.with_transparency(transparent),
                    depth,
                    &instance,
                );
            }
        }
    }

    /// Draws a circle centered on `center` with radius `|center.size|`.
    ///
    /// `thickness` selects an outline; a negative thickness first shrinks the
    /// radius by that much. An outline as thick as the radius is drawn
    /// filled. The fill blends from the center color to `outside_color`; either one
    /// stands in for the other when missing.
    pub fn draw_circle(&mut self, center: &Endpoint, thickness: Option<f32>, outside_color: Option<Color>) {
        if !self.check_drawing() {
            return;
        }

        let mut radius = center.size.abs();
        if radius == 0.0 {
            return;
        }

        let Some(inside) = center.color.or(outside_color) else {
            return;
        };
        let outside = outside_color.unwrap_or(inside);

        let allow_transparent = self.allow_transparent();
        let alpha_type =
            AlphaType::from_alpha(inside.alpha(), allow_transparent).combine(outside.alpha(), allow_transparent);
        if alpha_type == AlphaType::Invisible {
            return;
        }

        let mut outline = None;
        if let Some(mut thickness) = thickness {
            if thickness == 0.0 {
                return;
            }

            if thickness < 0.0 {
                radius += thickness;
                thickness = -thickness;
                if radius <= 0.0 {
                    return;
                }
            }

            if thickness < radius {
                outline = Some(thickness);
            }
        }

        let matrix_index = self.world_matrix_index();
        if matrix_index == INVALID_INDEX {
            return;
        }

        let depth = self.depth.nudge();
        let remap = self.palette_remap();
        let position = [center.pos.x, center.pos.y, depth];
        let inside_color = inside.to_shader_color(&remap);
        let outside_color = outside.to_shader_color(&remap);
        let transparent = alpha_type.is_transparent();

        match outline {
            Some(thickness) => {
                let instance = CircleOutlineInstance {
                    position,
                    inside_color,
                    outside_color,
                    radius,
                    thickness,
                    matrix_index,
                };
                self.add_instance(
                    InstanceBucketType::CirclesOutline.with_transparency(transparent),
                    depth,
                    &instance,
                );
            }
            None => {
                let instance = CircleFilledInstance {
                    position,
                    inside_color,
                    outside_color,
                    radius,
                    matrix_index,
                };
                self.add_instance(
                    InstanceBucketType::CirclesFilled.with_transparency(transparent),
                    depth,
                    &instance,
                );
            }
        }
    }

    pub fn draw_line(&mut self, start: Vec2, end: Vec2, color: Color, thickness: f32) {
        self.draw_lines(&[
            Endpoint::new(start, Some(color), thickness),
            Endpoint::new(end, Some(color), thickness),
        ]);
    }

    pub fn draw_filled_rectangle(&mut self, rect: &Rect, color: Color) {
        self.draw_rectangle(rect, color, None);
    }

    pub fn draw_outline_rectangle(&mut self, rect: &Rect, color: Color, thickness: f32) {
        self.draw_rectangle(rect, color, Some(thickness));
    }

    pub fn draw_filled_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.draw_circle(&Endpoint::new(center, Some(color), radius), None, None);
    }

    pub fn draw_outline_circle(&mut self, center: Vec2, radius: f32, color: Color, thickness: f32) {
        self.draw_circle(&Endpoint::new(center, Some(color), radius), Some(thickness), None);
    }
}
