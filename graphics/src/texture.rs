//! Texture views as opaque, identity-compared handles

use std::any::Any;
use std::sync::Arc;

/// Pixel formats the draw device needs to distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba8UnormSrgb,
    Bgra8UnormSrgb,
    Rgba16Float,
    /// 8-bit palette indices
    R8Uint,
    R8Unorm,
}

impl TextureFormat {
    /// Formats that hold palette indices rather than colors
    pub fn is_palette(self) -> bool {
        matches!(self, Self::R8Uint)
    }

    /// Whether a target of this format can be blended with pre-multiplied alpha
    pub fn supports_pre_multiplied_alpha(self) -> bool {
        !matches!(self, Self::R8Uint | Self::R8Unorm)
    }
}

/// A sampled view of a texture, owned by the resource layer.
///
/// The draw device never inspects texel data. It memoizes views by identity
/// (the `Arc` allocation), so two views of the same texture created
/// separately occupy two texture slots.
pub trait TextureView: Any {
    /// Size in texels
    fn size(&self) -> (u32, u32);

    fn format(&self) -> TextureFormat;

    fn as_any(&self) -> &dyn Any;
}

pub type TextureViewRef = Arc<dyn TextureView>;

/// Identity comparison for texture view handles
pub(crate) fn same_view(a: &TextureViewRef, b: &TextureViewRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
