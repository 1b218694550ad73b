//! Minimal texture registry.
//!
//! Only the atlas sub-rectangle of the selected texture matters to batching:
//! `push_quad` uses it for the corner UVs. Pixel upload and sampling of
//! atlas textures live outside this crate.

/// Normalized UV rectangle of a texture inside its atlas.
///
/// `(x0, y0)` is the top-left corner, `(x1, y1)` the bottom-right one.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AtlasRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl AtlasRect {
    #[inline]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle of a `w`×`h` pixel region at `(x, y)` in an atlas of
    /// `atlas_w`×`atlas_h` pixels.
    pub fn from_pixels(x: u32, y: u32, w: u32, h: u32, atlas_w: u32, atlas_h: u32) -> Self {
        let aw = atlas_w.max(1) as f32;
        let ah = atlas_h.max(1) as f32;
        Self {
            x0: x as f32 / aw,
            y0: y as f32 / ah,
            x1: (x + w) as f32 / aw,
            y1: (y + h) as f32 / ah,
        }
    }
}

/// A texture as seen by the batch builder.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Texture {
    pub atlas: AtlasRect,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Zero-sized texture with a degenerate atlas rect; selected until the
    /// application picks something else.
    pub const EMPTY: Self = Self {
        atlas: AtlasRect { x0: 0.0, y0: 0.0, x1: 0.0, y1: 0.0 },
        width: 0,
        height: 0,
    };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(u32);

/// Owns texture descriptions and tracks which one is selected.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: Vec<Texture>,
    selected: Option<TextureId>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, texture: Texture) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0 as usize)
    }

    /// Selects `id` for subsequent quads. Unknown ids are ignored.
    pub fn select(&mut self, id: TextureId) {
        if self.get(id).is_some() {
            self.selected = Some(id);
        } else {
            log::warn!("select: unknown texture {id:?}");
        }
    }

    /// Falls back to [`Texture::EMPTY`].
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> &Texture {
        self.selected
            .and_then(|id| self.get(id))
            .unwrap_or(&Texture::EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_texture_selected_by_default() {
        let reg = TextureRegistry::new();
        assert_eq!(*reg.selected(), Texture::EMPTY);
    }

    #[test]
    fn select_switches_atlas_rect() {
        let mut reg = TextureRegistry::new();
        let tex = Texture { atlas: AtlasRect::new(0.0, 0.0, 0.5, 0.5), width: 16, height: 16 };
        let id = reg.register(tex);
        reg.select(id);
        assert_eq!(reg.selected().atlas, AtlasRect::new(0.0, 0.0, 0.5, 0.5));

        reg.clear_selection();
        assert_eq!(*reg.selected(), Texture::EMPTY);
    }

    #[test]
    fn atlas_rect_from_pixels_normalizes() {
        let r = AtlasRect::from_pixels(16, 0, 16, 32, 64, 64);
        assert_eq!(r, AtlasRect::new(0.25, 0.0, 0.5, 0.5));
    }
}
