use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::RgbaImage;

use super::TextureKey;
use crate::assets::color::Color;

/// Stable id of a synthesized texture, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// A synthesized RGBA texture ready for upload.
#[derive(Debug)]
pub struct TextureAsset {
    pub id: TextureId,
    pub key: TextureKey,
    pub image: RgbaImage,
}

impl TextureAsset {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Straight-alpha RGBA8, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// What a renderer should bind for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureHandle {
    Image(TextureId),
    /// Synthesis failed; draw a flat color instead.
    Flat(Color),
}

/// Read-through cache of synthesized textures.
///
/// Identical keys always resolve to the same handle. Failures are cached as
/// flat fallbacks so synthesis is not retried every frame.
pub struct TextureCache {
    entries: HashMap<TextureKey, TextureHandle>,
    assets: Vec<Arc<TextureAsset>>,
    reported: HashSet<&'static str>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            assets: Vec::new(),
            reported: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, key: &TextureKey) -> TextureHandle {
        if let Some(handle) = self.entries.get(key) {
            return *handle;
        }
        let handle = match super::synthesize(key) {
            Ok(image) => {
                let id = TextureId(self.assets.len() as u32);
                self.assets.push(Arc::new(TextureAsset {
                    id,
                    key: key.clone(),
                    image,
                }));
                TextureHandle::Image(id)
            }
            Err(err) => {
                if self.reported.insert(kind_name(key)) {
                    log::warn!("{} texture unavailable ({err}); using flat color", kind_name(key));
                }
                TextureHandle::Flat(key.fallback_color())
            }
        };
        self.entries.insert(key.clone(), handle);
        handle
    }

    pub fn get(&self, id: TextureId) -> Option<Arc<TextureAsset>> {
        self.assets.get(id.0 as usize).cloned()
    }

    /// Every synthesized texture, in id order.
    pub fn assets(&self) -> &[Arc<TextureAsset>] {
        &self.assets
    }

    /// Number of keys resolved so far, fallbacks included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_name(key: &TextureKey) -> &'static str {
    match key {
        TextureKey::Label(_) => "label",
        TextureKey::Bloom { .. } => "bloom",
        TextureKey::BloomField { .. } => "bloom field",
        TextureKey::Sigil { .. } => "sigil",
    }
}
