use super::models::ModelCache;
use super::texture::TextureCache;

/// Caches owned by whoever owns the rendering surface.
///
/// Passed by reference into the scene so that models and textures outlive a
/// single roll and are shared across scenes on the same surface.
#[derive(Default)]
pub struct RendererContext {
    pub models: ModelCache,
    pub textures: TextureCache,
}

impl RendererContext {
    pub fn new() -> Self {
        Self::default()
    }
}
