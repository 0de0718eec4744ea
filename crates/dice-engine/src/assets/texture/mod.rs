//! Procedural texture synthesis and caching.

pub mod cache;
#[cfg(feature = "vectors")]
pub mod canvas;
pub mod glyphs;
#[cfg(feature = "vectors")]
pub mod synth;

use image::RgbaImage;

use crate::api::types::DisplayMode;
use crate::assets::color::Color;
use crate::assets::theme::ThemeConfig;
use crate::error::EngineError;

pub use cache::{TextureAsset, TextureCache, TextureHandle, TextureId};

pub const LABEL_SIZE: u32 = 256;
pub const BLOOM_SIZE: u32 = 256;
pub const BLOOM_FIELD_SIZE: u32 = 512;
pub const SIGIL_SIZE: u32 = 256;

/// Which corner badge marks a percentile face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeCorner {
    /// Tens faces.
    Right,
    /// Ones faces.
    Left,
}

/// Every visual parameter of one face decal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelStyle {
    pub text: String,
    pub plate_fill: Color,
    pub plate_stroke: Color,
    pub text_stroke: Color,
    pub text_fill: Color,
    pub badge: Option<(BadgeCorner, Color)>,
}

impl LabelStyle {
    /// Themed decal for one face.
    ///
    /// Ones faces are drawn in the particle color, everything else in the accent.
    pub fn for_face(text: String, mode: DisplayMode, theme: &ThemeConfig) -> Self {
        let stroke = match mode {
            DisplayMode::PercentileOnes => theme.particle,
            _ => theme.accent,
        };
        let badge = match mode {
            DisplayMode::Standard => None,
            DisplayMode::PercentileTens => Some((BadgeCorner::Right, stroke)),
            DisplayMode::PercentileOnes => Some((BadgeCorner::Left, stroke)),
        };
        Self {
            text,
            plate_fill: Color::rgba8(6, 8, 12, 184),
            plate_stroke: theme.accent.with_alpha(0.6),
            text_stroke: stroke,
            text_fill: Color::IVORY,
            badge,
        }
    }
}

/// Cache key for a synthesized texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureKey {
    Label(LabelStyle),
    /// Soft glow sprite behind each die.
    Bloom { accent: Color, particle: Color },
    /// Large ambient glow under the tray.
    BloomField { accent: Color, particle: Color },
    /// Decorative rune for a side count.
    Sigil { sides: u32, accent: Color, particle: Color },
}

impl TextureKey {
    pub fn bloom(theme: &ThemeConfig) -> Self {
        TextureKey::Bloom {
            accent: theme.accent,
            particle: theme.particle,
        }
    }

    pub fn bloom_field(theme: &ThemeConfig) -> Self {
        TextureKey::BloomField {
            accent: theme.accent,
            particle: theme.particle,
        }
    }

    pub fn sigil(sides: u32, theme: &ThemeConfig) -> Self {
        TextureKey::Sigil {
            sides,
            accent: theme.accent,
            particle: theme.particle,
        }
    }

    /// Flat color shown when synthesis fails.
    pub fn fallback_color(&self) -> Color {
        match self {
            TextureKey::Label(style) => style.plate_fill,
            TextureKey::Bloom { accent, .. } | TextureKey::BloomField { accent, .. } => {
                accent.with_alpha(0.25)
            }
            TextureKey::Sigil { .. } => Color::TRANSPARENT,
        }
    }
}

/// Render the image for a key.
#[cfg(feature = "vectors")]
pub fn synthesize(key: &TextureKey) -> Result<RgbaImage, EngineError> {
    synth::render(key)
}

/// Render the image for a key.
#[cfg(not(feature = "vectors"))]
pub fn synthesize(_key: &TextureKey) -> Result<RgbaImage, EngineError> {
    Err(EngineError::RasterUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::theme::DiceTheme;

    #[test]
    fn ones_faces_use_particle_color_and_left_badge() {
        let theme = DiceTheme::GatePortal.config();
        let style = LabelStyle::for_face("7".into(), DisplayMode::PercentileOnes, &theme);
        assert_eq!(style.text_stroke, theme.particle);
        assert_eq!(style.badge, Some((BadgeCorner::Left, theme.particle)));

        let tens = LabelStyle::for_face("70".into(), DisplayMode::PercentileTens, &theme);
        assert_eq!(tens.text_stroke, theme.accent);
        assert_eq!(tens.badge, Some((BadgeCorner::Right, theme.accent)));

        let plain = LabelStyle::for_face("7".into(), DisplayMode::Standard, &theme);
        assert_eq!(plain.badge, None);
    }

    #[test]
    fn keys_distinguish_visual_parameters() {
        let theme = DiceTheme::ShadowMonarch.config();
        let a = TextureKey::Label(LabelStyle::for_face("7".into(), DisplayMode::Standard, &theme));
        let b = TextureKey::Label(LabelStyle::for_face("7".into(), DisplayMode::PercentileOnes, &theme));
        assert_ne!(a, b);
        assert_eq!(TextureKey::sigil(20, &theme), TextureKey::sigil(20, &theme));
    }
}
