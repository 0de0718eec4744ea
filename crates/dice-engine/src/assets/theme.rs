//! Dice color themes and per-kind decorative flair.

use serde::{Deserialize, Serialize};

use super::color::Color;
use crate::api::types::DieKind;

/// Named palette applied to every die in a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiceTheme {
    #[default]
    ShadowMonarch,
    SupremeDeity,
    GatePortal,
    SystemInterface,
    AriseViolet,
    MonarchGold,
}

/// Material and palette values for one theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeConfig {
    pub name: &'static str,
    pub base: Color,
    /// Emissive color, also the accent for plates, sigils and rings.
    pub accent: Color,
    pub particle: Color,
    pub glow_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
}

impl DiceTheme {
    pub const ALL: [DiceTheme; 6] = [
        DiceTheme::ShadowMonarch,
        DiceTheme::SupremeDeity,
        DiceTheme::GatePortal,
        DiceTheme::SystemInterface,
        DiceTheme::AriseViolet,
        DiceTheme::MonarchGold,
    ];

    pub fn config(self) -> ThemeConfig {
        let (name, base, accent, particle, glow_intensity, metalness, roughness) = match self {
            DiceTheme::ShadowMonarch => (
                "Shadow Monarch",
                Color::rgb8(0x1a, 0x1a, 0x2e),
                Color::rgb8(0x8b, 0x5c, 0xf6),
                Color::rgb8(0xa7, 0x8b, 0xfa),
                0.8,
                0.95,
                0.05,
            ),
            DiceTheme::SupremeDeity => (
                "Supreme Deity",
                Color::rgb8(0x0f, 0x17, 0x2a),
                Color::rgb8(0x3b, 0x82, 0xf6),
                Color::rgb8(0x60, 0xa5, 0xfa),
                0.9,
                0.98,
                0.02,
            ),
            DiceTheme::GatePortal => (
                "Gate Portal",
                Color::rgb8(0x45, 0x0a, 0x0a),
                Color::rgb8(0xef, 0x44, 0x44),
                Color::rgb8(0xf8, 0x71, 0x71),
                1.0,
                0.9,
                0.1,
            ),
            DiceTheme::SystemInterface => (
                "System Interface",
                Color::rgb8(0x06, 0x4e, 0x3b),
                Color::rgb8(0x10, 0xb9, 0x81),
                Color::rgb8(0x34, 0xd3, 0x99),
                0.85,
                0.85,
                0.15,
            ),
            DiceTheme::AriseViolet => (
                "Arise Violet",
                Color::rgb8(0x2e, 0x10, 0x65),
                Color::rgb8(0xa8, 0x55, 0xf7),
                Color::rgb8(0xc0, 0x84, 0xfc),
                0.9,
                0.92,
                0.08,
            ),
            DiceTheme::MonarchGold => (
                "Monarch Gold",
                Color::rgb8(0x71, 0x3f, 0x12),
                Color::rgb8(0xfb, 0xbf, 0x24),
                Color::rgb8(0xfc, 0xd3, 0x4d),
                0.85,
                0.96,
                0.04,
            ),
        };
        ThemeConfig {
            name,
            base,
            accent,
            particle,
            glow_intensity,
            metalness,
            roughness,
        }
    }
}

/// Shape drawn on a die's sigil overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SigilShape {
    Polygon { sides: u32, rotation: f32 },
    Star { points: u32, inner_ratio: f32 },
    DoubleRing,
}

/// Decorative parameters for one die kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DieFlair {
    pub sigil: SigilShape,
    pub tick_count: u32,
    pub ring_count: u32,
    pub ring_scale: f32,
    pub ring_tilt: f32,
    pub ring_opacity: f32,
    pub glyph_scale: f32,
    pub glyph_opacity: f32,
    pub float_height: f32,
    pub orbit_speed: f32,
    pub edge_opacity: f32,
    pub particle_boost: f32,
}

impl Default for DieFlair {
    fn default() -> Self {
        Self {
            sigil: SigilShape::Polygon { sides: 6, rotation: 0.0 },
            tick_count: 6,
            ring_count: 1,
            ring_scale: 1.2,
            ring_tilt: 0.45,
            ring_opacity: 0.28,
            glyph_scale: 0.95,
            glyph_opacity: 0.55,
            float_height: 0.34,
            orbit_speed: 0.7,
            edge_opacity: 0.22,
            particle_boost: 1.0,
        }
    }
}

impl DieFlair {
    /// Flair for a die kind; unknown kinds get the hexagonal default.
    pub fn for_kind(kind: Option<DieKind>) -> Self {
        let base = Self::default();
        let polygon = |sides| SigilShape::Polygon { sides, rotation: 0.0 };
        match kind {
            Some(DieKind::D4) => Self {
                sigil: polygon(3),
                tick_count: 3,
                ring_scale: 1.1,
                ring_tilt: 0.55,
                ring_opacity: 0.32,
                glyph_scale: 0.9,
                glyph_opacity: 0.6,
                float_height: 0.32,
                orbit_speed: 0.95,
                edge_opacity: 0.24,
                particle_boost: 1.05,
                ..base
            },
            Some(DieKind::D6) => Self {
                sigil: polygon(4),
                tick_count: 4,
                ring_count: 2,
                ring_tilt: 0.4,
                ring_opacity: 0.26,
                glyph_scale: 0.98,
                float_height: 0.32,
                orbit_speed: 0.8,
                edge_opacity: 0.2,
                ..base
            },
            Some(DieKind::D8) => Self {
                sigil: SigilShape::Polygon {
                    sides: 4,
                    rotation: std::f32::consts::FRAC_PI_4,
                },
                ring_scale: 1.18,
                ring_opacity: 0.3,
                glyph_opacity: 0.58,
                orbit_speed: 0.78,
                ..base
            },
            Some(DieKind::D10) => Self {
                sigil: polygon(10),
                tick_count: 10,
                ring_count: 2,
                ring_scale: 1.25,
                ring_tilt: 0.5,
                ring_opacity: 0.26,
                glyph_scale: 0.9,
                float_height: 0.36,
                orbit_speed: 0.9,
                edge_opacity: 0.24,
                ..base
            },
            Some(DieKind::D12) => Self {
                sigil: polygon(5),
                tick_count: 8,
                ring_scale: 1.22,
                ring_tilt: 0.42,
                glyph_scale: 0.96,
                glyph_opacity: 0.56,
                float_height: 0.35,
                orbit_speed: 0.76,
                edge_opacity: 0.23,
                ..base
            },
            Some(DieKind::D20) => Self {
                sigil: SigilShape::Star {
                    points: 6,
                    inner_ratio: 0.5,
                },
                tick_count: 12,
                ring_count: 2,
                ring_scale: 1.32,
                ring_tilt: 0.6,
                ring_opacity: 0.32,
                glyph_scale: 1.05,
                glyph_opacity: 0.62,
                float_height: 0.4,
                orbit_speed: 1.05,
                edge_opacity: 0.3,
                particle_boost: 1.15,
                ..base
            },
            Some(DieKind::D100) => Self {
                sigil: SigilShape::DoubleRing,
                tick_count: 10,
                ring_count: 2,
                ring_scale: 1.3,
                ring_tilt: 0.5,
                ring_opacity: 0.26,
                glyph_scale: 0.92,
                glyph_opacity: 0.52,
                float_height: 0.36,
                orbit_speed: 0.88,
                ..base
            },
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_monarch_palette() {
        let theme = DiceTheme::ShadowMonarch.config();
        assert_eq!(theme.accent, Color::from_hex("#8b5cf6").unwrap());
        assert_eq!(theme.particle, Color::from_hex("#a78bfa").unwrap());
        assert!((theme.glow_intensity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn every_theme_has_a_name() {
        for theme in DiceTheme::ALL {
            assert!(!theme.config().name.is_empty());
        }
    }

    #[test]
    fn theme_parses_kebab_case() {
        let theme: DiceTheme = serde_json::from_str("\"gate-portal\"").unwrap();
        assert_eq!(theme, DiceTheme::GatePortal);
    }

    #[test]
    fn flair_sigils_follow_side_count() {
        assert_eq!(
            DieFlair::for_kind(Some(DieKind::D4)).sigil,
            SigilShape::Polygon { sides: 3, rotation: 0.0 }
        );
        assert!(matches!(DieFlair::for_kind(Some(DieKind::D20)).sigil, SigilShape::Star { points: 6, .. }));
        assert_eq!(DieFlair::for_kind(Some(DieKind::D100)).sigil, SigilShape::DoubleRing);
        assert_eq!(DieFlair::for_kind(None), DieFlair::default());
    }

    #[test]
    fn only_d4_and_d20_boost_particles() {
        for kind in DieKind::ALL {
            let boost = DieFlair::for_kind(Some(kind)).particle_boost;
            match kind {
                DieKind::D4 => assert!((boost - 1.05).abs() < 1e-6),
                DieKind::D20 => assert!((boost - 1.15).abs() < 1e-6),
                _ => assert!((boost - 1.0).abs() < 1e-6),
            }
        }
    }
}
