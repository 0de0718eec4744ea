//! Drawing routines for face labels, bloom sprites and sigils.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use image::RgbaImage;

use super::canvas::{circle_path, multi_path, Canvas, Mask};
use super::glyphs;
use super::{BadgeCorner, LabelStyle, TextureKey, BLOOM_FIELD_SIZE, BLOOM_SIZE, LABEL_SIZE, SIGIL_SIZE};
use crate::api::types::DieKind;
use crate::assets::color::Color;
use crate::assets::theme::{DieFlair, SigilShape};
use crate::error::EngineError;

const PLATE_RADIUS: f32 = 96.0;
const PLATE_STROKE: f32 = 8.0;
const OUTLINE_EXTRA: f32 = 16.0;
const BADGE_OFFSET: f32 = 46.0;
const BADGE_RADIUS: f32 = 8.0;
const SIGIL_RADIUS: f32 = 86.0;

pub fn render(key: &TextureKey) -> Result<RgbaImage, EngineError> {
    match key {
        TextureKey::Label(style) => label(style),
        TextureKey::Bloom { accent, particle } => Ok(bloom(*accent, *particle)),
        TextureKey::BloomField { accent, particle } => Ok(bloom_field(*accent, *particle)),
        TextureKey::Sigil { sides, accent, particle } => sigil(*sides, *accent, *particle),
    }
}

/// Cap height for a canvas font size.
fn cap_height(font_px: f32) -> f32 {
    font_px * 0.72
}

/// Plate, highlight, outlined numeral with drop shadow, optional corner badge.
pub fn label(style: &LabelStyle) -> Result<RgbaImage, EngineError> {
    let font_px = if style.text.chars().count() > 1 { 118.0 } else { 148.0 };
    let mut canvas = Canvas::new(LABEL_SIZE, LABEL_SIZE);
    let c = canvas.center();

    let lines = glyphs::layout(&style.text, c, cap_height(font_px)).ok_or_else(|| {
        EngineError::Synthesis(format!("no glyphs for label '{}'", style.text))
    })?;
    if lines.is_empty() {
        return Err(EngineError::Synthesis("empty label".into()));
    }

    let plate = canvas.fill_mask(&circle_path(c, PLATE_RADIUS))?;
    canvas.paint(&plate, style.plate_fill);
    canvas.paint_radial(
        c - Vec2::splat(34.0),
        PLATE_RADIUS * 1.4,
        &[(0.0, Color::WHITE.with_alpha(0.18)), (1.0, Color::WHITE.with_alpha(0.0))],
        Some(&plate),
    );
    canvas.stroke_circle(c, PLATE_RADIUS, PLATE_STROKE, style.plate_stroke)?;

    let pen = font_px * 0.12;
    let outline = numeral_mask(&mut canvas, &lines, pen + OUTLINE_EXTRA)?;
    canvas.paint(&outline, style.text_stroke);
    let fill = numeral_mask(&mut canvas, &lines, pen)?;
    canvas.paint_shadow(&fill, Color::BLACK.with_alpha(0.65), Vec2::new(0.0, 3.0), 10.0);
    canvas.paint(&fill, style.text_fill);

    if let Some((corner, color)) = style.badge {
        let dx = match corner {
            BadgeCorner::Right => BADGE_OFFSET,
            BadgeCorner::Left => -BADGE_OFFSET,
        };
        let at = c + Vec2::new(dx, BADGE_OFFSET);
        let dot = canvas.fill_mask(&circle_path(at, BADGE_RADIUS))?;
        canvas.paint_shadow(&dot, color.with_alpha(0.6), Vec2::ZERO, 8.0);
        canvas.paint(&dot, color);
    }

    Ok(canvas.into_image())
}

fn numeral_mask(canvas: &mut Canvas, lines: &[Vec<Vec2>], width: f32) -> Result<Mask, EngineError> {
    canvas.stroke_mask(&multi_path(lines, false), width)
}

/// White core fading through accent and particle colors.
pub fn bloom(accent: Color, particle: Color) -> RgbaImage {
    let mut canvas = Canvas::new(BLOOM_SIZE, BLOOM_SIZE);
    let c = canvas.center();
    canvas.paint_radial(
        c,
        120.0,
        &[
            (0.0, Color::WHITE.with_alpha(0.65)),
            (0.2, accent.with_alpha(0.45)),
            (0.55, particle.with_alpha(0.22)),
            (1.0, particle.with_alpha(0.0)),
        ],
        None,
    );
    canvas.into_image()
}

/// Wide, faint glow laid under the tray.
pub fn bloom_field(accent: Color, particle: Color) -> RgbaImage {
    let mut canvas = Canvas::new(BLOOM_FIELD_SIZE, BLOOM_FIELD_SIZE);
    let c = canvas.center();
    canvas.paint_radial(
        c,
        220.0,
        &[
            (0.0, accent.with_alpha(0.36)),
            (0.35, particle.with_alpha(0.24)),
            (0.65, accent.with_alpha(0.12)),
            (1.0, accent.with_alpha(0.0)),
        ],
        None,
    );
    canvas.into_image()
}

/// Outline points of a sigil shape around `center`.
pub fn sigil_outline(shape: SigilShape, center: Vec2, radius: f32) -> Vec<Vec<Vec2>> {
    let ring = |count: u32, rotation: f32, radius_at: &dyn Fn(u32) -> f32| -> Vec<Vec2> {
        (0..count)
            .map(|i| {
                let angle = rotation - FRAC_PI_2 + i as f32 * TAU / count as f32;
                center + Vec2::from_angle(angle) * radius_at(i)
            })
            .collect()
    };
    match shape {
        SigilShape::Polygon { sides, rotation } => {
            vec![ring(sides.max(3), rotation, &|_| radius)]
        }
        SigilShape::Star { points, inner_ratio } => {
            let points = points.max(3);
            vec![ring(points * 2, 0.0, &|i| {
                if i % 2 == 0 {
                    radius
                } else {
                    radius * inner_ratio
                }
            })]
        }
        SigilShape::DoubleRing => [0.9, 0.55]
            .iter()
            .map(|scale| ring(48, 0.0, &|_| radius * scale))
            .collect(),
    }
}

/// Glow, haloed sigil stroke, tick marks and a centre dot.
pub fn sigil(sides: u32, accent: Color, particle: Color) -> Result<RgbaImage, EngineError> {
    let flair = DieFlair::for_kind(DieKind::from_sides(sides));
    let mut canvas = Canvas::new(SIGIL_SIZE, SIGIL_SIZE);
    let c = canvas.center();

    canvas.paint_radial(
        c,
        120.0,
        &[(0.0, accent.with_alpha(0.3)), (0.7, accent.with_alpha(0.08)), (1.0, accent.with_alpha(0.0))],
        None,
    );

    let outline = multi_path(&sigil_outline(flair.sigil, c, SIGIL_RADIUS), true);
    let glyph = canvas.stroke_mask(&outline, 8.0)?;
    canvas.paint_shadow(&glyph, accent.with_alpha(0.5), Vec2::ZERO, 14.0);
    canvas.paint(&glyph, accent.with_alpha(0.85));

    let ticks = flair.tick_count.max(3);
    for i in 0..ticks {
        let dir = Vec2::from_angle(-FRAC_PI_2 + i as f32 * TAU / ticks as f32);
        canvas.stroke_line(
            c + dir * (SIGIL_RADIUS + 8.0),
            c + dir * (SIGIL_RADIUS + 20.0),
            4.0,
            particle.with_alpha(0.55),
        )?;
    }
    canvas.fill_circle(c, 6.0, particle.with_alpha(0.8))?;

    Ok(canvas.into_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::DisplayMode;
    use crate::assets::theme::DiceTheme;

    fn style(text: &str, mode: DisplayMode) -> LabelStyle {
        LabelStyle::for_face(text.into(), mode, &DiceTheme::ShadowMonarch.config())
    }

    #[test]
    fn label_draws_plate_and_numeral() {
        let image = label(&style("7", DisplayMode::Standard)).unwrap();
        assert_eq!(image.dimensions(), (LABEL_SIZE, LABEL_SIZE));
        // Corners stay transparent outside the plate.
        assert_eq!(image.get_pixel(2, 2).0[3], 0);
        // The plate rim carries the accent stroke.
        assert!(image.get_pixel(128 + 96, 128).0[3] > 100);
    }

    #[test]
    fn label_is_deterministic() {
        let a = label(&style("70", DisplayMode::PercentileTens)).unwrap();
        let b = label(&style("70", DisplayMode::PercentileTens)).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn badge_marks_the_percentile_corner() {
        let theme = DiceTheme::ShadowMonarch.config();
        let tens = label(&style("70", DisplayMode::PercentileTens)).unwrap();
        let ones = label(&style("7", DisplayMode::PercentileOnes)).unwrap();
        let right = (128 + 46, 128 + 46);
        let left = (128 - 46, 128 + 46);
        let accent = theme.accent;
        let px = tens.get_pixel(right.0, right.1).0;
        assert!((px[0] as i32 - accent.r as i32).abs() < 4, "{:?}", px);
        assert_ne!(ones.get_pixel(right.0, right.1), tens.get_pixel(right.0, right.1));
        let px = ones.get_pixel(left.0, left.1).0;
        assert!((px[0] as i32 - theme.particle.r as i32).abs() < 4, "{:?}", px);
    }

    #[test]
    fn labels_reject_non_numeric_text() {
        assert!(matches!(
            label(&style("?", DisplayMode::Standard)),
            Err(EngineError::Synthesis(_))
        ));
    }

    #[test]
    fn bloom_is_brightest_in_the_middle() {
        let image = bloom(Color::rgb8(139, 92, 246), Color::rgb8(167, 139, 250));
        let mid = image.get_pixel(128, 128).0[3];
        let edge = image.get_pixel(128, 240).0[3];
        assert!(mid > edge);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        let field = bloom_field(Color::WHITE, Color::WHITE);
        assert_eq!(field.dimensions(), (BLOOM_FIELD_SIZE, BLOOM_FIELD_SIZE));
    }

    #[test]
    fn sigil_outlines_follow_shape() {
        let c = Vec2::ZERO;
        let tri = sigil_outline(SigilShape::Polygon { sides: 3, rotation: 0.0 }, c, 10.0);
        assert_eq!(tri.len(), 1);
        assert_eq!(tri[0].len(), 3);
        // First vertex points straight up in image space.
        assert!((tri[0][0] - Vec2::new(0.0, -10.0)).length() < 1e-4);

        let star = sigil_outline(SigilShape::Star { points: 6, inner_ratio: 0.5 }, c, 10.0);
        assert_eq!(star[0].len(), 12);
        assert!((star[0][1].length() - 5.0).abs() < 1e-4);

        let rings = sigil_outline(SigilShape::DoubleRing, c, 10.0);
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn sigil_renders_for_every_kind() {
        for kind in DieKind::ALL {
            let image = sigil(kind.sides(), Color::rgb8(255, 0, 0), Color::WHITE).unwrap();
            // Centre dot is opaque-ish.
            assert!(image.get_pixel(128, 128).0[3] > 150, "{:?}", kind);
        }
    }
}
