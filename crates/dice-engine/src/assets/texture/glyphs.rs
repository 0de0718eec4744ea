//! Single-stroke numerals for face labels.
//!
//! Each digit is one or more polylines in a cell `GLYPH_WIDTH` wide and 1.0
//! tall, y pointing down. Stroking them with a round pen gives a bold,
//! evenly weighted numeral without a font dependency.

use glam::Vec2;

pub const GLYPH_WIDTH: f32 = 0.6;
/// Horizontal distance between glyph origins, in cap heights.
pub const ADVANCE: f32 = 0.78;

type Stroke = &'static [(f32, f32)];

const ZERO: &[Stroke] = &[&[
    (0.3, 0.0),
    (0.52, 0.1),
    (0.6, 0.5),
    (0.52, 0.9),
    (0.3, 1.0),
    (0.08, 0.9),
    (0.0, 0.5),
    (0.08, 0.1),
    (0.3, 0.0),
]];
const ONE: &[Stroke] = &[&[(0.1, 0.2), (0.32, 0.0), (0.32, 1.0)], &[(0.1, 1.0), (0.52, 1.0)]];
const TWO: &[Stroke] = &[&[
    (0.02, 0.2),
    (0.12, 0.05),
    (0.3, 0.0),
    (0.48, 0.05),
    (0.58, 0.22),
    (0.52, 0.42),
    (0.0, 1.0),
    (0.6, 1.0),
]];
const THREE: &[Stroke] = &[&[
    (0.03, 0.1),
    (0.25, 0.0),
    (0.5, 0.06),
    (0.57, 0.24),
    (0.45, 0.43),
    (0.22, 0.48),
    (0.48, 0.55),
    (0.6, 0.74),
    (0.52, 0.93),
    (0.28, 1.0),
    (0.02, 0.9),
]];
const FOUR: &[Stroke] = &[&[(0.45, 1.0), (0.45, 0.0), (0.0, 0.68), (0.6, 0.68)]];
const FIVE: &[Stroke] = &[&[
    (0.56, 0.0),
    (0.08, 0.0),
    (0.04, 0.44),
    (0.28, 0.38),
    (0.5, 0.45),
    (0.6, 0.66),
    (0.52, 0.9),
    (0.28, 1.0),
    (0.02, 0.92),
]];
const SIX: &[Stroke] = &[&[
    (0.52, 0.06),
    (0.3, 0.0),
    (0.1, 0.12),
    (0.02, 0.45),
    (0.04, 0.78),
    (0.18, 0.97),
    (0.36, 0.99),
    (0.55, 0.86),
    (0.58, 0.66),
    (0.45, 0.5),
    (0.25, 0.48),
    (0.06, 0.6),
]];
const SEVEN: &[Stroke] = &[&[(0.0, 0.0), (0.6, 0.0), (0.22, 1.0)]];
const EIGHT: &[Stroke] = &[
    &[
        (0.3, 0.0),
        (0.52, 0.08),
        (0.55, 0.24),
        (0.3, 0.46),
        (0.05, 0.24),
        (0.08, 0.08),
        (0.3, 0.0),
    ],
    &[
        (0.3, 0.46),
        (0.57, 0.62),
        (0.58, 0.82),
        (0.3, 1.0),
        (0.02, 0.82),
        (0.03, 0.62),
        (0.3, 0.46),
    ],
];
const NINE: &[Stroke] = &[&[
    (0.08, 0.94),
    (0.3, 1.0),
    (0.5, 0.88),
    (0.58, 0.55),
    (0.56, 0.22),
    (0.42, 0.03),
    (0.24, 0.01),
    (0.05, 0.14),
    (0.02, 0.34),
    (0.15, 0.5),
    (0.35, 0.52),
    (0.54, 0.4),
]];

/// Strokes for a digit, or `None` for any other character.
pub fn glyph(ch: char) -> Option<&'static [Stroke]> {
    match ch {
        '0' => Some(ZERO),
        '1' => Some(ONE),
        '2' => Some(TWO),
        '3' => Some(THREE),
        '4' => Some(FOUR),
        '5' => Some(FIVE),
        '6' => Some(SIX),
        '7' => Some(SEVEN),
        '8' => Some(EIGHT),
        '9' => Some(NINE),
        _ => None,
    }
}

/// Width of `len` glyphs set side by side, in cap heights.
pub fn text_width(len: usize) -> f32 {
    match len {
        0 => 0.0,
        n => (n - 1) as f32 * ADVANCE + GLYPH_WIDTH,
    }
}

/// Lay out `text` centred on `center` with the given cap height in pixels.
///
/// Returns `None` if any character has no glyph.
pub fn layout(text: &str, center: Vec2, cap_height: f32) -> Option<Vec<Vec<Vec2>>> {
    let len = text.chars().count();
    let origin = center - Vec2::new(text_width(len), 1.0) * cap_height * 0.5;
    let mut lines = Vec::new();
    for (i, ch) in text.chars().enumerate() {
        let cell = origin + Vec2::new(i as f32 * ADVANCE * cap_height, 0.0);
        for stroke in glyph(ch)? {
            lines.push(
                stroke
                    .iter()
                    .map(|&(x, y)| cell + Vec2::new(x, y) * cap_height)
                    .collect(),
            );
        }
    }
    Some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_digit_has_strokes() {
        for ch in '0'..='9' {
            let strokes = glyph(ch).unwrap();
            assert!(!strokes.is_empty());
            for stroke in strokes {
                assert!(stroke.len() >= 2);
                for &(x, y) in stroke.iter() {
                    assert!((0.0..=GLYPH_WIDTH).contains(&x) && (0.0..=1.0).contains(&y));
                }
            }
        }
        assert!(glyph('x').is_none());
    }

    #[test]
    fn layout_is_centred() {
        let lines = layout("70", Vec2::new(128.0, 128.0), 100.0).unwrap();
        let (min, max) = lines
            .iter()
            .flatten()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        assert!(((min.x + max.x) / 2.0 - 128.0).abs() < 1.0);
        assert!(((min.y + max.y) / 2.0 - 128.0).abs() < 1.0);
    }

    #[test]
    fn unknown_characters_fail_layout() {
        assert!(layout("1?", Vec2::ZERO, 10.0).is_none());
    }
}
