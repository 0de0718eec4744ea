//! CPU raster canvas for procedural textures.
//!
//! Shapes are built as lyon paths, tessellated into triangles and scan
//! converted into a supersampled coverage [`Mask`]. Masks are composited onto
//! an `RgbaImage` with source-over blending, optionally blurred and offset to
//! form drop shadows.

use glam::Vec2;
use image::RgbaImage;
use lyon::math::{point, Point};
use lyon::path::{Path, Winding};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor, LineCap,
    LineJoin, StrokeOptions, StrokeTessellator, StrokeVertex, StrokeVertexConstructor,
    VertexBuffers,
};

use crate::assets::color::Color;
use crate::error::EngineError;

/// Samples per pixel along each axis.
const SUPERSAMPLE: usize = 2;
const TOLERANCE: f32 = 0.25;

/// Coverage of a shape, stored at supersampled resolution.
#[derive(Debug, Clone)]
pub struct Mask {
    width: usize,
    height: usize,
    samples: Vec<u8>,
}

impl Mask {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            samples: vec![0; width * height * SUPERSAMPLE * SUPERSAMPLE],
        }
    }

    /// Fraction of the pixel covered, `0.0..=1.0`.
    pub fn coverage(&self, x: usize, y: usize) -> f32 {
        let stride = self.width * SUPERSAMPLE;
        let mut hits = 0u32;
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                hits += self.samples[(y * SUPERSAMPLE + sy) * stride + x * SUPERSAMPLE + sx] as u32;
            }
        }
        hits as f32 / (SUPERSAMPLE * SUPERSAMPLE) as f32
    }

    /// Per-pixel coverage as a flat row-major buffer.
    pub fn coverage_map(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.coverage(x, y));
            }
        }
        out
    }

    /// Number of pixels with any coverage.
    pub fn covered_pixels(&self) -> usize {
        self.coverage_map().iter().filter(|c| **c > 0.0).count()
    }

    fn raster_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2) {
        let area = (b - a).perp_dot(c - a);
        if area.abs() <= f32::EPSILON {
            return;
        }
        let s = SUPERSAMPLE as f32;
        let sw = self.width * SUPERSAMPLE;
        let sh = self.height * SUPERSAMPLE;
        let min = a.min(b).min(c) * s;
        let max = a.max(b).max(c) * s;
        let x0 = min.x.floor().max(0.0) as usize;
        let y0 = min.y.floor().max(0.0) as usize;
        let x1 = (max.x.ceil().max(0.0) as usize).min(sw);
        let y1 = (max.y.ceil().max(0.0) as usize).min(sh);

        for sy in y0..y1 {
            for sx in x0..x1 {
                let p = Vec2::new((sx as f32 + 0.5) / s, (sy as f32 + 0.5) / s);
                let w0 = (b - a).perp_dot(p - a);
                let w1 = (c - b).perp_dot(p - b);
                let w2 = (a - c).perp_dot(p - c);
                let inside = if area > 0.0 {
                    w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
                } else {
                    w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
                };
                if inside {
                    self.samples[sy * sw + sx] = 1;
                }
            }
        }
    }
}

struct PositionCtor;

impl FillVertexConstructor<Point> for PositionCtor {
    fn new_vertex(&mut self, vertex: FillVertex) -> Point {
        vertex.position()
    }
}

impl StrokeVertexConstructor<Point> for PositionCtor {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> Point {
        vertex.position()
    }
}

/// Build one path holding several subpaths, closed or open.
pub fn multi_path(lines: &[Vec<Vec2>], closed: bool) -> Path {
    let mut builder = Path::builder();
    for line in lines {
        if let Some((first, rest)) = line.split_first() {
            builder.begin(point(first.x, first.y));
            for p in rest {
                builder.line_to(point(p.x, p.y));
            }
            builder.end(closed);
        }
    }
    builder.build()
}

/// Build a closed polygon path.
pub fn polygon_path(points: &[Vec2]) -> Path {
    multi_path(&[points.to_vec()], true)
}

/// Build an open polyline path.
pub fn polyline_path(points: &[Vec2]) -> Path {
    multi_path(&[points.to_vec()], false)
}

pub fn circle_path(center: Vec2, radius: f32) -> Path {
    let mut builder = Path::builder();
    builder.add_circle(point(center.x, center.y), radius, Winding::Positive);
    builder.build()
}

/// RGBA raster target with lyon tessellators.
pub struct Canvas {
    image: RgbaImage,
    fill_tess: FillTessellator,
    stroke_tess: StrokeTessellator,
    geometry: VertexBuffers<Point, u32>,
}

impl Canvas {
    /// Create a transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            fill_tess: FillTessellator::new(),
            stroke_tess: StrokeTessellator::new(),
            geometry: VertexBuffers::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32) * 0.5
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn empty_mask(&self) -> Mask {
        Mask::new(self.width() as usize, self.height() as usize)
    }

    /// Coverage of a filled path.
    pub fn fill_mask(&mut self, path: &Path) -> Result<Mask, EngineError> {
        self.fill_tess
            .tessellate_path(
                path,
                &FillOptions::tolerance(TOLERANCE),
                &mut BuffersBuilder::new(&mut self.geometry, PositionCtor),
            )
            .map_err(|e| EngineError::Synthesis(format!("fill tessellation: {e:?}")))?;
        Ok(self.flush_geometry())
    }

    /// Coverage of a stroked path with round caps and joins.
    pub fn stroke_mask(&mut self, path: &Path, width: f32) -> Result<Mask, EngineError> {
        let options = StrokeOptions::tolerance(TOLERANCE)
            .with_line_width(width)
            .with_line_cap(LineCap::Round)
            .with_line_join(LineJoin::Round);
        self.stroke_tess
            .tessellate_path(
                path,
                &options,
                &mut BuffersBuilder::new(&mut self.geometry, PositionCtor),
            )
            .map_err(|e| EngineError::Synthesis(format!("stroke tessellation: {e:?}")))?;
        Ok(self.flush_geometry())
    }

    fn flush_geometry(&mut self) -> Mask {
        let mut mask = self.empty_mask();
        for tri in self.geometry.indices.chunks_exact(3) {
            let v = |i: u32| {
                let p = self.geometry.vertices[i as usize];
                Vec2::new(p.x, p.y)
            };
            mask.raster_triangle(v(tri[0]), v(tri[1]), v(tri[2]));
        }
        self.geometry.vertices.clear();
        self.geometry.indices.clear();
        mask
    }

    /// Composite a mask in a solid color.
    pub fn paint(&mut self, mask: &Mask, color: Color) {
        let coverage = mask.coverage_map();
        self.paint_coverage(&coverage, color, (0, 0));
    }

    /// Composite a blurred, offset copy of a mask. Matches a canvas drop shadow.
    pub fn paint_shadow(&mut self, mask: &Mask, color: Color, offset: Vec2, blur: f32) {
        let mut coverage = mask.coverage_map();
        // A canvas shadow blur of `b` is a gaussian with sigma `b / 2`.
        let radius = (blur / 2.0).round() as usize;
        if radius > 0 {
            let (w, h) = (self.width() as usize, self.height() as usize);
            for _ in 0..3 {
                box_blur(&mut coverage, w, h, radius);
            }
        }
        let offset = (offset.x.round() as i64, offset.y.round() as i64);
        self.paint_coverage(&coverage, color, offset);
    }

    /// Radial gradient from `center`. `stops` are `(t, color)` with `t` in `0..=1`
    /// along `radius`; outside the last stop nothing is drawn. An optional clip
    /// mask limits the area painted.
    pub fn paint_radial(
        &mut self,
        center: Vec2,
        radius: f32,
        stops: &[(f32, Color)],
        clip: Option<&Mask>,
    ) {
        if radius <= 0.0 || stops.is_empty() {
            return;
        }
        let clip = clip.map(Mask::coverage_map);
        let w = self.width() as usize;
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let t = p.distance(center) / radius;
            if t > 1.0 {
                continue;
            }
            let cover = clip
                .as_ref()
                .map(|c| c[y as usize * w + x as usize])
                .unwrap_or(1.0);
            if cover <= 0.0 {
                continue;
            }
            let src = gradient_at(stops, t);
            blend(&mut pixel.0, src, cover);
        }
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), EngineError> {
        let mask = self.fill_mask(&circle_path(center, radius))?;
        self.paint(&mask, color);
        Ok(())
    }

    pub fn stroke_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        width: f32,
        color: Color,
    ) -> Result<(), EngineError> {
        let mask = self.stroke_mask(&circle_path(center, radius), width)?;
        self.paint(&mask, color);
        Ok(())
    }

    pub fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) -> Result<(), EngineError> {
        let mask = self.stroke_mask(&polyline_path(&[from, to]), width)?;
        self.paint(&mask, color);
        Ok(())
    }

    fn paint_coverage(&mut self, coverage: &[f32], color: Color, offset: (i64, i64)) {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let src = color.to_f32();
        for y in 0..h {
            for x in 0..w {
                let (sx, sy) = (x - offset.0, y - offset.1);
                if sx < 0 || sy < 0 || sx >= w || sy >= h {
                    continue;
                }
                let cover = coverage[(sy * w + sx) as usize];
                if cover <= 0.0 {
                    continue;
                }
                let pixel = self.image.get_pixel_mut(x as u32, y as u32);
                blend(&mut pixel.0, src, cover);
            }
        }
    }
}

/// Source-over blend of a straight-alpha color into a straight-alpha pixel.
fn blend(dst: &mut [u8; 4], src: [f32; 4], cover: f32) {
    let sa = src[3] * cover;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for i in 0..3 {
        let d = dst[i] as f32 / 255.0;
        let c = (src[i] * sa + d * da * (1.0 - sa)) / out_a;
        dst[i] = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    dst[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
}

fn gradient_at(stops: &[(f32, Color)], t: f32) -> [f32; 4] {
    let first = stops[0];
    if t <= first.0 {
        return first.1.to_f32();
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let k = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            let (a, b) = (c0.to_f32(), c1.to_f32());
            return std::array::from_fn(|i| a[i] + (b[i] - a[i]) * k);
        }
    }
    stops[stops.len() - 1].1.to_f32()
}

/// Separable box blur in place.
fn box_blur(values: &mut [f32], width: usize, height: usize, radius: usize) {
    let mut scratch = vec![0.0; values.len()];
    let span = (2 * radius + 1) as f32;
    for y in 0..height {
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let sum: f32 = values[y * width + lo..=y * width + hi].iter().sum();
            scratch[y * width + x] = sum / span;
        }
    }
    for y in 0..height {
        for x in 0..width {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            let sum: f32 = (lo..=hi).map(|yy| scratch[yy * width + x]).sum();
            values[y * width + x] = sum / span;
        }
    }
}
