//! Drawing surfaces.
//!
//! - `RecordingSurface`: keeps a display list of draw calls since the last clear.
//! - `RasterSurface`: draws into an RGBA pixel buffer that can be saved as PNG.

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::frame::BoundingBox;
use crate::render::{Color, Style, Surface};

/// One recorded draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear,
    StrokeRect(BoundingBox),
    FillText { text: String, x: f64, y: f64 },
}

/// Surface that records draw calls instead of producing pixels.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
    clears: u64,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            clears: 0,
        }
    }

    /// Draw calls since (and including) the most recent clear.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of clears over the surface's lifetime; one per full redraw.
    pub fn total_clears(&self) -> u64 {
        self.clears
    }

    pub fn rects(&self) -> impl Iterator<Item = &BoundingBox> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::StrokeRect(rect) => Some(rect),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::FillText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
        self.clears += 1;
    }

    fn stroke_rect(&mut self, rect: BoundingBox, _style: &Style) {
        self.ops.push(DrawOp::StrokeRect(rect));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, _style: &Style) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }
}

/// Average advance of one glyph, as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.5;
/// Height of a label plate above its baseline, as a fraction of the font size.
const GLYPH_ASCENT: f64 = 0.75;

/// Pixel surface backed by an RGBA image.
///
/// No font rasteriser is bundled, so a label is painted as a solid plate
/// covering where its glyphs would sit. The label strings of the current
/// drawing are kept and available through `labels()`.
pub struct RasterSurface {
    image: RgbaImage,
    labels: Vec<String>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(Color::TRANSPARENT.0)),
            labels: Vec::new(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Count of pixels that are not fully transparent.
    pub fn painted_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] != 0).count()
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write snapshot {}", path.display()))
    }

    /// Fill the axis-aligned area `[x0, x1) x [y0, y1)`, clipped to the image.
    fn fill_area(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Color) {
        let (width, height) = self.image.dimensions();
        let clamp = |v: f64, max: u32| v.max(0.0).min(max as f64);
        let left = clamp(x0.floor(), width) as u32;
        let right = clamp(x1.ceil(), width) as u32;
        let top = clamp(y0.floor(), height) as u32;
        let bottom = clamp(y1.ceil(), height) as u32;
        for y in top..bottom {
            for x in left..right {
                self.image.put_pixel(x, y, Rgba(color.0));
            }
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba(Color::TRANSPARENT.0);
        }
        self.labels.clear();
    }

    fn stroke_rect(&mut self, rect: BoundingBox, style: &Style) {
        if rect.is_degenerate() {
            return;
        }
        let (mut x, mut y, mut w, mut h) = (rect.x_offset, rect.y_offset, rect.width, rect.height);
        if w < 0.0 {
            x += w;
            w = -w;
        }
        if h < 0.0 {
            y += h;
            h = -h;
        }

        // The stroke is centred on the rectangle's path.
        let half = style.line_width / 2.0;
        let (outer_x0, outer_y0) = (x - half, y - half);
        let (outer_x1, outer_y1) = (x + w + half, y + h + half);
        self.fill_area(outer_x0, outer_y0, outer_x1, y + half, style.color);
        self.fill_area(outer_x0, y + h - half, outer_x1, outer_y1, style.color);
        self.fill_area(outer_x0, outer_y0, x + half, outer_y1, style.color);
        self.fill_area(x + w - half, outer_y0, outer_x1, outer_y1, style.color);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &Style) {
        let advance = style.font_size * GLYPH_ADVANCE;
        let width = advance * text.chars().count() as f64;
        let ascent = style.font_size * GLYPH_ASCENT;
        self.fill_area(x, y - ascent, x + width, y, style.color);
        self.labels.push(text.to_string());
    }
}
