//! Overlay renderer.
//!
//! `draw` is a pure function of the frame it is given: it clears the whole
//! surface and redraws every detection. Nothing is retained between calls.

use crate::frame::{BoundingBox, Frame};

/// Logical drawing size used by the overlay.
pub const SURFACE_WIDTH: u32 = 640;
pub const SURFACE_HEIGHT: u32 = 480;

/// Vertical gap between a box's top edge and its label baseline.
pub const LABEL_OFFSET: f64 = 5.0;

/// RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const RED: Color = Color([255, 0, 0, 255]);
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);
}

/// Stroke and text style for overlay drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub color: Color,
    pub line_width: f64,
    pub font_size: f64,
}

/// Red, 2-unit strokes and 14-unit labels.
pub const OVERLAY_STYLE: Style = Style {
    color: Color::RED,
    line_width: 2.0,
    font_size: 14.0,
};

/// A 2D drawing target provided by the host.
pub trait Surface {
    /// Logical size in drawing units.
    fn size(&self) -> (u32, u32);

    /// Erase the whole surface.
    fn clear(&mut self);

    /// Stroke an unfilled rectangle.
    fn stroke_rect(&mut self, rect: BoundingBox, style: &Style);

    /// Draw `text` with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &Style);
}

/// Clear `surface` and draw every detection in `frame`.
pub fn draw<S: Surface + ?Sized>(frame: &Frame, surface: &mut S) {
    surface.clear();
    for (_, detection) in frame.detections() {
        let bbox = detection.bounding_box;
        surface.stroke_rect(bbox, &OVERLAY_STYLE);
        surface.fill_text(
            &label(&detection.cls, detection.confidence),
            bbox.x_offset,
            bbox.y_offset - LABEL_OFFSET,
            &OVERLAY_STYLE,
        );
    }
}

/// `"<cls> (<pct>%)"` with the percentage to one decimal place.
pub fn label(cls: &str, confidence: f64) -> String {
    format!("{} ({}%)", cls, percent(confidence, 1))
}

/// Format `confidence` as a percentage with `decimals` fractional digits.
///
/// Rounding is half-up on the shortest decimal form of the input, so
/// `0.8765` gives `87.7` even though `0.8765 * 100.0` is slightly below
/// `87.65` in binary.
pub fn percent(confidence: f64, decimals: usize) -> String {
    if !confidence.is_finite() {
        return confidence.to_string();
    }
    let negative = confidence < 0.0;
    let repr = format!("{}", confidence.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    // Digits of confidence * 100, with `decimals` fractional digits kept.
    let keep = 2 + decimals;
    let mut digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    let frac: Vec<u8> = frac_part.bytes().map(|b| b - b'0').collect();
    digits.extend((0..keep).map(|i| frac.get(i).copied().unwrap_or(0)));
    let round_up = frac.get(keep).is_some_and(|d| *d >= 5);

    if round_up {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - decimals;
    let whole: String = digits[..split]
        .iter()
        .map(|d| char::from(b'0' + d))
        .collect::<String>()
        .trim_start_matches('0')
        .to_string();
    let whole = if whole.is_empty() { "0".to_string() } else { whole };
    let sign = if negative { "-" } else { "" };
    if decimals == 0 {
        return format!("{sign}{whole}");
    }
    let fraction: String = digits[split..].iter().map(|d| char::from(b'0' + d)).collect();
    format!("{sign}{whole}.{fraction}")
}
