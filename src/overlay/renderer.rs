/// Compositing of annotation boxes and class labels onto a raster image
///
/// The renderer never mutates the caller's image: every call draws on a copy.
/// Text goes through the [`LabelPainter`] trait so the font is an opaque,
/// swappable capability.
use std::path::Path;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::warn;

use crate::error::ConfigError;
use crate::overlay::class_policy::{ClassPolicy, ClassRegistry};
use crate::overlay::geometry::ScaleTransform;
use crate::overlay::palette::ColorTable;
use crate::voc::parser::AnnotationSet;

/// Preferred label position: this many pixels above the box
pub const LABEL_OFFSET_ABOVE: i32 = 20;
/// Fallback label position when the preferred one leaves the image: inside the box
pub const LABEL_OFFSET_INSIDE: i32 = 10;

const PLACEHOLDER_TEXT_ORIGIN: (i32, i32) = (30, 200);
const PLACEHOLDER_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Draws a single line of text onto a canvas
pub trait LabelPainter {
    /// Paint `text` with its top-left corner at `(x, y)`
    fn paint(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>);

    /// Height of one line of text in pixels
    fn line_height(&self) -> u32;
}

/// [`LabelPainter`] backed by a TrueType/OpenType font
///
/// Any script the font covers can be drawn, so localized class names only need a
/// font with the matching glyphs.
#[derive(Clone)]
pub struct GlyphPainter {
    font: FontArc,
    scale: PxScale,
}

impl GlyphPainter {
    pub fn from_bytes(bytes: Vec<u8>, size: f32) -> Option<Self> {
        let font = FontArc::try_from_vec(bytes).ok()?;
        Some(Self { font, scale: PxScale::from(size) })
    }

    pub fn from_file(path: &Path, size: f32) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes, size).ok_or_else(|| ConfigError::FontParse(path.to_path_buf()))
    }
}

impl std::fmt::Debug for GlyphPainter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphPainter").field("scale", &self.scale).finish()
    }
}

impl LabelPainter for GlyphPainter {
    fn paint(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        draw_text_mut(canvas, color, x, y, self.scale, &self.font, text);
    }

    fn line_height(&self) -> u32 {
        self.scale.y.ceil() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    pub box_thickness: u32,
    /// Overrides the class color for label text
    pub label_color: Option<Rgb<u8>>,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            box_thickness: crate::config::DEFAULT_BOX_THICKNESS,
            label_color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    pub suppressed: usize,
}

pub struct OverlayRenderer<'a> {
    pub policy: &'a ClassPolicy,
    pub colors: &'a ColorTable,
    pub style: RenderStyle,
    pub painter: Option<&'a dyn LabelPainter>,
}

impl<'a> OverlayRenderer<'a> {
    /// Draw every unsuppressed box of `annotations` onto a copy of `base`
    ///
    /// `base` is expected at display size; box coordinates are mapped through
    /// `transform`. New classes are appended to `registry` in document order.
    pub fn render(
        &self,
        base: &RgbImage,
        annotations: &AnnotationSet,
        transform: &ScaleTransform,
        registry: &mut ClassRegistry,
    ) -> (RgbImage, RenderStats) {
        let mut canvas = base.clone();
        let mut stats = RenderStats::default();

        for bbox in &annotations.boxes {
            let known_classes = registry.len();
            let Some(resolved) = self.policy.resolve(&bbox.class_name, registry) else {
                stats.suppressed += 1;
                continue;
            };

            if resolved.index >= self.colors.len() && resolved.index >= known_classes {
                warn!(
                    "Class {:?} has index {} but the color table only has {} colors; reusing colors",
                    bbox.class_name,
                    resolved.index,
                    self.colors.len()
                );
            }
            let color = self.colors.color_wrapped(resolved.index);

            let top_left = transform.transform_point(bbox.x1, bbox.y1);
            let bottom_right = transform.transform_point(bbox.x2, bbox.y2);
            draw_box(&mut canvas, top_left, bottom_right, color, self.style.box_thickness);

            if let Some(painter) = self.painter {
                let (x, y) = clamp_anchor(label_anchor(top_left), canvas.dimensions());
                let text_color = self.style.label_color.unwrap_or(color);
                painter.paint(&mut canvas, x, y, &resolved.label, text_color);
            }
            stats.drawn += 1;
        }

        (canvas, stats)
    }
}

/// Top-left position of a box label
///
/// Above the box when there is room, otherwise just inside its top-left corner.
pub fn label_anchor((x1, y1): (i32, i32)) -> (i32, i32) {
    if y1.saturating_sub(LABEL_OFFSET_ABOVE) < 0 {
        (x1.saturating_add(LABEL_OFFSET_INSIDE), y1.saturating_add(LABEL_OFFSET_INSIDE))
    } else {
        (x1, y1 - LABEL_OFFSET_ABOVE)
    }
}

/// Keep a label origin within one canvas size of the canvas
///
/// Text far off-canvas draws nothing either way, and glyph offsets added to an
/// extreme origin would overflow.
fn clamp_anchor((x, y): (i32, i32), (width, height): (u32, u32)) -> (i32, i32) {
    let bound = |v: i32, extent: u32| -> i32 {
        let extent = extent.min(i32::MAX as u32 / 4) as i32;
        v.clamp(-extent, extent.saturating_mul(2))
    };
    (bound(x, width), bound(y, height))
}

/// Draw a rectangle outline; corners may come in any order and thickness grows inward
pub fn draw_box(
    canvas: &mut RgbImage,
    (x1, y1): (i32, i32),
    (x2, y2): (i32, i32),
    color: Rgb<u8>,
    thickness: u32,
) {
    let (width, height) = canvas.dimensions();
    let thickness = thickness.min(i32::MAX as u32 / 4) as i32;
    // Off-canvas coordinates are pulled in just far enough to stay off-canvas
    let clamp = |v: i32, max: u32| -> i32 {
        let limit = (max as i64 + thickness as i64 + 1).min(i32::MAX as i64 / 2) as i32;
        v.clamp(-thickness - 1, limit)
    };

    let (left, right) = (clamp(x1.min(x2), width), clamp(x1.max(x2), width));
    let (top, bottom) = (clamp(y1.min(y2), height), clamp(y1.max(y2), height));

    for t in 0..thickness {
        let (l, tp, r, b) = (left + t, top + t, right - t, bottom - t);
        if l > r || tp > b {
            break;
        }
        let rect = Rect::at(l, tp).of_size((r - l + 1) as u32, (b - tp + 1) as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Cover image shown before an image set is chosen
pub fn placeholder(width: u32, height: u32, message: &str, painter: Option<&dyn LabelPainter>) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    if let Some(painter) = painter {
        let line_height = painter.line_height() as i32;
        let (x, baseline) = PLACEHOLDER_TEXT_ORIGIN;
        let max_y = (height as i32 - line_height).max(0);
        let y = (baseline - line_height).clamp(0, max_y);
        painter.paint(&mut canvas, x.min(width as i32), y, message, PLACEHOLDER_TEXT_COLOR);
    }
    canvas
}
