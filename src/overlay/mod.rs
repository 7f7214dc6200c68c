/// Annotation overlay engine
///
/// Colors, class filtering, display scaling and compositing of VOC boxes.
pub mod palette;
pub mod class_policy;
pub mod geometry;
pub mod renderer;

pub use palette::{build_color_table, ColorTable, COLOR_SEED};
pub use class_policy::{ClassFilter, ClassPolicy, ClassRegistry, ResolvedClass};
pub use geometry::{compute_scale, ScaleTransform};
pub use renderer::{GlyphPainter, LabelPainter, OverlayRenderer, RenderStats, RenderStyle};
