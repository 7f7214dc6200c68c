//! vocview: overlay PASCAL VOC bounding-box annotations on images.
//!
//! The engine lives in [`overlay`] and [`voc`]; [`session::OverlaySession`] ties
//! them together for an image browser, and [`batch`] renders whole directories.

pub mod batch;
pub mod config;
pub mod error;
pub mod file_io;
pub mod logging;
pub mod overlay;
pub mod session;
pub mod settings;
pub mod utils;
pub mod voc;

pub use config::OverlayConfig;
pub use error::{ConfigError, Error, ParseError, RenderError};
pub use overlay::{
    build_color_table, compute_scale, ClassFilter, ClassPolicy, ClassRegistry, ColorTable,
    OverlayRenderer, RenderStats, RenderStyle, ScaleTransform,
};
pub use session::{AnnotationStatus, LegendEntry, OverlaySession, RenderOutcome};
pub use settings::UserSettings;
pub use voc::{AnnotationSet, BoundingBox};
