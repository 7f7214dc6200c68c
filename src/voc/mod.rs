/// PASCAL VOC annotation support
///
/// This module parses VOC XML files and pairs them with the images they describe.
pub mod parser;
pub mod annotation_manager;

pub use parser::{AnnotationSet, BoundingBox};
pub use annotation_manager::{AnnotationLoad, AnnotationManager};
