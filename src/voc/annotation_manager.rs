/// Annotation manager for VOC image sets
///
/// Locates the annotation file that belongs to an image and loads it.
/// A missing annotation is a normal condition, and a broken one only affects
/// the image it belongs to.
use std::path::{Path, PathBuf};
use log::{debug, info, warn};

use crate::error::ParseError;
use crate::file_io::{annotation_candidates, is_file};
use crate::voc::parser::AnnotationSet;

/// Result of looking up and loading the annotation for one image
#[derive(Debug)]
pub enum AnnotationLoad {
    /// `path` is `None` when the caller supplied the annotation bytes directly
    Parsed { path: Option<PathBuf>, annotations: AnnotationSet },
    Missing,
    Invalid { path: Option<PathBuf>, error: ParseError },
    Unreadable { path: PathBuf, error: std::io::Error },
}

/// Pairs images with annotation files for the current session
#[derive(Debug, Clone, Default)]
pub struct AnnotationManager {
    /// User chosen annotation directory; when unset the VOC layout and the image's
    /// own directory are searched
    annotation_dir: Option<PathBuf>,
}

impl AnnotationManager {
    pub fn new(annotation_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = &annotation_dir {
            info!("Annotation directory: {}", dir.display());
        }
        Self { annotation_dir }
    }

    pub fn annotation_dir(&self) -> Option<&Path> {
        self.annotation_dir.as_deref()
    }

    pub fn set_annotation_dir(&mut self, annotation_dir: Option<PathBuf>) {
        self.annotation_dir = annotation_dir;
    }

    /// Find the annotation file for an image, if one exists
    pub fn locate(&self, image_path: &Path) -> Option<PathBuf> {
        annotation_candidates(image_path, self.annotation_dir.as_deref())
            .into_iter()
            .find(|candidate| is_file(candidate))
    }

    /// Locate and parse the annotation for an image
    pub fn load_for(&self, image_path: &Path) -> AnnotationLoad {
        let Some(path) = self.locate(image_path) else {
            debug!("No annotation found for {}", image_path.display());
            return AnnotationLoad::Missing;
        };

        match AnnotationSet::from_file(&path) {
            Ok(Ok(annotations)) => {
                debug!("Loaded {} boxes from {}", annotations.len(), path.display());
                AnnotationLoad::Parsed { path: Some(path), annotations }
            }
            Ok(Err(error)) => {
                warn!("Invalid annotation {}: {}", path.display(), error);
                AnnotationLoad::Invalid { path: Some(path), error }
            }
            Err(error) => {
                warn!("Failed to read annotation {}: {}", path.display(), error);
                AnnotationLoad::Unreadable { path, error }
            }
        }
    }
}
