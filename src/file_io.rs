use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::warn;

/// Raster extensions that can be paired with an annotation (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 8] = ["bmp", "png", "jpg", "jpeg", "jpe", "jif", "jfif", "jfi"];

pub const ANNOTATION_EXTENSION: &str = "xml";

/// Directory names used by the VOC dataset layout
const VOC_IMAGE_DIR: &str = "JPEGImages";
const VOC_ANNOTATION_DIR: &str = "Annotations";

pub fn get_filename(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|os_str| os_str.to_str())
        .map(|s| s.to_string())
}

pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|metadata| metadata.is_file()).unwrap_or(false)
}

pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|metadata| metadata.is_dir()).unwrap_or(false)
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List the supported images of a directory in natural order
pub fn get_image_paths(directory_path: &Path) -> Vec<PathBuf> {
    let mut image_paths: Vec<PathBuf> = Vec::new();

    match fs::read_dir(directory_path) {
        Ok(paths) => {
            for entry in paths.flatten() {
                let path = entry.path();
                if is_supported_image(&path) && is_file(&path) {
                    image_paths.push(path);
                }
            }
        }
        Err(e) => warn!("Failed to read image directory {}: {}", directory_path.display(), e),
    }

    // Sort paths like Nautilus file viewer. `image_paths.sort()` does not work as expected
    alphanumeric_sort::sort_path_slice(&mut image_paths);
    image_paths
}

/// `<stem>.xml` for an image file name
pub fn annotation_file_name(image_path: &Path) -> Option<PathBuf> {
    let file_name = image_path.file_name()?;
    Some(Path::new(file_name).with_extension(ANNOTATION_EXTENSION))
}

/// Candidate annotation paths for an image, in lookup order
///
/// 1. `annotation_dir/<stem>.xml` when an annotation directory is configured
/// 2. the VOC sibling: `.../JPEGImages/a/b.jpg` -> `.../Annotations/a/b.xml`
/// 3. `<stem>.xml` next to the image
pub fn annotation_candidates(image_path: &Path, annotation_dir: Option<&Path>) -> Vec<PathBuf> {
    let Some(xml_name) = annotation_file_name(image_path) else {
        return Vec::new();
    };

    if let Some(dir) = annotation_dir {
        return vec![dir.join(xml_name)];
    }

    let mut candidates = Vec::with_capacity(2);
    if let Some(sibling) = voc_sibling_path(image_path) {
        candidates.push(sibling);
    }
    candidates.push(image_path.with_extension(ANNOTATION_EXTENSION));
    candidates
}

/// Swap the last `JPEGImages` path component for `Annotations` and the extension for `.xml`
fn voc_sibling_path(image_path: &Path) -> Option<PathBuf> {
    let components: Vec<Component> = image_path.components().collect();
    let position = components
        .iter()
        .rposition(|c| c.as_os_str() == OsStr::new(VOC_IMAGE_DIR))?;

    let mut sibling = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        if i == position {
            sibling.push(VOC_ANNOTATION_DIR);
        } else {
            sibling.push(component.as_os_str());
        }
    }
    Some(sibling.with_extension(ANNOTATION_EXTENSION))
}

/// Output file for a rendered image: `<output_dir>/<stem>.png`
pub fn output_path_for(image_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "image".into());
    output_dir.join(Path::new(&stem).with_extension("png"))
}

/// Output file that keeps the source extension: `<output_dir>/<file name>.png`
///
/// Used when two inputs share a stem, e.g. `a.png` and `a.bmp`.
pub fn output_path_keeping_extension(image_path: &Path, output_dir: &Path) -> PathBuf {
    let mut file_name = image_path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "image".into());
    file_name.push(".png");
    output_dir.join(file_name)
}
