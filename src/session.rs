/// Viewer session: the long-lived state behind "user picked an image"
///
/// The session owns the class registry and color table so class colors stay
/// stable while the user moves between images. Every fallible step of a render
/// (reading, decoding, parsing) happens before the registry is touched, so a bad
/// file never leaves the session half-updated.
use std::path::{Path, PathBuf};
use image::{imageops, DynamicImage, RgbImage};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{
    OverlayConfig, DEFAULT_PLACEHOLDER_HEIGHT, DEFAULT_PLACEHOLDER_WIDTH, PLACEHOLDER_MESSAGE,
};
use crate::error::{ConfigError, ParseError, RenderError};
use crate::overlay::class_policy::{ClassPolicy, ClassRegistry};
use crate::overlay::geometry::{compute_scale, ScaleTransform};
use crate::overlay::palette::{build_color_table, ColorTable, COLOR_SEED};
use crate::overlay::renderer::{self, GlyphPainter, LabelPainter, OverlayRenderer, RenderStats};
use crate::voc::annotation_manager::{AnnotationLoad, AnnotationManager};
use crate::voc::parser::AnnotationSet;

/// What happened to the annotation of a rendered image
#[derive(Debug)]
pub enum AnnotationStatus {
    /// Boxes were composited (possibly zero of them)
    Drawn { path: Option<PathBuf>, stats: RenderStats },
    /// No annotation belongs to this image
    Missing,
    /// The annotation exists but could not be parsed; the image is shown without boxes
    Invalid { path: Option<PathBuf>, error: ParseError },
    /// The annotation exists but could not be read; the image is shown without boxes
    Unreadable { path: PathBuf, error: std::io::Error },
}

#[derive(Debug)]
pub struct RenderOutcome {
    /// Composited image at display size
    pub image: RgbImage,
    pub transform: ScaleTransform,
    pub status: AnnotationStatus,
}

/// One row of the class legend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub index: usize,
    pub class_name: String,
    pub label: String,
    pub color: [u8; 3],
}

pub struct OverlaySession {
    config: OverlayConfig,
    policy: ClassPolicy,
    registry: ClassRegistry,
    colors: ColorTable,
    painter: Option<Box<dyn LabelPainter>>,
    annotations: AnnotationManager,
}

impl OverlaySession {
    /// Validate the configuration and set up session state
    ///
    /// Configuration problems, including an unusable font, are reported here and
    /// never deferred to the first render.
    pub fn new(config: OverlayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.class_policy()?;

        let painter: Option<Box<dyn LabelPainter>> = match &config.font_path {
            Some(path) => {
                let painter = GlyphPainter::from_file(path, config.font_size)?;
                info!("Loaded label font {}", path.display());
                Some(Box::new(painter))
            }
            None => {
                info!("No label font configured; class labels will not be drawn");
                None
            }
        };

        let registry = ClassRegistry::with_classes(config.classes.iter().cloned());
        let colors = build_color_table(config.color_table_size(), COLOR_SEED);
        let annotations = AnnotationManager::new(config.annotation_dir.clone());
        debug!("Session ready: {} known classes, {} colors", registry.len(), colors.len());

        Ok(Self {
            config,
            policy,
            registry,
            colors,
            painter,
            annotations,
        })
    }

    /// Replace the label painter (for example with a font loaded from memory)
    pub fn with_painter(mut self, painter: Box<dyn LabelPainter>) -> Self {
        self.painter = Some(painter);
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.colors
    }

    pub fn annotation_manager(&self) -> &AnnotationManager {
        &self.annotations
    }

    /// Load an image from disk, find its annotation and composite it
    pub fn render_path(&mut self, image_path: &Path) -> Result<RenderOutcome, RenderError> {
        let image = decode_image(image_path)?;
        Ok(self.render_decoded(image_path, &image))
    }

    /// Composite an already decoded image, looking up its annotation by path
    pub fn render_decoded(&mut self, image_path: &Path, image: &DynamicImage) -> RenderOutcome {
        let load = self.annotations.load_for(image_path);
        self.compose(image, load)
    }

    /// Composite an image with annotation bytes supplied by the caller
    pub fn render_image(&mut self, image: &DynamicImage, annotation_xml: Option<&[u8]>) -> RenderOutcome {
        let load = match annotation_xml.map(AnnotationSet::from_bytes) {
            None => AnnotationLoad::Missing,
            Some(Ok(annotations)) => AnnotationLoad::Parsed { path: None, annotations },
            Some(Err(error)) => {
                warn!("Invalid annotation: {}", error);
                AnnotationLoad::Invalid { path: None, error }
            }
        };
        self.compose(image, load)
    }

    /// Cover image shown before an image set is chosen
    pub fn placeholder(&self) -> RgbImage {
        renderer::placeholder(
            DEFAULT_PLACEHOLDER_WIDTH,
            DEFAULT_PLACEHOLDER_HEIGHT,
            PLACEHOLDER_MESSAGE,
            self.painter.as_deref(),
        )
    }

    /// Classes seen so far with their display labels and colors
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.registry
            .iter()
            .map(|(index, class_name)| LegendEntry {
                index,
                class_name: class_name.to_string(),
                label: self.policy.label_for(class_name).to_string(),
                color: self.colors.color_wrapped(index).0,
            })
            .collect()
    }

    fn compose(&mut self, image: &DynamicImage, load: AnnotationLoad) -> RenderOutcome {
        let transform = compute_scale(
            image.width(),
            image.height(),
            self.config.max_display_width,
            self.config.max_display_height,
        );
        let base = resize_for_display(image, &transform);

        let (image, status) = match load {
            AnnotationLoad::Parsed { path, annotations } => {
                if let Some(declared) = annotations.size {
                    if declared != (image.width(), image.height()) {
                        warn!(
                            "Annotation declares size {:?} but image is {}x{}",
                            declared,
                            image.width(),
                            image.height()
                        );
                    }
                }
                let renderer = OverlayRenderer {
                    policy: &self.policy,
                    colors: &self.colors,
                    style: self.config.render_style(),
                    painter: self.painter.as_deref(),
                };
                let (composited, stats) = renderer.render(&base, &annotations, &transform, &mut self.registry);
                debug!("Drew {} boxes, suppressed {}", stats.drawn, stats.suppressed);
                (composited, AnnotationStatus::Drawn { path, stats })
            }
            AnnotationLoad::Missing => (base, AnnotationStatus::Missing),
            AnnotationLoad::Invalid { path, error } => (base, AnnotationStatus::Invalid { path, error }),
            AnnotationLoad::Unreadable { path, error } => (base, AnnotationStatus::Unreadable { path, error }),
        };

        RenderOutcome { image, transform, status }
    }
}

/// Read and decode an image; the format is detected from the file content
pub fn decode_image(path: &Path) -> Result<DynamicImage, RenderError> {
    let bytes = std::fs::read(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    image::load_from_memory(&bytes).map_err(|source| RenderError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn resize_for_display(image: &DynamicImage, transform: &ScaleTransform) -> RgbImage {
    let rgb = image.to_rgb8();
    if transform.is_identity() {
        return rgb;
    }
    imageops::resize(
        &rgb,
        transform.display_width,
        transform.display_height,
        imageops::FilterType::Triangle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use image::Rgb;

    use crate::overlay::renderer::tests::RecordingPainter;

    fn voc(objects: &[(&str, [i32; 4])]) -> String {
        let mut xml = String::from("<annotation>");
        for (name, [x1, y1, x2, y2]) in objects {
            xml.push_str(&format!(
                "<object><name>{name}</name><bndbox><xmin>{x1}</xmin><ymin>{y1}</ymin><xmax>{x2}</xmax><ymax>{y2}</ymax></bndbox></object>"
            ));
        }
        xml.push_str("</annotation>");
        xml
    }

    fn gray(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }

    #[test]
    fn test_conflicting_filters_fail_at_construction() {
        let config = OverlayConfig {
            ignore_names: Some(HashSet::from(["a".to_string()])),
            not_ignore_names: Some(HashSet::from(["b".to_string()])),
            ..Default::default()
        };
        assert!(matches!(OverlaySession::new(config), Err(ConfigError::ConflictingClassFilters)));
    }

    #[test]
    fn test_missing_font_fails_at_construction() {
        let config = OverlayConfig {
            font_path: Some(PathBuf::from("/definitely/not/here.ttf")),
            ..Default::default()
        };
        assert!(matches!(OverlaySession::new(config), Err(ConfigError::FontRead { .. })));
    }

    #[test]
    fn test_end_to_end_scaled_render() {
        let config = OverlayConfig {
            max_display_width: Some(400),
            max_display_height: Some(300),
            box_thickness: 1,
            ..Default::default()
        };
        let mut session = OverlaySession::new(config)
            .unwrap()
            .with_painter(Box::new(RecordingPainter::default()));

        let xml = voc(&[("car", [100, 100, 200, 200])]);
        let outcome = session.render_image(&gray(800, 600), Some(xml.as_bytes()));

        assert_eq!(outcome.transform.scale_x, 2.0);
        assert_eq!(outcome.transform.scale_y, 2.0);
        assert_eq!(outcome.image.dimensions(), (400, 300));

        let color = session.color_table().colors()[0];
        assert_eq!(outcome.image.get_pixel(50, 50), &color);
        assert_eq!(outcome.image.get_pixel(100, 100), &color);
        assert_ne!(outcome.image.get_pixel(75, 75), &color);
        assert!(matches!(
            outcome.status,
            AnnotationStatus::Drawn { path: None, stats: RenderStats { drawn: 1, suppressed: 0 } }
        ));
    }

    #[test]
    fn test_registry_survives_image_switches() {
        let mut session = OverlaySession::new(OverlayConfig::default()).unwrap();
        for class in ["dog", "cat", "dog"] {
            let xml = voc(&[(class, [1, 1, 5, 5])]);
            session.render_image(&gray(10, 10), Some(xml.as_bytes()));
        }
        assert_eq!(session.registry().get("dog"), Some(0));
        assert_eq!(session.registry().get("cat"), Some(1));

        let legend = session.legend();
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[1].class_name, "cat");
        assert_eq!(legend[1].color, session.color_table().colors()[1].0);
    }

    #[test]
    fn test_out_of_range_coordinates_do_not_abort_render() {
        let mut session = OverlaySession::new(OverlayConfig::default())
            .unwrap()
            .with_painter(Box::new(RecordingPainter::default()));

        let xml = r#"<annotation>
            <object><name>far</name><bndbox><xmin>1e30</xmin><ymin>0</ymin><xmax>1e30</xmax><ymax>5</ymax></bndbox></object>
            <object><name>tall</name><bndbox><xmin>2</xmin><ymin>-1e30</ymin><xmax>5</xmax><ymax>1e30</ymax></bndbox></object>
        </annotation>"#;
        let outcome = session.render_image(&gray(20, 20), Some(xml.as_bytes()));

        assert!(matches!(
            outcome.status,
            AnnotationStatus::Drawn { stats: RenderStats { drawn: 2, suppressed: 0 }, .. }
        ));
        assert_eq!(outcome.image.dimensions(), (20, 20));
        assert_eq!(session.registry().len(), 2);
    }

    #[test]
    fn test_parse_error_renders_plain_image() {
        let mut session = OverlaySession::new(OverlayConfig::default()).unwrap();
        let outcome = session.render_image(&gray(10, 10), Some(b"<annotation><object>"));

        assert!(matches!(outcome.status, AnnotationStatus::Invalid { .. }));
        assert!(outcome.image.pixels().all(|p| *p == Rgb([128, 128, 128])));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_missing_annotation_and_unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = OverlaySession::new(OverlayConfig::default()).unwrap();

        let outcome = session.render_image(&gray(4, 4), None);
        assert!(matches!(outcome.status, AnnotationStatus::Missing));

        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        assert!(matches!(session.render_path(&broken), Err(RenderError::Decode { .. })));
        assert!(matches!(
            session.render_path(&dir.path().join("absent.png")),
            Err(RenderError::Io { .. })
        ));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_known_classes_and_mapping_in_legend() {
        let config = OverlayConfig {
            classes: vec!["person".into(), "car".into()],
            name_mapping: [("person".to_string(), "人".to_string())].into_iter().collect(),
            ..Default::default()
        };
        let session = OverlaySession::new(config).unwrap();
        assert_eq!(session.color_table().len(), 2);

        let legend = session.legend();
        assert_eq!(legend[0].label, "人");
        assert_eq!(legend[1].label, "car");
    }
}
