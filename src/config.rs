use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use image::Rgb;

use crate::error::ConfigError;
use crate::overlay::class_policy::{ClassFilter, ClassPolicy};
use crate::overlay::renderer::RenderStyle;

// Default values for configuration
// These serve as fallback values and can be used for "reset to defaults" functionality
pub const DEFAULT_BOX_THICKNESS: u32 = 2;
pub const DEFAULT_FONT_SIZE: f32 = 20.0;
pub const DEFAULT_NUM_COLORS: usize = 20;                 // PASCAL VOC class count
pub const DEFAULT_PLACEHOLDER_WIDTH: u32 = 600;
pub const DEFAULT_PLACEHOLDER_HEIGHT: u32 = 400;
pub const PLACEHOLDER_MESSAGE: &str = "Please choose image set folder";

/// Every option of the overlay engine, built once before the first render
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub max_display_width: Option<u32>,         // None: never shrink horizontally
    pub max_display_height: Option<u32>,        // None: never shrink vertically
    pub box_thickness: u32,                     // Outline width in display pixels
    pub name_mapping: HashMap<String, String>,  // Raw class name -> display label
    pub ignore_names: Option<HashSet<String>>,  // Classes never drawn
    pub not_ignore_names: Option<HashSet<String>>, // Only these classes are drawn
    pub classes: Vec<String>,                   // Known classes, registered in order up front
    pub num_colors: Option<usize>,              // Color table size; derived from `classes` when unset
    pub font_path: Option<PathBuf>,             // Label font; labels are skipped without one
    pub font_size: f32,                         // Label font size in pixels
    pub label_color: Option<[u8; 3]>,           // Label text color; class color when unset
    pub annotation_dir: Option<PathBuf>,        // Where `<stem>.xml` files live
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_display_width: None,
            max_display_height: None,
            box_thickness: DEFAULT_BOX_THICKNESS,
            name_mapping: HashMap::new(),
            ignore_names: None,
            not_ignore_names: None,
            classes: Vec::new(),
            num_colors: None,
            font_path: None,
            font_size: DEFAULT_FONT_SIZE,
            label_color: None,
            annotation_dir: None,
        }
    }
}

impl OverlayConfig {
    /// Reject inconsistent option combinations
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ignore_names.is_some() && self.not_ignore_names.is_some() {
            return Err(ConfigError::ConflictingClassFilters);
        }
        if self.max_display_width == Some(0) {
            return Err(ConfigError::ZeroDimension("max_display_width"));
        }
        if self.max_display_height == Some(0) {
            return Err(ConfigError::ZeroDimension("max_display_height"));
        }
        if self.box_thickness == 0 {
            return Err(ConfigError::ZeroDimension("box_thickness"));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ConfigError::InvalidFontSize(self.font_size));
        }
        Ok(())
    }

    pub fn class_policy(&self) -> Result<ClassPolicy, ConfigError> {
        let filter = ClassFilter::from_sets(self.ignore_names.clone(), self.not_ignore_names.clone())?;
        Ok(ClassPolicy::new(self.name_mapping.clone(), filter))
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            box_thickness: self.box_thickness,
            label_color: self.label_color.map(Rgb),
        }
    }

    /// Number of colors to generate for the session
    pub fn color_table_size(&self) -> usize {
        match self.num_colors {
            Some(n) => n,
            None if !self.classes.is_empty() => self.classes.len(),
            None => DEFAULT_NUM_COLORS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OverlayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_both_filters_rejected() {
        let config = OverlayConfig {
            ignore_names: Some(HashSet::from(["a".to_string()])),
            not_ignore_names: Some(HashSet::from(["b".to_string()])),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ConflictingClassFilters)));
        assert!(config.class_policy().is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = OverlayConfig { max_display_width: Some(0), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDimension("max_display_width"))));

        let config = OverlayConfig { box_thickness: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = OverlayConfig { font_size: f32::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_color_table_size() {
        assert_eq!(OverlayConfig::default().color_table_size(), DEFAULT_NUM_COLORS);

        let config = OverlayConfig { classes: vec!["a".into(), "b".into()], ..Default::default() };
        assert_eq!(config.color_table_size(), 2);

        let config = OverlayConfig { num_colors: Some(7), ..config };
        assert_eq!(config.color_table_size(), 7);
    }
}
