use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use log::{debug, info, warn, error};

use crate::config::{OverlayConfig, DEFAULT_BOX_THICKNESS, DEFAULT_FONT_SIZE};
use crate::error::ConfigError;

/// User-specific settings that persist across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Largest displayed width; larger images are shrunk horizontally
    pub max_display_width: Option<u32>,

    /// Largest displayed height; larger images are shrunk vertically
    pub max_display_height: Option<u32>,

    /// Box outline width in pixels
    pub box_thickness: u32,

    /// Raw class name -> label shown on the image
    pub name_mapping: BTreeMap<String, String>,

    /// Classes that are never drawn (cannot be combined with not_ignore_names)
    pub ignore_names: Option<Vec<String>>,

    /// Only these classes are drawn (cannot be combined with ignore_names)
    pub not_ignore_names: Option<Vec<String>>,

    /// Known classes, registered in this order before any image is shown
    pub classes: Vec<String>,

    /// Size of the color table; defaults to the number of known classes
    pub num_colors: Option<usize>,

    /// TrueType/OpenType font used for labels
    pub font_path: Option<String>,

    /// Label font size in pixels
    pub font_size: f32,

    /// Label text color as [r, g, b]; the box color when unset
    pub label_color: Option<[u8; 3]>,

    /// Directory holding `<image stem>.xml` annotation files
    pub annotation_dir: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            max_display_width: None,
            max_display_height: None,
            box_thickness: DEFAULT_BOX_THICKNESS,
            name_mapping: BTreeMap::new(),
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

impl UserSettings {
    /// Get the path to the settings file
    /// On macOS: ~/Library/Application Support/vocview/settings.yaml
    /// On Linux: ~/.config/vocview/settings.yaml
    /// On Windows: C:\Users\<user>\AppData\Roaming\vocview\settings.yaml
    pub fn settings_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."));

        config_dir.join("vocview").join("settings.yaml")
    }

    /// Load settings from the YAML file
    /// If custom_path is provided, uses that path; otherwise uses the default settings path
    pub fn load(custom_path: Option<&str>) -> Self {
        let path = match custom_path {
            Some(p) => {
                info!("Using custom settings path: {}", p);
                PathBuf::from(p)
            }
            None => Self::settings_path(),
        };

        if !path.exists() {
            info!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    debug!("Settings: {:?}", settings);
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file at {:?}: {}", path, e);
                    warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file at {:?}: {}", path, e);
                warn!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to null; treat it as "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Write a commented settings file, creating the parent directory if needed
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create settings directory: {}", e))?;
            }
        }

        fs::write(path, self.to_yaml_with_comments())
            .map_err(|e| format!("Failed to write settings file: {}", e))?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Resolve into a validated engine configuration
    pub fn to_overlay_config(&self) -> Result<OverlayConfig, ConfigError> {
        let to_set = |names: &Vec<String>| names.iter().cloned().collect::<HashSet<String>>();

        let config = OverlayConfig {
            max_display_width: self.max_display_width,
            max_display_height: self.max_display_height,
            box_thickness: self.box_thickness,
            name_mapping: self.name_mapping.clone().into_iter().collect(),
            ignore_names: self.ignore_names.as_ref().map(to_set),
            not_ignore_names: self.not_ignore_names.as_ref().map(to_set),
            classes: self.classes.clone(),
            num_colors: self.num_colors,
            font_path: self.font_path.as_ref().map(PathBuf::from),
            font_size: self.font_size,
            label_color: self.label_color,
            annotation_dir: self.annotation_dir.as_ref().map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Generate YAML content with comments for new files
    pub fn to_yaml_with_comments(&self) -> String {
        format!(
            r#"# vocview settings
# This file is loaded automatically at startup.
# Settings specified here override the default values.

# Largest displayed size in pixels (null = never shrink). Width and height are
# clamped independently; images are never enlarged.
max_display_width: {}
max_display_height: {}

# Box outline width in pixels
box_thickness: {}

# Rename classes on screen, e.g.
# name_mapping:
#   person: "行人"
name_mapping: {}

# Class filter: set at most ONE of these two lists.
# ignore_names hides the listed classes; not_ignore_names shows only the listed classes.
ignore_names: {}
not_ignore_names: {}

# Known classes, given colors in this order before any image is shown
classes: {}

# Number of box colors (null = number of known classes, or 20 when none are listed)
num_colors: {}

# Font for class labels. Pick one that covers the scripts of your labels.
# Labels are not drawn when no font is set.
font_path: {}
font_size: {}

# Label text color [r, g, b] (null = same color as the box)
label_color: {}

# Directory with <image name>.xml annotations (null = VOC layout / image directory)
annotation_dir: {}
"#,
            value(&self.max_display_width),
            value(&self.max_display_height),
            value(&self.box_thickness),
            value(&self.name_mapping),
            value(&self.ignore_names),
            value(&self.not_ignore_names),
            value(&self.classes),
            value(&self.num_colors),
            value(&self.font_path),
            value(&self.font_size),
            value(&self.label_color),
            value(&self.annotation_dir),
        )
    }
}

/// One-line flow-style YAML for a single settings value (JSON is valid YAML)
fn value<T: Serialize>(v: &T) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "null".to_string())
}
