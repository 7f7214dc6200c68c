/// Error types for the overlay engine
///
/// Parse and render errors are recovered per image by the session; configuration
/// errors are raised once, before the first render.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("annotation is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("annotation is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("object {object}: coordinate {text:?} is not a number")]
    InvalidCoordinate { object: usize, text: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ignore_names and not_ignore_names cannot both be set; choose one class filter")]
    ConflictingClassFilters,

    #[error("{0} must be greater than zero")]
    ZeroDimension(&'static str),

    #[error("font size must be a positive number, got {0}")]
    InvalidFontSize(f32),

    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a usable TrueType/OpenType font")]
    FontParse(PathBuf),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Crate-level error for callers that do not care which stage failed
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
