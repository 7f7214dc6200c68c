/// PASCAL VOC annotation parser
///
/// This module parses VOC style XML annotation files:
/// `<annotation><object><name/><bndbox>xmin ymin xmax ymax</bndbox></object>...</annotation>`
///
/// The four `<bndbox>` children are read by position, not by tag name, and every
/// coordinate is truncated toward zero. Objects missing `<name>` or `<bndbox>` are
/// kept with an empty class name or zeroed coordinates.
use std::path::Path;
use std::str::FromStr;
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub class_name: String,
}

impl BoundingBox {
    pub fn corners(&self) -> ((i32, i32), (i32, i32)) {
        ((self.x1, self.y1), (self.x2, self.y2))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    /// Boxes in document order
    pub boxes: Vec<BoundingBox>,
    /// `<filename>`, when the file declares one
    pub filename: Option<String>,
    /// `<size><width>/<height>`, when the file declares both
    pub size: Option<(u32, u32)>,
}

impl AnnotationSet {
    /// Parse a VOC annotation from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let content = std::str::from_utf8(bytes)?;
        Self::parse_str(content)
    }

    /// Parse a VOC annotation from a string
    pub fn parse_str(content: &str) -> Result<Self, ParseError> {
        // Some VOC exports start with a DOCTYPE declaration
        let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
        let doc = Document::parse_with_options(content, options)?;
        let root = doc.root_element();

        let mut boxes = Vec::new();
        for (index, object) in root
            .descendants()
            .filter(|n| n.has_tag_name("object"))
            .enumerate()
        {
            boxes.push(parse_object(index, object)?);
        }

        Ok(Self {
            boxes,
            filename: child_text(root, "filename").map(str::to_string),
            size: parse_size(root),
        })
    }

    /// Read and parse an annotation file
    ///
    /// I/O errors are returned separately from parse errors so callers can tell a
    /// missing file from a broken one.
    pub fn from_file(path: &Path) -> std::io::Result<Result<Self, ParseError>> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl FromStr for AnnotationSet {
    type Err = ParseError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Self::parse_str(content)
    }
}

/// Shorthand for [`AnnotationSet::from_bytes`]
pub fn parse(xml_bytes: &[u8]) -> Result<AnnotationSet, ParseError> {
    AnnotationSet::from_bytes(xml_bytes)
}

fn parse_object(index: usize, object: Node) -> Result<BoundingBox, ParseError> {
    let class_name = child_text(object, "name").unwrap_or_default().to_string();

    let mut coords = [0i32; 4];
    if let Some(bndbox) = object.children().find(|n| n.has_tag_name("bndbox")) {
        for (slot, value) in coords
            .iter_mut()
            .zip(bndbox.children().filter(Node::is_element))
        {
            *slot = parse_coordinate(index, value.text().unwrap_or("0"))?;
        }
    }

    let [x1, y1, x2, y2] = coords;
    Ok(BoundingBox { x1, y1, x2, y2, class_name })
}

/// Parse a numeric text node as a float and truncate toward zero
fn parse_coordinate(object: usize, text: &str) -> Result<i32, ParseError> {
    let text = text.trim();
    let value = if text.is_empty() {
        0.0
    } else {
        text.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
            ParseError::InvalidCoordinate { object, text: text.to_string() }
        })?
    };
    Ok(value.trunc() as i32)
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(str::trim)
}

fn parse_size(root: Node) -> Option<(u32, u32)> {
    let size = root.children().find(|n| n.has_tag_name("size"))?;
    let width = child_text(size, "width")?.parse::<f64>().ok()?;
    let height = child_text(size, "height")?.parse::<f64>().ok()?;
    if width < 0.0 || height < 0.0 {
        return None;
    }
    Some((width as u32, height as u32))
}
