use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use vocview::batch::{render_directory, BatchOptions};
use vocview::session::AnnotationStatus;
use vocview::{OverlayConfig, OverlaySession, UserSettings};

fn write_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([128, 128, 128])).save(path).unwrap();
}

fn voc_xml(filename: &str, (width, height): (u32, u32), objects: &[(&str, [i32; 4])]) -> String {
    let mut xml = format!(
        "<annotation><folder>VOC2012</folder><filename>{filename}</filename>\
         <size><width>{width}</width><height>{height}</height><depth>3</depth></size>"
    );
    for (name, [x1, y1, x2, y2]) in objects {
        xml.push_str(&format!(
            "<object><name>{name}</name><pose>Unspecified</pose><difficult>0</difficult>\
             <bndbox><xmin>{x1}</xmin><ymin>{y1}</ymin><xmax>{x2}</xmax><ymax>{y2}</ymax></bndbox></object>"
        ));
    }
    xml.push_str("</annotation>");
    xml
}

/// dataset/JPEGImages/*.png + dataset/Annotations/*.xml
fn voc_dataset(root: &Path) -> std::path::PathBuf {
    let images = root.join("JPEGImages");
    let annotations = root.join("Annotations");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&annotations).unwrap();

    write_image(&images.join("000001.png"), 800, 600);
    fs::write(
        annotations.join("000001.xml"),
        voc_xml("000001.png", (800, 600), &[("car", [100, 100, 200, 200])]),
    )
    .unwrap();

    write_image(&images.join("000002.png"), 64, 48);
    fs::write(
        annotations.join("000002.xml"),
        voc_xml("000002.png", (64, 48), &[("person", [5, 5, 30, 40]), ("car", [1, 1, 9, 9])]),
    )
    .unwrap();

    write_image(&images.join("000003.png"), 32, 32);
    fs::write(annotations.join("000003.xml"), "<annotation><object><name>dog</name>").unwrap();

    images
}

#[test]
fn test_scaled_render_from_voc_layout() {
    let dir = tempfile::tempdir().unwrap();
    let images = voc_dataset(dir.path());

    let config = OverlayConfig {
        max_display_width: Some(400),
        max_display_height: Some(300),
        box_thickness: 1,
        ..Default::default()
    };
    let mut session = OverlaySession::new(config).unwrap();
    let outcome = session.render_path(&images.join("000001.png")).unwrap();

    assert_eq!(outcome.image.dimensions(), (400, 300));
    let color = session.color_table().colors()[0];
    assert_eq!(outcome.image.get_pixel(50, 50), &color);
    assert_eq!(outcome.image.get_pixel(100, 100), &color);
    match outcome.status {
        AnnotationStatus::Drawn { path, stats } => {
            assert_eq!(path, Some(dir.path().join("Annotations").join("000001.xml")));
            assert_eq!(stats.drawn, 1);
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[test]
fn test_batch_over_voc_layout_with_filter_and_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let images = voc_dataset(dir.path());

    let yaml = "not_ignore_names: [car, dog]\nname_mapping:\n  car: 汽车\n";
    let config = UserSettings::from_yaml(yaml).unwrap().to_overlay_config().unwrap();
    let mut session = OverlaySession::new(config).unwrap();

    let out = dir.path().join("out");
    let summary = render_directory(&mut session, &images, &BatchOptions::new(&out)).unwrap();

    assert_eq!(summary.images, 3);
    assert_eq!(summary.annotated, 2);
    assert_eq!(summary.boxes_drawn, 2);
    assert_eq!(summary.boxes_suppressed, 1);
    assert_eq!(summary.invalid_annotations, 1);
    assert_eq!(summary.failed, 0);

    // Suppressed classes never take a registry slot
    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.registry().get("person"), None);

    for name in ["000001.png", "000002.png", "000003.png"] {
        assert!(out.join(name).exists(), "{name} was not written");
    }
    let legend = fs::read_to_string(out.join("legend.json")).unwrap();
    let legend: serde_json::Value = serde_json::from_str(&legend).unwrap();
    assert_eq!(legend.as_array().unwrap().len(), 1);
    assert_eq!(legend[0]["label"], "汽车");
}

#[test]
fn test_annotation_dir_overrides_layout() {
    let dir = tempfile::tempdir().unwrap();
    let images = voc_dataset(dir.path());
    let custom = dir.path().join("custom");
    fs::create_dir(&custom).unwrap();
    fs::write(
        custom.join("000002.xml"),
        voc_xml("000002.png", (64, 48), &[("bird", [2, 2, 20, 20])]),
    )
    .unwrap();

    let config = OverlayConfig { annotation_dir: Some(custom), ..Default::default() };
    let mut session = OverlaySession::new(config).unwrap();

    let outcome = session.render_path(&images.join("000002.png")).unwrap();
    assert!(matches!(outcome.status, AnnotationStatus::Drawn { .. }));
    assert_eq!(session.registry().get("bird"), Some(0));

    let outcome = session.render_path(&images.join("000001.png")).unwrap();
    assert!(matches!(outcome.status, AnnotationStatus::Missing));
}
