/// Batch rendering of an image directory
///
/// Images are decoded in parallel a chunk at a time, then composited one by one
/// in directory order so class registration (and therefore class colors) does
/// not depend on thread scheduling.
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{bail, Context, Result};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::file_io::{get_image_paths, is_directory, output_path_for, output_path_keeping_extension};
use crate::session::{decode_image, AnnotationStatus, OverlaySession};
use crate::utils::timing::{ScopedTimer, TimingStats};

pub const DEFAULT_PREFETCH: usize = 8;
pub const LEGEND_FILE_NAME: &str = "legend.json";

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Write `legend.json` next to the rendered images
    pub write_legend: bool,
    /// Number of images decoded ahead of the compositing loop
    pub prefetch: usize,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_legend: true,
            prefetch: DEFAULT_PREFETCH,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub images: usize,
    /// Images whose annotation was composited
    pub annotated: usize,
    pub boxes_drawn: usize,
    pub boxes_suppressed: usize,
    pub missing_annotations: usize,
    pub invalid_annotations: usize,
    /// Images that could not be decoded or saved
    pub failed: usize,
    pub legend_path: Option<PathBuf>,
}

/// Render every supported image of `image_dir` into `options.output_dir`
pub fn render_directory(
    session: &mut OverlaySession,
    image_dir: &Path,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    if !is_directory(image_dir) {
        bail!("Image directory {} does not exist", image_dir.display());
    }
    if is_directory(&options.output_dir) && same_directory(image_dir, &options.output_dir) {
        bail!(
            "Output directory {} is the image directory; rendered images would replace the originals",
            options.output_dir.display()
        );
    }
    let image_paths = get_image_paths(image_dir);
    info!("Found {} images in {}", image_paths.len(), image_dir.display());
    render_files(session, &image_paths, options)
}

/// Render the given images in order into `options.output_dir`
pub fn render_files(
    session: &mut OverlaySession,
    image_paths: &[PathBuf],
    options: &BatchOptions,
) -> Result<BatchSummary> {
    fs::create_dir_all(&options.output_dir).with_context(|| {
        format!("Failed to create output directory {}", options.output_dir.display())
    })?;
    let output_dir = fs::canonicalize(&options.output_dir).with_context(|| {
        format!("Failed to resolve output directory {}", options.output_dir.display())
    })?;
    let mut written: HashSet<PathBuf> = HashSet::new();

    let start = Instant::now();
    let mut summary = BatchSummary::default();
    let mut decode_stats = TimingStats::new("Decode chunk");
    let mut render_stats = TimingStats::new("Render");
    let mut save_stats = TimingStats::new("Save");

    for chunk in image_paths.chunks(options.prefetch.max(1)) {
        let decoded: Vec<_> = {
            let _timer = ScopedTimer::new(&mut decode_stats);
            chunk.par_iter().map(|path| (path, decode_image(path))).collect()
        };

        for (path, image) in decoded {
            summary.images += 1;
            let image = match image {
                Ok(image) => image,
                Err(e) => {
                    error!("Skipping image: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            let outcome = {
                let _timer = ScopedTimer::new(&mut render_stats);
                session.render_decoded(path, &image)
            };

            match &outcome.status {
                AnnotationStatus::Drawn { stats, .. } => {
                    summary.annotated += 1;
                    summary.boxes_drawn += stats.drawn;
                    summary.boxes_suppressed += stats.suppressed;
                }
                AnnotationStatus::Missing => summary.missing_annotations += 1,
                AnnotationStatus::Invalid { .. } | AnnotationStatus::Unreadable { .. } => {
                    summary.invalid_annotations += 1
                }
            }

            let Some(output_path) = pick_output_path(path, &output_dir, &written) else {
                error!("No free output name for {}; not saved", path.display());
                summary.failed += 1;
                continue;
            };
            let _timer = ScopedTimer::new(&mut save_stats);
            if let Err(e) = outcome.image.save(&output_path) {
                error!("Failed to save {}: {}", output_path.display(), e);
                summary.failed += 1;
            } else {
                debug!("Wrote {}", output_path.display());
                written.insert(output_path);
            }
        }
    }

    if options.write_legend {
        let legend_path = options.output_dir.join(LEGEND_FILE_NAME);
        match write_legend(session, &legend_path) {
            Ok(()) => summary.legend_path = Some(legend_path),
            Err(e) => warn!("{:#}", e),
        }
    }

    decode_stats.report();
    render_stats.report();
    save_stats.report();
    info!(
        "Rendered {} images ({} annotated, {} missing, {} invalid, {} failed) in {:.2}s",
        summary.images,
        summary.annotated,
        summary.missing_annotations,
        summary.invalid_annotations,
        summary.failed,
        start.elapsed().as_secs_f64()
    );
    Ok(summary)
}

/// `<stem>.png`, or `<file name>.png` when another input already took that name
///
/// Never returns the source image itself or a path written earlier in the batch.
fn pick_output_path(image_path: &Path, output_dir: &Path, written: &HashSet<PathBuf>) -> Option<PathBuf> {
    let source = fs::canonicalize(image_path).unwrap_or_else(|_| image_path.to_path_buf());
    let is_free = |candidate: &PathBuf| !written.contains(candidate) && *candidate != source;

    let preferred = output_path_for(image_path, output_dir);
    if is_free(&preferred) {
        return Some(preferred);
    }
    let fallback = output_path_keeping_extension(image_path, output_dir);
    if is_free(&fallback) {
        warn!("{} collides with another output; writing {}", image_path.display(), fallback.display());
        return Some(fallback);
    }
    None
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write the session's class legend as pretty JSON
pub fn write_legend(session: &OverlaySession, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create legend file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &session.legend())
        .with_context(|| format!("Failed to write legend file {}", path.display()))?;
    Ok(())
}
