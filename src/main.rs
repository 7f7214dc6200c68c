use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use vocview::batch::{self, BatchOptions};
use vocview::file_io::{is_directory, is_file, output_path_for, output_path_keeping_extension};
use vocview::logging;
use vocview::session::{AnnotationStatus, OverlaySession};
use vocview::settings::UserSettings;

const APP_NAME: &str = "vocview";
const DEFAULT_OUTPUT_DIR: &str = "overlays";
const PLACEHOLDER_FILE_NAME: &str = "placeholder.png";

#[derive(Parser, Debug)]
#[command(
    name = "vocview",
    version,
    about = "Overlay PASCAL VOC bounding boxes on an image or an image directory"
)]
struct Args {
    /// Image file or directory of images
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Directory holding <image name>.xml annotations
    #[arg(short, long, value_name = "DIR")]
    annotations: Option<PathBuf>,

    /// Where rendered images are written (default: <image dir>/overlays)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    settings: Option<String>,

    /// Font used for class labels
    #[arg(long, value_name = "PATH")]
    font: Option<PathBuf>,

    /// Largest displayed width in pixels
    #[arg(long, value_name = "PX")]
    max_width: Option<u32>,

    /// Largest displayed height in pixels
    #[arg(long, value_name = "PX")]
    max_height: Option<u32>,

    /// Box outline width in pixels
    #[arg(long, value_name = "PX")]
    thickness: Option<u32>,

    /// Hide a class (repeatable)
    #[arg(long, value_name = "CLASS", conflicts_with = "only")]
    ignore: Vec<String>,

    /// Draw only this class (repeatable)
    #[arg(long, value_name = "CLASS", conflicts_with = "ignore")]
    only: Vec<String>,

    /// Skip writing legend.json
    #[arg(long)]
    no_legend: bool,

    /// Write a commented settings file with the current values and exit
    #[arg(long)]
    init_settings: bool,

    /// Export the captured log lines to the log directory on exit
    #[arg(long)]
    export_logs: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command line values take precedence over the settings file
    fn apply_to(&self, settings: &mut UserSettings) {
        if let Some(dir) = &self.annotations {
            settings.annotation_dir = Some(dir.to_string_lossy().into_owned());
        }
        if let Some(font) = &self.font {
            settings.font_path = Some(font.to_string_lossy().into_owned());
        }
        if self.max_width.is_some() {
            settings.max_display_width = self.max_width;
        }
        if self.max_height.is_some() {
            settings.max_display_height = self.max_height;
        }
        if let Some(thickness) = self.thickness {
            settings.box_thickness = thickness;
        }
        if !self.ignore.is_empty() {
            if let Some(replaced) = settings.not_ignore_names.take() {
                info!("--ignore replaces not_ignore_names {:?} from the settings file", replaced);
            }
            if let Some(replaced) = settings.ignore_names.replace(self.ignore.clone()) {
                info!("--ignore replaces ignore_names {:?} from the settings file", replaced);
            }
        }
        if !self.only.is_empty() {
            if let Some(replaced) = settings.ignore_names.take() {
                info!("--only replaces ignore_names {:?} from the settings file", replaced);
            }
            if let Some(replaced) = settings.not_ignore_names.replace(self.only.clone()) {
                info!("--only replaces not_ignore_names {:?} from the settings file", replaced);
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let shared_log_buffer = logging::setup_logger(args.verbose);
    logging::setup_panic_hook(APP_NAME, Arc::clone(&shared_log_buffer));

    let result = run(&args);
    if let Err(e) = &result {
        error!("{:#}", e);
    }

    if args.export_logs {
        match logging::export_debug_logs(APP_NAME, &shared_log_buffer) {
            Ok(path) => println!("Debug logs written to {}", path.display()),
            Err(e) => warn!("Failed to export debug logs: {}", e),
        }
    }
    result
}

fn run(args: &Args) -> Result<()> {
    let mut settings = UserSettings::load(args.settings.as_deref());
    args.apply_to(&mut settings);

    if args.init_settings {
        let path = args
            .settings
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(UserSettings::settings_path);
        settings.save_to(&path).map_err(anyhow::Error::msg)?;
        println!("Settings written to {}", path.display());
        return Ok(());
    }

    let config = settings.to_overlay_config().context("Invalid settings")?;
    let mut session = OverlaySession::new(config).context("Failed to set up overlay session")?;

    match &args.path {
        Some(path) if is_directory(path) => {
            let output_dir = args.output.clone().unwrap_or_else(|| path.join(DEFAULT_OUTPUT_DIR));
            let options = BatchOptions {
                write_legend: !args.no_legend,
                ..BatchOptions::new(output_dir)
            };
            let summary = batch::render_directory(&mut session, path, &options)?;
            println!(
                "{} images rendered to {} ({} annotated, {} boxes, {} failed)",
                summary.images,
                options.output_dir.display(),
                summary.annotated,
                summary.boxes_drawn,
                summary.failed
            );
        }
        Some(path) if is_file(path) => render_single(&mut session, path, args)?,
        Some(path) => {
            warn!("{} does not exist", path.display());
            write_placeholder(&session, args)?;
        }
        None => write_placeholder(&session, args)?,
    }
    Ok(())
}

fn render_single(session: &mut OverlaySession, path: &Path, args: &Args) -> Result<()> {
    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(DEFAULT_OUTPUT_DIR),
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let outcome = session.render_path(path)?;
    match &outcome.status {
        AnnotationStatus::Drawn { stats, .. } => {
            info!("{} boxes drawn, {} suppressed", stats.drawn, stats.suppressed)
        }
        AnnotationStatus::Missing => info!("No annotation found for {}", path.display()),
        AnnotationStatus::Invalid { error, .. } => warn!("Annotation ignored: {}", error),
        AnnotationStatus::Unreadable { path, error } => {
            warn!("Annotation {} could not be read: {}", path.display(), error)
        }
    }

    let mut output_path = output_path_for(path, &output_dir);
    if same_file(&output_path, path) {
        output_path = output_path_keeping_extension(path, &output_dir);
    }
    outcome
        .image
        .save(&output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn write_placeholder(session: &OverlaySession, args: &Args) -> Result<()> {
    let output_dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let output_path = output_dir.join(PLACEHOLDER_FILE_NAME);
    session
        .placeholder()
        .save(&output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;
    println!("No image set chosen; wrote {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_filter_replaces_settings_filter() {
        let mut settings = UserSettings {
            ignore_names: Some(vec!["person".to_string()]),
            ..Default::default()
        };
        let args = Args::parse_from(["vocview", "--only", "car", "--only", "dog"]);
        args.apply_to(&mut settings);

        assert_eq!(settings.ignore_names, None);
        assert_eq!(settings.not_ignore_names, Some(vec!["car".to_string(), "dog".to_string()]));
        assert!(settings.to_overlay_config().is_ok());
    }

    #[test]
    fn test_cli_ignore_and_only_conflict() {
        assert!(Args::try_parse_from(["vocview", "--ignore", "a", "--only", "b"]).is_err());
    }
}
