//! pointscore CLI
//!
//! Scores photos of board-game scoreboards: finds the numbers, reads them
//! and adds them up. Keeps the last few scored images in a history.
//!
//! Copyright (c) 2025 Michael A Wright

mod render;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use core_pipeline::{
    CaptureSource, ContourDetector, PipelineConfig, SessionId, TesseractRecognizer,
};
use score_session::{Backends, ScoreController};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use walkdir::WalkDir;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nhost:   ",
    env!("BUILT_HOST"),
    "\ncommit: ",
    env!("BUILT_GIT_COMMIT_HASH"),
    "\nbuilt:  ",
    env!("BUILT_TIME_UTC"),
);

/// File extensions picked up by `batch`
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

#[derive(Parser)]
#[command(name = "pointscore")]
#[command(about = "Score a board-game scoreboard photo: detect numbers, read them, add them up", long_about = None)]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// JSON pipeline configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log region counts and raw recognized text
    #[arg(long, global = true)]
    debug: bool,

    /// Tesseract data directory (defaults to the system location)
    #[arg(long, global = true)]
    tessdata: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single scoreboard image
    Score {
        /// Image file
        #[arg(short, long)]
        image: PathBuf,

        /// Exclude the n-th detected number (1-based, repeatable)
        #[arg(short, long)]
        exclude: Vec<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Score every image in a directory, then show the history
    Batch {
        /// Input directory or file
        #[arg(short, long)]
        input: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.debug {
        config.debug = true;
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(if config.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    info!(
        "pointscore {} ({}, {})",
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::PROFILE
    );

    match cli.command {
        Commands::Score {
            image,
            exclude,
            json,
        } => {
            let controller = start_controller(config, cli.tessdata);
            score_one(&controller, &image, &exclude, json).await
        }
        Commands::Batch { input, json } => {
            let controller = start_controller(config, cli.tessdata);
            score_batch(&controller, &input, json).await
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Defaults, then the optional JSON file, then `POINTSCORE_*` overrides
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid POINTSCORE_* environment override")?;
    Ok(config)
}

fn start_controller(config: PipelineConfig, tessdata: Option<String>) -> ScoreController {
    let backends = Backends::new(
        Arc::new(ContourDetector::new(config.detection)),
        Arc::new(TesseractRecognizer::new(tessdata)),
    );
    ScoreController::spawn(config, backends)
}

async fn score_one(
    controller: &ScoreController,
    path: &Path,
    exclude: &[usize],
    json: bool,
) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let report = controller
        .capture_bytes(CaptureSource::PhotoLibrary, &bytes)
        .await?;

    if report.is_aborted() {
        info!("{} could not be decoded as an image", path.display());
    }

    for &n in exclude {
        let Some(number) = n.checked_sub(1).and_then(|i| report.numbers.get(i)) else {
            bail!(
                "--exclude {} is out of range ({} numbers detected)",
                n,
                report.numbers.len()
            );
        };
        controller.toggle(number.id).await?;
    }

    let snapshot = controller.snapshot();
    if json {
        println!("{}", render::score_json(&snapshot)?);
    } else {
        print!("{}", render::score_text(&snapshot));
    }
    Ok(())
}

async fn score_batch(controller: &ScoreController, input: &Path, json: bool) -> Result<()> {
    let files = collect_images(input)?;
    if files.is_empty() {
        bail!("No images found in {}", input.display());
    }

    let mut sessions: HashMap<SessionId, PathBuf> = HashMap::new();
    for path in files {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let report = controller
            .capture_bytes(CaptureSource::PhotoLibrary, &bytes)
            .await?;
        info!(
            "{}: {} numbers, total {}",
            path.display(),
            report.numbers.len(),
            report.total
        );
        sessions.insert(report.session, path);
    }

    let rows = render::history_rows(&controller.snapshot(), &sessions);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render::history_text(&rows));
    }
    Ok(())
}

/// Image files under `input`, sorted by path
fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input) {
        let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_score_with_excludes() {
        let cli = Cli::try_parse_from([
            "pointscore",
            "score",
            "--image",
            "board.png",
            "-e",
            "2",
            "-e",
            "4",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Commands::Score { image, exclude, json } => {
                assert_eq!(image, PathBuf::from("board.png"));
                assert_eq!(exclude, vec![2, 4]);
                assert!(!json);
            }
            _ => panic!("expected score command"),
        }
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("round2")).unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt", "round2/c.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = collect_images(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "round2/c.png"]);
    }

    #[test]
    fn test_collect_images_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.png");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(collect_images(&path).unwrap(), vec![path]);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pointscore.json");
        std::fs::write(&path, r#"{"history_capacity": 5, "preprocess": {"contrast": 1.4}}"#)
            .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.preprocess.contrast, 1.4);
        assert_eq!(config.preprocess.brightness, 0.1);
    }

    #[test]
    fn test_load_config_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
