use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{load_known_faces, FrameMatcher, MatchPolicy, OnnxFaceEngine};
use rollcall_hw::Camera;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod display;
mod overlay;
mod session;

use config::Config;
use display::PreviewWindow;
use overlay::Overlay;
use session::{Session, SessionEnd};

const WINDOW_TITLE: &str = "Face Recognition Attendance";

#[derive(Parser)]
#[command(name = "rollcall", about = "Webcam face recognition attendance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory of reference images, one person per file (<name>.jpg)
    #[arg(long)]
    known_faces: Option<PathBuf>,

    /// CSV file attendance is appended to
    #[arg(long)]
    output: Option<PathBuf>,

    /// V4L2 capture device (e.g., /dev/video0)
    #[arg(long)]
    device: Option<String>,

    /// How a face is matched when several known faces pass: first | best
    #[arg(long)]
    match_policy: Option<MatchPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// List V4L2 capture devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Devices { json }) = cli.command {
        return list_devices(json);
    }

    let mut config = Config::from_env();
    if let Some(dir) = cli.known_faces {
        config.known_faces_dir = dir;
    }
    if let Some(path) = cli.output {
        config.output_path = path;
    }
    if let Some(device) = cli.device {
        config.camera_device = device;
    }
    if let Some(policy) = cli.match_policy {
        config.match_policy = policy;
    }

    run(&config)
}

fn run(config: &Config) -> Result<()> {
    // Fail on a bad reference directory before paying for model load.
    rollcall_core::loader::reference_images(&config.known_faces_dir)
        .context("cannot read known faces")?;

    let mut engine = OnnxFaceEngine::load(&config.model_dir).with_context(|| {
        format!("failed to load models from {}", config.model_dir.display())
    })?;

    let outcome = load_known_faces(&mut engine, &config.known_faces_dir)
        .context("failed to load known faces")?;
    if outcome.known.is_empty() {
        tracing::warn!("no known faces loaded; every face will be labelled Unknown");
    }

    let overlay = Overlay::load(config.font_path.as_deref());

    let camera = Camera::open(
        &config.camera_device,
        config.frame_width,
        config.frame_height,
    )
    .with_context(|| format!("could not open webcam {}", config.camera_device))?;
    let stream = camera
        .stream(config.warmup_frames)
        .context("could not start capture")?;

    let mut window = PreviewWindow::open(WINDOW_TITLE, camera.width, camera.height)?;

    let mut session = Session::new(
        engine,
        outcome.known,
        FrameMatcher::new(config.match_policy),
        overlay,
    );
    let result = session.run(stream, &mut window);
    let present: Vec<_> = session
        .attendance()
        .records()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    tracing::info!(?present, "recognized this session");

    // Whatever ended the loop, keep what was recorded.
    session
        .save_attendance(&config.output_path)
        .with_context(|| format!("failed to save {}", config.output_path.display()))?;

    match result? {
        SessionEnd::QuitRequested => Ok(()),
        SessionEnd::DeviceFailed => {
            tracing::warn!("session ended early: webcam stopped delivering frames");
            Ok(())
        }
    }
}

fn list_devices(json: bool) -> Result<()> {
    let devices = Camera::list_devices();

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No video capture devices found");
        return Ok(());
    }
    for device in &devices {
        println!("{}\t{}\t({}, {})", device.path, device.name, device.driver, device.bus);
    }
    Ok(())
}
