use rollcall_core::MatchPolicy;
use std::path::PathBuf;

/// Session configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of `<name>.(jpg|jpeg|png)` reference images.
    pub known_faces_dir: PathBuf,
    /// CSV file attendance is appended to.
    pub output_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Frames discarded at stream start while exposure settles.
    pub warmup_frames: usize,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// TrueType font for labels. The bundled DejaVu Sans when `None`.
    pub font_path: Option<PathBuf>,
    pub match_policy: MatchPolicy,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            lookup(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        let match_policy = match lookup("ROLLCALL_MATCH_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring ROLLCALL_MATCH_POLICY");
                MatchPolicy::default()
            }),
            None => MatchPolicy::default(),
        };

        Self {
            known_faces_dir: path("ROLLCALL_KNOWN_FACES", "known_faces"),
            output_path: path("ROLLCALL_OUTPUT", "attendance.csv"),
            camera_device: lookup("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|| "/dev/video0".to_string()),
            frame_width: parse_or(&lookup, "ROLLCALL_FRAME_WIDTH", 640),
            frame_height: parse_or(&lookup, "ROLLCALL_FRAME_HEIGHT", 480),
            warmup_frames: parse_or(&lookup, "ROLLCALL_WARMUP_FRAMES", 4),
            model_dir: lookup("ROLLCALL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(rollcall_core::default_model_dir),
            font_path: lookup("ROLLCALL_FONT").map(PathBuf::from),
            match_policy,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
