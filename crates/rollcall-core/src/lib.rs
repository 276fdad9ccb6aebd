//! rollcall-core — Face recognition attendance engine.
//!
//! SCRFD detection and ArcFace recognition run through ONNX Runtime. On top
//! of them sit the reference loader, the per-frame matcher and the session
//! attendance log.

pub mod alignment;
pub mod attendance;
pub mod detector;
pub mod engine;
pub mod loader;
pub mod matcher;
pub mod recognizer;
pub mod types;

#[cfg(test)]
mod testing;

pub use attendance::{AttendanceError, AttendanceLog, AttendanceRecord};
pub use detector::FaceDetector;
pub use engine::{EngineError, FaceEngine, OnnxFaceEngine};
pub use loader::{load_known_faces, LoadOutcome, LoaderError, SkipReason, SkippedImage};
pub use matcher::{FrameMatcher, MatchPolicy, Matcher, UPSCALE_FACTOR};
pub use recognizer::FaceRecognizer;
pub use types::{
    BoundingBox, Detection, Embedding, FaceLocation, KnownFace, KnownFaceSet, Label, UNKNOWN_LABEL,
};

use std::path::PathBuf;

/// Default model directory: `$XDG_DATA_HOME/rollcall/models`, falling back
/// to `~/.local/share/rollcall/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
        .join("models")
}
