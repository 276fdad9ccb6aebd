//! Reference encoding loader: one labelled embedding per image in a directory.
//!
//! Labels come from file stems (`alice.jpg` → `alice`). Images without a
//! detectable face are skipped with a warning; loading never fails because of
//! a single bad file.

use crate::engine::{EngineError, FaceEngine};
use crate::types::{KnownFace, KnownFaceSet, UNKNOWN_LABEL};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted as reference images (compared case-insensitively).
pub const REFERENCE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("known faces directory not found: {0}; create it and add images such as alice.jpg")]
    DirectoryNotFound(String),
    #[error("failed to list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("face engine failed on {file}: {source}")]
    Engine {
        file: String,
        #[source]
        source: EngineError,
    },
}

/// Why a reference image contributed no face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoFace,
    Unreadable(String),
    ReservedName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoFace => f.write_str("no face found"),
            SkipReason::Unreadable(e) => write!(f, "unreadable image: {e}"),
            SkipReason::ReservedName => write!(f, "{UNKNOWN_LABEL:?} is a reserved label"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of loading a reference directory.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub known: KnownFaceSet,
    pub skipped: Vec<SkippedImage>,
}

fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Reference image paths in `dir`, sorted by file name.
pub fn reference_images(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    if !dir.is_dir() {
        return Err(LoaderError::DirectoryNotFound(dir.display().to_string()));
    }

    let io_err = |source: std::io::Error| LoaderError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_reference_image(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Encode every reference image in `dir`. When an image holds several faces
/// the first in detector order is used.
pub fn load_known_faces<E: FaceEngine>(
    engine: &mut E,
    dir: &Path,
) -> Result<LoadOutcome, LoaderError> {
    let mut outcome = LoadOutcome::default();

    for path in reference_images(dir)? {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match encode_reference(engine, &path, &name) {
            Ok(encoding) => {
                tracing::info!(file = %file, name = %name, "loaded face");
                outcome.known.push(KnownFace { name, encoding });
            }
            Err(Skip::Reason(reason)) => {
                tracing::warn!(file = %file, %reason, "skipping reference image");
                outcome.skipped.push(SkippedImage { path, reason });
            }
            Err(Skip::Engine(source)) => return Err(LoaderError::Engine { file, source }),
        }
    }

    tracing::info!(
        loaded = outcome.known.len(),
        skipped = outcome.skipped.len(),
        dir = %dir.display(),
        "reference faces loaded"
    );
    Ok(outcome)
}

enum Skip {
    Reason(SkipReason),
    Engine(EngineError),
}

fn encode_reference<E: FaceEngine>(
    engine: &mut E,
    path: &Path,
    name: &str,
) -> Result<crate::types::Embedding, Skip> {
    if name == UNKNOWN_LABEL {
        return Err(Skip::Reason(SkipReason::ReservedName));
    }

    let image = image::open(path)
        .map_err(|e| Skip::Reason(SkipReason::Unreadable(e.to_string())))?
        .to_rgb8();

    let faces = engine.locate(&image).map_err(Skip::Engine)?;
    let Some(first) = faces.first() else {
        return Err(Skip::Reason(SkipReason::NoFace));
    };
    if faces.len() > 1 {
        tracing::debug!(
            path = %path.display(),
            faces = faces.len(),
            "several faces, using the first"
        );
    }

    engine.encode(&image, first).map_err(Skip::Engine)
}
