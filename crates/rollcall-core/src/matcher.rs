//! Per-frame matching: downscale, locate, encode, compare against the known set.

use crate::engine::{EngineError, FaceEngine};
use crate::types::{Detection, Embedding, FaceLocation, KnownFace, KnownFaceSet, Label};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// Frames are shrunk by this factor in each dimension before detection.
pub const DOWNSCALE_FACTOR: f32 = 0.25;
/// Inverse of [`DOWNSCALE_FACTOR`]; maps reduced coordinates back to the frame.
pub const UPSCALE_FACTOR: i32 = 4;
/// Minimum cosine similarity for two ArcFace embeddings to be the same person.
pub const MATCH_THRESHOLD: f32 = 0.40;

/// Strategy for picking a known face for a query embedding.
pub trait Matcher {
    /// Index into `known` of the selected face and its similarity, if any passes.
    fn select(
        &self,
        query: &Embedding,
        known: &[KnownFace],
        threshold: f32,
    ) -> Option<(usize, f32)>;
}

/// First known face (in load order) that passes the threshold.
pub struct FirstMatch;

impl Matcher for FirstMatch {
    fn select(
        &self,
        query: &Embedding,
        known: &[KnownFace],
        threshold: f32,
    ) -> Option<(usize, f32)> {
        known
            .iter()
            .map(|face| query.similarity(&face.encoding))
            .enumerate()
            .find(|&(_, sim)| sim >= threshold)
    }
}

/// Highest-similarity known face that passes the threshold. Ties go to the
/// earlier face.
pub struct BestMatch;

impl Matcher for BestMatch {
    fn select(
        &self,
        query: &Embedding,
        known: &[KnownFace],
        threshold: f32,
    ) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, face) in known.iter().enumerate() {
            let sim = query.similarity(&face.encoding);
            if sim >= threshold && best.map_or(true, |(_, b)| sim > b) {
                best = Some((i, sim));
            }
        }
        best
    }
}

/// Named matching policy. `FirstMatch` is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    #[default]
    FirstMatch,
    BestMatch,
}

impl MatchPolicy {
    fn matcher(self) -> &'static dyn Matcher {
        match self {
            MatchPolicy::FirstMatch => &FirstMatch,
            MatchPolicy::BestMatch => &BestMatch,
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first-match" => Ok(MatchPolicy::FirstMatch),
            "best" | "best-match" => Ok(MatchPolicy::BestMatch),
            other => Err(format!(
                "unknown match policy {other:?} (expected \"first\" or \"best\")"
            )),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchPolicy::FirstMatch => "first",
            MatchPolicy::BestMatch => "best",
        })
    }
}

/// Shrink a frame by [`DOWNSCALE_FACTOR`] with bilinear filtering.
pub fn downscale(frame: &RgbImage) -> RgbImage {
    let scaled = |v: u32| ((v as f32 * DOWNSCALE_FACTOR).round() as u32).max(1);
    imageops::resize(
        frame,
        scaled(frame.width()),
        scaled(frame.height()),
        FilterType::Triangle,
    )
}

/// Labels every face in a frame. Holds no attendance state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMatcher {
    policy: MatchPolicy,
}

impl FrameMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Detect and label faces in an RGB frame. Locations are in downscaled
    /// coordinates; use [`FaceLocation::scaled`] with [`UPSCALE_FACTOR`] to draw.
    pub fn match_frame<E: FaceEngine>(
        &self,
        engine: &mut E,
        frame: &RgbImage,
        known: &KnownFaceSet,
    ) -> Result<Vec<Detection>, EngineError> {
        let small = downscale(frame);
        let faces = engine.locate(&small)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }

        let matcher = self.policy.matcher();
        let mut detections = Vec::with_capacity(faces.len());
        for face in &faces {
            let encoding = engine.encode(&small, face)?;
            let (label, similarity) =
                match matcher.select(&encoding, known.as_slice(), MATCH_THRESHOLD) {
                    Some((idx, sim)) => {
                        let name = known.as_slice()[idx].name.clone();
                        (Label::Known(name), Some(sim))
                    }
                    None => (Label::Unknown, None),
                };

            detections.push(Detection {
                label,
                location: FaceLocation::from_bbox(face, small.width(), small.height()),
                similarity,
            });
        }

        tracing::trace!(faces = detections.len(), "frame matched");
        Ok(detections)
    }
}
