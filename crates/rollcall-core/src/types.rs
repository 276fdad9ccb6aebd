/// Label reserved for faces that match nobody. Never recorded as attendance
/// and never accepted as a reference name.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Cosine similarity in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// Face rectangle in integer pixel coordinates, edges inclusive of `top`/`left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceLocation {
    /// Round a detector box to pixels and trim it to a `width x height` image.
    pub fn from_bbox(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        Self {
            top: (bbox.y.round() as i32).max(0),
            right: ((bbox.x + bbox.width).round() as i32).min(width as i32),
            bottom: ((bbox.y + bbox.height).round() as i32).min(height as i32),
            left: (bbox.x.round() as i32).max(0),
        }
    }

    /// Multiply every edge by `factor`.
    pub fn scaled(self, factor: i32) -> Self {
        Self {
            top: self.top * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
            left: self.left * factor,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// A reference face loaded at startup.
#[derive(Debug, Clone)]
pub struct KnownFace {
    pub name: String,
    pub encoding: Embedding,
}

/// Reference faces in load order. Duplicate names are kept; lookups see the
/// earliest entry first.
#[derive(Debug, Clone, Default)]
pub struct KnownFaceSet {
    faces: Vec<KnownFace>,
}

impl KnownFaceSet {
    pub fn push(&mut self, face: KnownFace) {
        self.faces.push(face);
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.faces.iter().map(|f| f.name.as_str())
    }

    pub fn as_slice(&self) -> &[KnownFace] {
        &self.faces
    }
}

impl FromIterator<KnownFace> for KnownFaceSet {
    fn from_iter<I: IntoIterator<Item = KnownFace>>(iter: I) -> Self {
        Self {
            faces: iter.into_iter().collect(),
        }
    }
}

/// Identity assigned to a detected face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Known(name) => name,
            Label::Unknown => UNKNOWN_LABEL,
        }
    }

    pub fn known_name(&self) -> Option<&str> {
        match self {
            Label::Known(name) => Some(name),
            Label::Unknown => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labelled face in a frame. `location` is in downscaled-frame coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    pub label: Label,
    pub location: FaceLocation,
    pub similarity: Option<f32>,
}
