//! Test doubles shared by the core unit tests.

use crate::engine::{EngineError, FaceEngine};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use std::collections::HashMap;

pub fn emb(values: &[f32]) -> Embedding {
    Embedding {
        values: values.to_vec(),
        model_version: None,
    }
}

pub fn bbox(x: f32, y: f32, width: f32, height: f32) -> BoundingBox {
    BoundingBox {
        x,
        y,
        width,
        height,
        confidence: 0.9,
        landmarks: None,
    }
}

/// Engine that "finds" scripted faces in images of a given size.
#[derive(Default)]
pub struct ScriptedEngine {
    faces: HashMap<(u32, u32), Vec<(BoundingBox, Embedding)>>,
    pub encode_calls: usize,
}

impl ScriptedEngine {
    pub fn script(&mut self, dimensions: (u32, u32), faces: Vec<(BoundingBox, Embedding)>) {
        self.faces.insert(dimensions, faces);
    }
}

impl FaceEngine for ScriptedEngine {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
        Ok(self
            .faces
            .get(&image.dimensions())
            .map(|faces| faces.iter().map(|(b, _)| b.clone()).collect())
            .unwrap_or_default())
    }

    fn encode(&mut self, image: &RgbImage, face: &BoundingBox) -> Result<Embedding, EngineError> {
        self.encode_calls += 1;
        let found = self
            .faces
            .get(&image.dimensions())
            .and_then(|faces| faces.iter().find(|(b, _)| b.x == face.x && b.y == face.y))
            .map(|(_, e)| e.clone());
        Ok(found.unwrap_or_else(|| emb(&[0.0])))
    }
}
