//! The attendance session loop: capture → match → mark → draw → show → poll.

use crate::overlay::Overlay;
use chrono::Local;
use image::RgbImage;
use rollcall_core::attendance::TIME_FORMAT;
use rollcall_core::{
    AttendanceError, AttendanceLog, Detection, EngineError, FaceEngine, FrameMatcher, KnownFaceSet,
};
use rollcall_hw::{CameraError, CameraStream, Frame};
use std::path::Path;
use thiserror::Error;

/// Supplies captured frames. An error ends the session.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CameraError>;
}

impl FrameSource for CameraStream<'_> {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        CameraStream::next_frame(self)
    }
}

/// Presents annotated frames.
pub trait DisplaySink {
    fn show(&mut self, image: &RgbImage) -> Result<(), DisplayError>;
}

/// Non-blocking key poll, checked once per frame.
pub trait KeySource {
    fn poll_key(&mut self) -> Option<Key>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    /// The preview window was closed.
    Closed,
}

impl Key {
    pub fn is_quit(self) -> bool {
        matches!(self, Key::Char('q' | 'Q') | Key::Escape | Key::Closed)
    }
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to open window: {0}")]
    Open(String),
    #[error("failed to update window: {0}")]
    Update(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// How a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    QuitRequested,
    DeviceFailed,
}

/// One attendance session. Owns the engine, the reference faces and the
/// attendance recorded so far.
pub struct Session<E> {
    engine: E,
    known: KnownFaceSet,
    matcher: FrameMatcher,
    overlay: Overlay,
    attendance: AttendanceLog,
}

impl<E: FaceEngine> Session<E> {
    pub fn new(engine: E, known: KnownFaceSet, matcher: FrameMatcher, overlay: Overlay) -> Self {
        Self {
            engine,
            known,
            matcher,
            overlay,
            attendance: AttendanceLog::new(),
        }
    }

    pub fn attendance(&self) -> &AttendanceLog {
        &self.attendance
    }

    /// Run until a quit key or a capture failure. `source` is dropped, and the
    /// device with it, before this returns on every path.
    pub fn run<S, U>(&mut self, mut source: S, ui: &mut U) -> Result<SessionEnd, SessionError>
    where
        S: FrameSource,
        U: DisplaySink + KeySource,
    {
        tracing::info!(
            known = ?self.known.names().collect::<Vec<_>>(),
            policy = %self.matcher.policy(),
            labels = self.overlay.has_font(),
            "session started, press Q or ESC to quit"
        );

        let mut frames = 0u64;
        let end = loop {
            let frame = match source.next_frame() {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::error!(%error, "could not read from webcam");
                    break SessionEnd::DeviceFailed;
                }
            };
            let mut image = match frame.to_rgb() {
                Ok(image) => image,
                Err(error) => {
                    let sequence = frame.sequence;
                    tracing::error!(%error, sequence, "unusable frame from webcam");
                    break SessionEnd::DeviceFailed;
                }
            };
            frames += 1;

            let detections = self
                .matcher
                .match_frame(&mut self.engine, &image, &self.known)?;
            self.mark_present(&detections);

            self.overlay.draw(&mut image, &detections);
            ui.show(&image)?;

            if ui.poll_key().is_some_and(Key::is_quit) {
                tracing::info!("exiting");
                break SessionEnd::QuitRequested;
            }
        };
        drop(source);

        tracing::info!(frames, marked = self.attendance.len(), ?end, "session ended");
        Ok(end)
    }

    fn mark_present(&mut self, detections: &[Detection]) {
        let now = Local::now().naive_local();
        for detection in detections {
            let Some(name) = detection.label.known_name() else {
                continue;
            };
            if self.attendance.record_if_new(name, now) {
                tracing::info!(
                    name,
                    similarity = detection.similarity,
                    time = %now.format(TIME_FORMAT),
                    "attendance marked present"
                );
            }
        }
    }

    /// Append the session's attendance to `path`. Nothing is written when no
    /// one was recognized; returns the rows written otherwise.
    pub fn save_attendance(&self, path: &Path) -> Result<Option<usize>, AttendanceError> {
        if self.attendance.is_empty() {
            tracing::info!("no attendance recorded");
            return Ok(None);
        }

        let rows = self.attendance.append_csv(path)?;
        tracing::info!(path = %path.display(), rows, "attendance saved");
        Ok(Some(rows))
    }
}
