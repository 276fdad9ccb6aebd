//! rollcall-hw — Hardware abstraction for webcam capture.
//!
//! Provides V4L2-based colour camera access and conversion of the
//! driver's native pixel layouts into RGB.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream, DeviceInfo};
pub use frame::{Frame, FrameError, PixelLayout};
