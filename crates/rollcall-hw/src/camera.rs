//! V4L2 webcam capture via the `v4l` crate.

use crate::frame::{Frame, PixelLayout};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const STREAM_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("end of stream")]
    EndOfStream,
}

/// Info about a discovered V4L2 capture device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    layout: PixelLayout,
}

impl Camera {
    /// Open a V4L2 camera (e.g., "/dev/video0") and negotiate a colour format
    /// close to `width x height`.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; most UVC webcams offer it at every resolution. Drivers
        // that refuse it hand back their preferred format instead.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = width;
        fmt.height = height;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let layout = layout_for(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, RGB3 or BGR3)"
            ))
        })?;

        check_negotiated_size(layout, negotiated.width, negotiated.height)?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            layout,
        })
    }

    /// Start streaming, discarding `warmup` frames while auto exposure settles.
    pub fn stream(&self, warmup: usize) -> Result<CameraStream<'_>, CameraError> {
        let stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| {
                CameraError::CaptureFailed(format!("failed to create mmap stream: {e}"))
            })?;

        let mut stream = CameraStream {
            camera: self,
            stream,
        };

        if warmup > 0 {
            tracing::info!(count = warmup, "discarding warmup frames");
            for _ in 0..warmup {
                stream.next_frame()?;
            }
        }

        Ok(stream)
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

fn layout_for(fourcc: FourCC) -> Option<PixelLayout> {
    match &fourcc.repr {
        b"YUYV" => Some(PixelLayout::Yuyv),
        b"MJPG" => Some(PixelLayout::Mjpg),
        b"RGB3" => Some(PixelLayout::Rgb),
        b"BGR3" => Some(PixelLayout::Bgr),
        _ => None,
    }
}

fn check_negotiated_size(
    layout: PixelLayout,
    width: u32,
    height: u32,
) -> Result<(), CameraError> {
    layout
        .check_width(width)
        .map_err(|e| CameraError::FormatNegotiationFailed(format!("{width}x{height}: {e}")))
}

/// An active capture stream. Dropping it stops streaming and releases the
/// driver buffers.
pub struct CameraStream<'a> {
    camera: &'a Camera,
    stream: MmapStream<'a>,
}

impl CameraStream<'_> {
    /// Dequeue the next frame in the device's native layout.
    pub fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let camera = self.camera;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = match camera.layout.frame_len(camera.width, camera.height) {
            Some(expected) => {
                if buf.len() < expected {
                    return Err(CameraError::CaptureFailed(format!(
                        "{:?} buffer too short: expected {expected}, got {}",
                        camera.layout,
                        buf.len()
                    )));
                }
                buf[..expected].to_vec()
            }
            None if used == 0 => {
                return Err(CameraError::CaptureFailed("empty MJPG buffer".into()));
            }
            None => buf[..used].to_vec(),
        };

        Ok(Frame {
            data,
            width: camera.width,
            height: camera.height,
            layout: camera.layout,
            timestamp: std::time::Instant::now(),
            sequence: meta.sequence,
        })
    }
}

impl Drop for CameraStream<'_> {
    fn drop(&mut self) {
        tracing::info!(device = %self.camera.device_path, "camera released");
    }
}
