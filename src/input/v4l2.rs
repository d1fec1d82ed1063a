//! Video4Linux2 camera backend

use image::RgbImage;
use std::time::Duration;
use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::format::FourCC;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use super::camera::{CameraDevice, Frame};
use crate::error::{AppError, Result};

const YUYV: &[u8; 4] = b"YUYV";
const MJPG: &[u8; 4] = b"MJPG";

/// A read waits this long for the driver before giving up
const READ_TIMEOUT: Duration = Duration::from_secs(2);

pub struct V4l2Camera {
    stream: Option<MmapStream<'static>>,
    width: u32,
    height: u32,
    fourcc: FourCC,
}

impl std::fmt::Debug for V4l2Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4l2Camera")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fourcc", &self.fourcc.to_string())
            .field("stream_active", &self.stream.is_some())
            .finish()
    }
}

impl V4l2Camera {
    /// Open `path` and start streaming at (roughly) the requested size
    pub fn open(path: &str, width: u32, height: u32) -> Result<Self> {
        let access = |e: std::io::Error| {
            warn!(device = path, error = %e, "camera access failed");
            AppError::CameraAccess(e.to_string())
        };

        let device = Device::with_path(path).map_err(access)?;

        let mut fmt = device.format().map_err(access)?;
        fmt.width = width;
        fmt.height = height;
        fmt.fourcc = FourCC::new(YUYV);

        // The driver answers with what it actually supports
        let fmt = device.set_format(&fmt).map_err(access)?;
        if fmt.fourcc != FourCC::new(YUYV) && fmt.fourcc != FourCC::new(MJPG) {
            return Err(AppError::CameraAccess(format!(
                "unsupported pixel format {}",
                fmt.fourcc
            )));
        }

        let mut stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, 4).map_err(access)?;
        stream.set_timeout(READ_TIMEOUT);

        info!(
            device = path,
            width = fmt.width,
            height = fmt.height,
            fourcc = %fmt.fourcc,
            "camera streaming"
        );

        Ok(Self {
            stream: Some(stream),
            width: fmt.width,
            height: fmt.height,
            fourcc: fmt.fourcc,
        })
    }
}

impl CameraDevice for V4l2Camera {
    fn read_frame(&mut self) -> Result<Frame> {
        let stream = self.stream.as_mut().ok_or(AppError::CameraInactive)?;

        let (data, meta) = stream
            .next()
            .map_err(|e| AppError::Camera(format!("Failed to grab frame: {}", e)))?;

        let used = (meta.bytesused as usize).min(data.len());
        let data = if used > 0 { &data[..used] } else { data };

        let image = if self.fourcc == FourCC::new(MJPG) {
            image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                .map_err(|e| AppError::Camera(format!("Failed to decode MJPG frame: {}", e)))?
                .to_rgb8()
        } else {
            yuyv_to_rgb(data, self.width, self.height)
                .ok_or_else(|| AppError::Camera("Short YUYV frame".to_string()))?
        };

        Ok(Frame::new(image))
    }

    fn stop(&mut self) {
        // Dropping the stream turns streaming off and releases the buffers
        if self.stream.take().is_some() {
            info!("camera stream stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Convert packed YUYV 4:2:2 into RGB (BT.601, full range)
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
    let pixels = (width as usize) * (height as usize);
    if width % 2 != 0 || data.len() < pixels * 2 {
        return None;
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in data[..pixels * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }

    RgbImage::from_raw(width, height, rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;

    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}
