//! Camera preview and capture
//!
//! The app holds at most one camera at a time. Frames are pulled off the
//! UI thread by short-lived blocking tasks; the most recent frame backs
//! both the live preview and the capture button.
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use iced::widget::image::Handle;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::state::data::PendingImage;

/// Resolution asked from the device; the driver may pick another
pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

/// A decoded camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Frames with a zero dimension carry nothing to capture
    pub fn has_dimensions(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    /// RGBA handle for the preview widget
    fn to_handle(&self) -> Handle {
        let mut rgba = Vec::with_capacity(self.image.as_raw().len() / 3 * 4);
        for pixel in self.image.pixels() {
            rgba.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]);
        }
        Handle::from_rgba(self.width(), self.height(), rgba)
    }
}

/// Generic interface for camera devices
pub trait CameraDevice: Send + Debug {
    /// Block until the next frame is available
    fn read_frame(&mut self) -> Result<Frame>;
    /// Stop every active track of the device. Calling it twice is harmless.
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Shared handle to an open camera, cheap to clone into tasks.
///
/// Stopping never waits on the device lock: a grab blocked inside the
/// driver would otherwise freeze the UI thread. When a grab holds the
/// lock, the stop flag is raised and the grab stops the device itself
/// once its read returns.
#[derive(Clone)]
pub struct CameraHandle {
    device: Arc<Mutex<Box<dyn CameraDevice>>>,
    stopped: Arc<AtomicBool>,
}

impl CameraHandle {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    fn read_frame(&self) -> Result<Frame> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(AppError::CameraInactive);
        }
        let mut device = self
            .device
            .lock()
            .map_err(|_| AppError::Camera("camera lock poisoned".to_string()))?;
        if !device.is_active() {
            return Err(AppError::CameraInactive);
        }
        let frame = device.read_frame();

        // Closed while the read was blocked
        if self.stopped.load(Ordering::SeqCst) {
            device.stop();
            return Err(AppError::CameraInactive);
        }
        frame
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        match self.device.try_lock() {
            Ok(mut device) => device.stop(),
            // A grab panicked mid-frame; the device is still ours to stop
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().stop(),
            Err(TryLockError::WouldBlock) => {
                debug!("grab in flight, device stops when it returns");
            }
        }
    }
}

impl Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle").finish_non_exhaustive()
    }
}

/// Open the camera at `device_path` on a blocking thread
pub async fn open_camera(device_path: String) -> Result<CameraHandle> {
    tokio::task::spawn_blocking(move || open_device(&device_path))
        .await
        .map_err(|e| AppError::Camera(format!("Task join error: {}", e)))?
}

#[cfg(target_os = "linux")]
fn open_device(device_path: &str) -> Result<CameraHandle> {
    let camera = super::v4l2::V4l2Camera::open(device_path, IDEAL_WIDTH, IDEAL_HEIGHT)?;
    Ok(CameraHandle::new(Box::new(camera)))
}

#[cfg(not(target_os = "linux"))]
fn open_device(_device_path: &str) -> Result<CameraHandle> {
    Err(AppError::CameraUnsupported)
}

/// Grab one frame on a blocking thread
pub async fn grab_frame(handle: CameraHandle) -> Result<Frame> {
    tokio::task::spawn_blocking(move || handle.read_frame())
        .await
        .map_err(|e| AppError::Camera(format!("Task join error: {}", e)))?
}

/// Encode a frame as JPEG
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(frame.image.as_ref())
        .map_err(|e| AppError::CaptureFailed(e.to_string()))?;
    Ok(bytes)
}

/// Camera state owned by the app
#[derive(Debug, Default)]
pub struct CameraSession {
    device: Option<CameraHandle>,
    /// Bumped on every open/close so stale frames can be told apart
    generation: u64,
    latest: Option<Frame>,
    preview: Option<Handle>,
    grab_in_flight: bool,
}

impl CameraSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly opened camera.
    /// A camera that is already held is stopped first.
    pub fn attach(&mut self, handle: CameraHandle) -> u64 {
        if self.device.is_some() {
            info!("replacing open camera");
            self.close();
        }
        self.generation += 1;
        self.device = Some(handle);
        info!(generation = self.generation, "camera opened");
        self.generation
    }

    /// Stop all tracks and clear the preview. Returns false if nothing was open.
    pub fn close(&mut self) -> bool {
        let Some(handle) = self.device.take() else {
            return false;
        };
        handle.stop();
        self.generation += 1;
        self.latest = None;
        self.preview = None;
        self.grab_in_flight = false;
        info!("camera closed");
        true
    }

    pub fn is_active(&self) -> bool {
        self.device.is_some()
    }

    pub fn preview(&self) -> Option<&Handle> {
        self.preview.as_ref()
    }

    pub fn latest_frame(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    pub fn wants_frame(&self) -> bool {
        self.is_active() && !self.grab_in_flight
    }

    /// Reserve the next grab. None while a grab is running or no camera is open.
    pub fn begin_grab(&mut self) -> Option<(u64, CameraHandle)> {
        if !self.wants_frame() {
            return None;
        }
        let handle = self.device.clone()?;
        self.grab_in_flight = true;
        Some((self.generation, handle))
    }

    /// Store a grabbed frame. Frames from a closed or replaced camera are dropped.
    pub fn finish_grab(&mut self, generation: u64, frame: Result<Frame>) -> Result<()> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale frame");
            return Ok(());
        }
        self.grab_in_flight = false;

        let frame = frame?;
        if frame.has_dimensions() {
            self.preview = Some(frame.to_handle());
        }
        self.latest = Some(frame);
        Ok(())
    }

    /// Encode the latest frame as a JPEG ready for upload
    pub fn capture(&self, quality: u8, timestamp_millis: i64) -> Result<PendingImage> {
        if !self.is_active() {
            return Err(AppError::CameraInactive);
        }

        let frame = self
            .latest_frame()
            .filter(|frame| frame.has_dimensions())
            .ok_or_else(|| {
                warn!("capture requested before the stream has dimensions");
                AppError::FrameNotReady
            })?;

        let bytes = encode_jpeg(frame, quality)?;
        info!(width = frame.width(), height = frame.height(), size = bytes.len(), "frame captured");

        Ok(PendingImage {
            filename: format!("camera_{}.jpg", timestamp_millis),
            bytes,
            mime: "image/jpeg".to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    /// Scripted camera that counts how often its tracks are stopped
    #[derive(Debug)]
    pub(crate) struct MockCamera {
        frames: VecDeque<Frame>,
        stops: Arc<AtomicUsize>,
        active: bool,
        /// How long each read blocks, like a stalled driver
        delay: Duration,
    }

    impl MockCamera {
        pub(crate) fn new(frames: Vec<Frame>) -> (Self, Arc<AtomicUsize>) {
            let stops = Arc::new(AtomicUsize::new(0));
            let camera = Self {
                frames: frames.into(),
                stops: Arc::clone(&stops),
                active: true,
                delay: Duration::ZERO,
            };
            (camera, stops)
        }

        pub(crate) fn stalled(delay: Duration, frames: Vec<Frame>) -> (Self, Arc<AtomicUsize>) {
            let (mut camera, stops) = Self::new(frames);
            camera.delay = delay;
            (camera, stops)
        }
    }

    impl CameraDevice for MockCamera {
        fn read_frame(&mut self) -> Result<Frame> {
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            self.frames
                .pop_front()
                .ok_or_else(|| AppError::Camera("no more frames".to_string()))
        }

        fn stop(&mut self) {
            if self.active {
                self.active = false;
                self.stops.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    pub(crate) fn solid_frame(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::from_pixel(width, height, image::Rgb([40, 120, 200])))
    }

    fn open_session(frames: Vec<Frame>) -> (CameraSession, CameraHandle, Arc<AtomicUsize>) {
        let (camera, stops) = MockCamera::new(frames);
        let handle = CameraHandle::new(Box::new(camera));
        let mut session = CameraSession::new();
        session.attach(handle.clone());
        (session, handle, stops)
    }

    #[test]
    fn test_capture_without_camera() {
        let session = CameraSession::new();
        assert_eq!(session.capture(92, 0).unwrap_err(), AppError::CameraInactive);
    }

    #[test]
    fn test_capture_before_first_frame() {
        let (session, _, _) = open_session(vec![]);
        assert_eq!(session.capture(92, 0).unwrap_err(), AppError::FrameNotReady);
    }

    #[test]
    fn test_capture_with_zero_sized_frame() {
        let (mut session, _, _) = open_session(vec![]);
        let (generation, _) = session.begin_grab().unwrap();
        session.finish_grab(generation, Ok(solid_frame(0, 0))).unwrap();

        assert!(session.preview().is_none());
        assert_eq!(session.capture(92, 0).unwrap_err(), AppError::FrameNotReady);
    }

    #[tokio::test]
    async fn test_grab_then_capture_jpeg() {
        let (mut session, _, _) = open_session(vec![solid_frame(64, 48)]);

        let (generation, handle) = session.begin_grab().unwrap();
        assert!(session.begin_grab().is_none(), "only one grab in flight");
        let frame = grab_frame(handle).await;
        session.finish_grab(generation, frame).unwrap();
        assert!(session.preview().is_some());

        let captured = session.capture(92, 1_700_000_000_000).unwrap();
        assert_eq!(captured.filename, "camera_1700000000000.jpg");
        assert_eq!(captured.mime, "image/jpeg");
        assert_eq!(&captured.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&captured.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_close_stops_tracks_and_clears_preview() {
        let (mut session, _, stops) = open_session(vec![]);
        let (generation, _) = session.begin_grab().unwrap();
        session.finish_grab(generation, Ok(solid_frame(8, 8))).unwrap();
        assert!(session.preview().is_some());

        assert!(session.close());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!session.is_active());
        assert!(session.preview().is_none());
        assert!(session.latest_frame().is_none());

        assert!(!session.close());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reopen_stops_previous_camera() {
        let (mut session, _, first_stops) = open_session(vec![]);
        let (second, second_stops) = MockCamera::new(vec![]);
        session.attach(CameraHandle::new(Box::new(second)));

        assert_eq!(first_stops.load(Ordering::SeqCst), 1);
        assert_eq!(second_stops.load(Ordering::SeqCst), 0);
        assert!(session.is_active());
    }

    #[test]
    fn test_stale_frame_is_dropped() {
        let (mut session, _, _) = open_session(vec![]);
        let (generation, _) = session.begin_grab().unwrap();
        session.close();

        session.finish_grab(generation, Ok(solid_frame(8, 8))).unwrap();
        assert!(session.latest_frame().is_none());
        assert!(session.preview().is_none());
    }

    #[tokio::test]
    async fn test_grab_from_stopped_device_fails() {
        let (camera, _) = MockCamera::new(vec![solid_frame(4, 4)]);
        let handle = CameraHandle::new(Box::new(camera));
        handle.stop();
        assert_eq!(grab_frame(handle).await.unwrap_err(), AppError::CameraInactive);
    }

    #[tokio::test]
    async fn test_close_does_not_wait_for_stalled_grab() {
        let (camera, stops) = MockCamera::stalled(Duration::from_millis(800), vec![solid_frame(8, 8)]);
        let mut session = CameraSession::new();
        session.attach(CameraHandle::new(Box::new(camera)));

        let (generation, handle) = session.begin_grab().unwrap();
        let grab = tokio::spawn(grab_frame(handle));
        // Let the blocking read take the device lock
        tokio::time::sleep(Duration::from_millis(150)).await;

        let started = Instant::now();
        assert!(session.close());
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(!session.is_active());
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        // The grab releases the device once the read returns
        let frame = grab.await.unwrap();
        assert_eq!(frame.clone().unwrap_err(), AppError::CameraInactive);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        session.finish_grab(generation, frame).unwrap();
        assert!(session.latest_frame().is_none());
    }
}
