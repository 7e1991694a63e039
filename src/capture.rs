//! Camera capture: device acquisition, readiness, frame snapshots.
//!
//! A [`CaptureDevice`] hands out a [`VideoStream`] when acquired. The
//! [`CaptureAdapter`] wraps a device and guarantees that at most one
//! [`CaptureSession`] holds it at a time. Sessions release the stream on
//! [`CaptureSession::close`] and again (idempotently) on drop, so every exit
//! path from the capture mode stops the underlying tracks.
//!
//! ## Session lifecycle
//!
//! ```text
//! closed ──open()──▶ opening ──first frame──▶ ready ──close()──▶ closed
//!                       └──────────────close()──────────────────▶ closed
//! ```
//!
//! Readiness is polled, not pushed: [`CaptureSession::is_ready`] pulls from
//! the stream until a non-empty frame arrives. The caller decides when to
//! poll, so ordering never depends on event timing.
//!
//! ## Devices
//!
//! | Device | Behaviour |
//! |---|---|
//! | [`TestPatternDevice`] | Synthetic colour bars at a fixed resolution, optional warm-up |
//! | [`StillImageDevice`] | Replays one image file as the camera feed |
//! | [`NoDevice`] | Always unavailable (no camera, or permission denied) |

use crate::imaging::Dimensions;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Camera '{device}' is unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("Camera '{0}' is already in use by another session")]
    Busy(String),
    #[error("Camera is not ready yet")]
    NotReady,
    #[error("Capture session is closed")]
    Closed,
}

impl CaptureError {
    pub fn unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

/// A captured camera frame: tightly packed RGB8 at the device's native size.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw pixel data in RGB format, row-major, no padding.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Bytes per pixel (always 3 for RGB).
    pub fn bytes_per_pixel(&self) -> usize {
        3
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// A frame with no pixels (a stream that has started but not delivered).
    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A live video stream handed out by a device.
pub trait VideoStream {
    /// Newest frame, or `None` if nothing new has been delivered yet.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Stop all underlying tracks. Called exactly once per stream.
    fn stop(&mut self);
}

/// A video input device.
pub trait CaptureDevice {
    /// Human-readable device name for messages and logs.
    fn name(&self) -> String;

    /// Request access to the device and start a stream.
    ///
    /// Fails with [`CaptureError::DeviceUnavailable`] when no device exists or
    /// access is denied.
    fn acquire(&mut self) -> Result<Box<dyn VideoStream>, CaptureError>;
}

impl<T: CaptureDevice + ?Sized> CaptureDevice for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn acquire(&mut self) -> Result<Box<dyn VideoStream>, CaptureError> {
        (**self).acquire()
    }
}

/// Lifecycle state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Ready,
}

/// Owns a device and hands out at most one session at a time.
pub struct CaptureAdapter<D> {
    device: D,
    open_sessions: Arc<AtomicUsize>,
}

impl<D: CaptureDevice> CaptureAdapter<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn device_name(&self) -> String {
        self.device.name()
    }

    /// Number of sessions currently holding the device (0 or 1).
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Acquire the device exclusively.
    ///
    /// Fails with [`CaptureError::Busy`] while another session is open; the
    /// caller must close it first.
    pub fn open(&mut self) -> Result<CaptureSession, CaptureError> {
        let name = self.device.name();
        if self.open_sessions() > 0 {
            return Err(CaptureError::Busy(name));
        }
        let stream = self.device.acquire()?;
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        log::info!("Camera '{}' acquired", name);
        Ok(CaptureSession {
            device: name,
            stream: Some(stream),
            state: SessionState::Opening,
            latest: None,
            open_sessions: Arc::clone(&self.open_sessions),
        })
    }
}

/// Exclusive handle on an acquired camera stream.
pub struct CaptureSession {
    device: String,
    stream: Option<Box<dyn VideoStream>>,
    state: SessionState,
    latest: Option<Frame>,
    open_sessions: Arc<AtomicUsize>,
}

impl CaptureSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        &self.device
    }

    /// Poll the stream; true once a decodable frame has been delivered.
    pub fn is_ready(&mut self) -> bool {
        if self.state == SessionState::Opening {
            self.pull_frame();
            if self.latest.is_some() {
                log::debug!("Camera '{}' ready", self.device);
                self.state = SessionState::Ready;
            }
        }
        self.state == SessionState::Ready
    }

    /// Snapshot the current frame at native resolution.
    ///
    /// Never returns a blank frame: before the first frame arrives this
    /// fails with [`CaptureError::NotReady`].
    pub fn capture_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.state == SessionState::Closed {
            return Err(CaptureError::Closed);
        }
        if !self.is_ready() {
            return Err(CaptureError::NotReady);
        }
        self.pull_frame();
        self.latest.clone().ok_or(CaptureError::NotReady)
    }

    /// Stop the stream and release the device. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
            log::info!("Camera '{}' released", self.device);
        }
        self.state = SessionState::Closed;
        self.latest = None;
    }

    fn pull_frame(&mut self) {
        if let Some(stream) = self.stream.as_mut()
            && let Some(frame) = stream.next_frame()
            && !frame.is_blank()
        {
            self.latest = Some(frame);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Devices
// =============================================================================

/// Synthetic camera producing vertical colour bars.
///
/// The first `warmup_frames` polls deliver nothing, like a real camera that
/// takes a moment before its first frame. `live_streams` counts streams that
/// were acquired and not yet stopped.
#[derive(Debug, Clone)]
pub struct TestPatternDevice {
    pub dimensions: Dimensions,
    pub warmup_frames: u32,
    live_streams: Arc<AtomicUsize>,
}

impl TestPatternDevice {
    pub fn new(dimensions: Dimensions, warmup_frames: u32) -> Self {
        Self {
            dimensions,
            warmup_frames,
            live_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Streams currently running (acquired and not stopped).
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    /// Render frame number `index` of the pattern.
    pub fn render(dimensions: Dimensions, index: u64) -> Frame {
        const BARS: [[u8; 3]; 7] = [
            [192, 192, 192],
            [192, 192, 0],
            [0, 192, 192],
            [0, 192, 0],
            [192, 0, 192],
            [192, 0, 0],
            [0, 0, 192],
        ];
        let Dimensions { width, height } = dimensions;
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let bar = (x as u64 * BARS.len() as u64 / width.max(1) as u64) as usize;
                let mut rgb = BARS[bar.min(BARS.len() - 1)];
                // Moving scanline so consecutive frames differ.
                if height > 0 && u64::from(y) == index % u64::from(height) {
                    rgb = [255, 255, 255];
                }
                data.extend_from_slice(&rgb);
            }
        }
        Frame::new(data, width, height)
    }
}

impl CaptureDevice for TestPatternDevice {
    fn name(&self) -> String {
        format!("test-pattern {}", self.dimensions)
    }

    fn acquire(&mut self) -> Result<Box<dyn VideoStream>, CaptureError> {
        if self.dimensions.is_empty() {
            return Err(CaptureError::unavailable(
                self.name(),
                "zero-sized capture resolution",
            ));
        }
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestPatternStream {
            dimensions: self.dimensions,
            warmup_remaining: self.warmup_frames,
            index: 0,
            live_streams: Arc::clone(&self.live_streams),
            stopped: false,
        }))
    }
}

struct TestPatternStream {
    dimensions: Dimensions,
    warmup_remaining: u32,
    index: u64,
    live_streams: Arc<AtomicUsize>,
    stopped: bool,
}

impl VideoStream for TestPatternStream {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return None;
        }
        let frame = TestPatternDevice::render(self.dimensions, self.index);
        self.index += 1;
        Some(frame)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Replays a single image file as the camera feed.
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    path: PathBuf,
}

impl StillImageDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureDevice for StillImageDevice {
    fn name(&self) -> String {
        format!("still {}", self.path.display())
    }

    fn acquire(&mut self) -> Result<Box<dyn VideoStream>, CaptureError> {
        let img = image::open(&self.path)
            .map_err(|e| CaptureError::unavailable(self.name(), e.to_string()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Box::new(StillImageStream {
            frame: Some(Frame::new(img.into_raw(), width, height)),
        }))
    }
}

struct StillImageStream {
    frame: Option<Frame>,
}

impl VideoStream for StillImageStream {
    fn next_frame(&mut self) -> Option<Frame> {
        self.frame.clone()
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}

/// A device that is never available.
#[derive(Debug, Clone)]
pub struct NoDevice {
    pub reason: String,
}

impl NoDevice {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CaptureDevice for NoDevice {
    fn name(&self) -> String {
        "none".to_string()
    }

    fn acquire(&mut self) -> Result<Box<dyn VideoStream>, CaptureError> {
        Err(CaptureError::unavailable(self.name(), self.reason.clone()))
    }
}
