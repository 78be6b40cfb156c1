pub mod preview;

pub use preview::SoftwareSurface;

use crate::assets::ModelHandle;
use crate::scene::serialization::unix_millis;
use crate::scene::SceneConfiguration;
use crate::store::timer::Deadline;
use crate::store::SceneStore;
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_NOTIFICATION: Duration = Duration::from_millis(5000);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("a render is already in flight")]
    AlreadyRendering,
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error("failed to encode render: {0}")]
    Encode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the surface gets to draw each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub config: &'a SceneConfiguration,
    pub model: Option<&'a ModelHandle>,
    /// Accumulated auto-rotate spin around the vertical axis.
    pub spin_radians: f32,
}

/// The rendering surface the lab drives. It redraws from the latest
/// configuration every frame and hands back a still on request.
pub trait RenderSurface {
    fn draw(&mut self, frame: &FrameInputs<'_>);
    fn capture(&mut self, frame: &FrameInputs<'_>) -> Result<RgbaImage, RenderError>;
}

/// A completed render, ready for download.
#[derive(Debug, Clone)]
pub struct RenderArtifact {
    image: RgbaImage,
    digest: String,
    captured_at_millis: u128,
}

impl RenderArtifact {
    pub fn new(image: RgbaImage) -> Self {
        let digest = Sha256::digest(image.as_raw())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Self {
            image,
            digest,
            captured_at_millis: unix_millis(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// SHA-256 over the raw pixels.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn file_name(&self) -> String {
        format!("valo_lab_render_{}.png", self.captured_at_millis)
    }

    pub fn png_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        self.image.write_to(&mut bytes, image::ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.png_bytes()?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Processing,
    CaptureRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// The processing delay elapsed; the surface should capture now.
    CaptureDue,
    Completed { digest: String },
    Failed(String),
    NotificationCleared,
}

/// Simulated render job: a fixed processing delay, one capture from the
/// surface, then a success notice that clears itself.
pub struct RenderPipeline {
    phase: RenderPhase,
    capture_delay: Deadline,
    render_delay: Duration,
    notification: Deadline,
    notification_window: Duration,
    artifact: Option<RenderArtifact>,
}

impl RenderPipeline {
    pub fn new(render_delay: Duration, notification_window: Duration) -> Self {
        Self {
            phase: RenderPhase::Idle,
            capture_delay: Deadline::default(),
            render_delay,
            notification: Deadline::default(),
            notification_window,
            artifact: None,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn artifact(&self) -> Option<&RenderArtifact> {
        self.artifact.as_ref()
    }

    pub fn success_visible(&self) -> bool {
        self.notification.is_armed()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.capture_delay.due(), self.notification.due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Starts a render. Rejected while another one is in flight.
    pub fn request_render(&mut self, store: &mut SceneStore, now: Instant) -> Result<(), RenderError> {
        if self.phase != RenderPhase::Idle || !store.begin_render() {
            return Err(RenderError::AlreadyRendering);
        }
        self.artifact = None;
        self.notification.cancel();
        self.phase = RenderPhase::Processing;
        self.capture_delay.arm(now, self.render_delay);
        log::info!("Render requested; capturing in {:?}", self.render_delay);
        Ok(())
    }

    /// Advances timers. Yields `CaptureDue` once the processing delay is over
    /// (phase becomes `CaptureRequested`) and `NotificationCleared` when the
    /// success notice expires.
    pub fn tick(&mut self, now: Instant) -> Vec<RenderEvent> {
        let mut events = Vec::new();
        if self.phase == RenderPhase::Processing && self.capture_delay.fire(now) {
            self.phase = RenderPhase::CaptureRequested;
            events.push(RenderEvent::CaptureDue);
        }
        if self.notification.fire(now) {
            events.push(RenderEvent::NotificationCleared);
        }
        events
    }

    /// Asks `surface` for the still once a capture is due and completes the
    /// job either way.
    pub fn capture_with<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &FrameInputs<'_>,
        store: &mut SceneStore,
        now: Instant,
    ) -> Option<RenderEvent> {
        if self.phase != RenderPhase::CaptureRequested {
            return None;
        }
        match surface.capture(frame) {
            Ok(image) => self.on_capture_complete(image, store, now),
            Err(err) => Some(self.on_capture_failed(err, store)),
        }
    }

    /// Delivery of the captured frame. Ignored unless a capture was asked for.
    pub fn on_capture_complete(
        &mut self,
        image: RgbaImage,
        store: &mut SceneStore,
        now: Instant,
    ) -> Option<RenderEvent> {
        if self.phase != RenderPhase::CaptureRequested {
            log::debug!("Ignoring capture delivered outside a render");
            return None;
        }
        let artifact = RenderArtifact::new(image);
        let digest = artifact.digest().to_string();
        log::info!(
            "Render complete: {}x{} ({})",
            artifact.image().width(),
            artifact.image().height(),
            &digest[..12]
        );
        self.artifact = Some(artifact);
        self.phase = RenderPhase::Idle;
        store.finish_render();
        self.notification.arm(now, self.notification_window);
        Some(RenderEvent::Completed { digest })
    }

    fn on_capture_failed(&mut self, err: RenderError, store: &mut SceneStore) -> RenderEvent {
        log::warn!("Render failed: {}", err);
        self.phase = RenderPhase::Idle;
        store.finish_render();
        RenderEvent::Failed(err.to_string())
    }

    /// Writes the artifact into `dir`. `Ok(None)` when nothing has been
    /// rendered yet.
    pub fn download_artifact(&self, dir: &Path) -> Result<Option<PathBuf>, RenderError> {
        let Some(artifact) = &self.artifact else {
            return Ok(None);
        };
        let path = dir.join(artifact.file_name());
        artifact.save_png(&path)?;
        log::info!("Render saved to {}", path.display());
        Ok(Some(path))
    }

    /// Drops pending timers. An in-flight job is abandoned and the store's
    /// render flag cleared.
    pub fn shutdown(&mut self, store: &mut SceneStore) {
        self.capture_delay.cancel();
        self.notification.cancel();
        if self.phase != RenderPhase::Idle {
            self.phase = RenderPhase::Idle;
            store.finish_render();
        }
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_DELAY, DEFAULT_NOTIFICATION)
    }
}
