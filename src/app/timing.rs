use std::time::{Duration, Instant};
use winit::window::Window;

/// Frame cadence plus the window title, which doubles as the status readout.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    fps: f32,
    base_title: String,
    status: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            fps: 0.0,
            base_title,
            status: String::new(),
        }
    }

    pub fn title(&self) -> String {
        if self.status.is_empty() {
            format!("{} - {:.0} fps", self.base_title, self.fps)
        } else {
            format!("{} - {} - {:.0} fps", self.base_title, self.status, self.fps)
        }
    }

    /// Updates the status part of the title; the window is only touched when
    /// the text actually changes.
    pub fn set_status(&mut self, window: Option<&Window>, status: String) {
        if status == self.status {
            return;
        }
        self.status = status;
        if let Some(window) = window {
            window.set_title(&self.title());
        }
    }

    /// Returns the time since the previous frame.
    pub fn update(&mut self, window: Option<&Window>, now: Instant) -> Duration {
        let dt_duration = if let Some(last) = self.last_frame_time {
            now.saturating_duration_since(last)
        } else {
            Duration::from_millis(16)
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt_duration.as_secs_f32().max(0.0);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if let Some(window) = window {
                window.set_title(&self.title());
            }
            self.frame_count = 0;
            self.last_fps_time = now;
        }
        dt_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_assumes_sixty_hertz() {
        let mut timing = FrameTiming::new("Light Lab".to_string());
        let start = Instant::now();
        assert_eq!(timing.update(None, start), Duration::from_millis(16));
        assert_eq!(
            timing.update(None, start + Duration::from_millis(40)),
            Duration::from_millis(40)
        );
        assert!((timing.frame_dt - 0.04).abs() < 1e-6);
    }

    #[test]
    fn title_carries_status() {
        let mut timing = FrameTiming::new("Light Lab".to_string());
        assert_eq!(timing.title(), "Light Lab - 0 fps");
        timing.set_status(None, "ENGINE_READY".to_string());
        assert_eq!(timing.title(), "Light Lab - ENGINE_READY - 0 fps");
    }
}
