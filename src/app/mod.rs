mod input;
mod timing;

use crate::render::{RenderEvent, SoftwareSurface};
use crate::session::{LabCommand, LabSession};
use crate::settings::LabSettings;
use crate::storage::{FileStore, KeyValueStore};
use input::{InputAction, InputState};
use timing::FrameTiming;

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "VALO Light Lab";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub struct App {
    window: Option<Arc<Window>>,
    session: LabSession<SoftwareSurface>,
    input: InputState,
    window_focused: bool,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(settings: &LabSettings) -> Self {
        let storage: Rc<dyn KeyValueStore> = Rc::new(FileStore::new(settings.data_dir.clone()));
        let surface = SoftwareSurface::new(settings.preview_width);
        Self {
            window: None,
            session: LabSession::new(settings, storage, surface),
            input: InputState::default(),
            window_focused: true,
            timing: FrameTiming::new(WINDOW_TITLE.to_string()),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = self.timing.update(self.window.as_deref(), now);
        for event in self.session.frame(now, dt) {
            match event {
                RenderEvent::Completed { digest } => {
                    log::debug!("Render {} ready; press D to download", &digest[..12]);
                }
                RenderEvent::Failed(reason) => log::warn!("Render failed: {}", reason),
                RenderEvent::CaptureDue | RenderEvent::NotificationCleared => {}
            }
        }
        let status = self.status_line();
        self.timing.set_status(self.window.as_deref(), status);
    }

    fn status_line(&self) -> String {
        if let Some(name) = self.input.preset_name() {
            return format!("Preset name: {name}_ (Enter to save, Esc to cancel)");
        }

        let guidance = self.session.guidance();
        let mut parts = vec![
            self.session.status_label().to_string(),
            self.session
                .active_preset()
                .map(|preset| preset.name.clone())
                .unwrap_or_else(|| "Custom".to_string()),
            format!(
                "{} / {} / {}",
                guidance.lighting.mood, guidance.material.finish, guidance.layout.framing
            ),
        ];
        if let Some(model) = self.session.model() {
            parts.push(model.source_name().to_string());
        }
        if self.session.success_visible() {
            parts.push("RENDER COMPLETE".to_string());
        } else if let Some(feedback) = self.session.feedback() {
            parts.push(feedback.to_string());
        }
        parts.join(" | ")
    }

    fn handle_input_action(&mut self, action: InputAction, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        match action {
            InputAction::None => {}
            InputAction::Command(command) => self.session.handle_command(command, now),
            InputAction::SavePreset(name) if name.is_empty() => {
                self.session.handle_command(LabCommand::SavePreset, now)
            }
            InputAction::SavePreset(name) => {
                self.session.save_preset(&name);
            }
            InputAction::PickModel => self.handle_pick_model_action(),
            InputAction::ImportConfiguration => self.handle_import_action(),
            InputAction::Quit => {
                self.session.shutdown();
                event_loop.exit();
            }
        }
    }

    fn handle_pick_model_action(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("glTF", &["gltf", "glb"])
            .pick_file()
        else {
            return;
        };
        self.load_model(&path);
    }

    fn handle_import_action(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Light Lab configuration", &["json"])
            .pick_file()
        else {
            return;
        };
        self.session.import_configuration(&path, Instant::now());
    }

    fn load_model(&mut self, path: &Path) {
        log::info!("Loading model: {}", path.display());
        self.session.load_model(path);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(1280u32, 720u32))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        self.update_target_frame_duration(&window);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.session.shutdown();
                event_loop.exit();
            }
            WindowEvent::Focused(focused) => {
                self.window_focused = focused;
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !self.window_focused {
                    return;
                }
                let pressed = event.state == ElementState::Pressed && !event.repeat;
                let action = self
                    .input
                    .handle_key(event.physical_key, pressed, event.text.as_deref());
                self.handle_input_action(action, event_loop);
            }
            WindowEvent::DroppedFile(path) => {
                self.load_model(&path);
            }
            WindowEvent::HoveredFile(path) => {
                log::debug!("File hovering: {}", path.display());
            }
            WindowEvent::Moved(_) | WindowEvent::Resized(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

/// Opens the Light Lab window and runs until it is closed.
pub fn run(settings: LabSettings) -> Result<(), AppError> {
    log::info!("VALO Light Lab");
    log::info!(
        "   R render, Space auto-rotate, D download, E export, S save preset, 1-9 presets, \
         Backspace reset, O open model, I import configuration, C clear model, Esc quit"
    );
    log::info!("   Data in {}, output to {}", settings.data_dir.display(), settings.output_dir.display());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(&settings);
    event_loop.run_app(&mut app)?;

    log::info!("Goodbye!");
    Ok(())
}
