use crate::assets::{CustomAssetLoader, ModelHandle};
use crate::likes::LikeLedger;
use crate::presets::{Preset, PresetRegistry};
use crate::render::{FrameInputs, RenderArtifact, RenderEvent, RenderPhase, RenderPipeline, RenderSurface};
use crate::scene::guidance::GuidanceSnapshot;
use crate::scene::rig::AUTO_ROTATE_RADIANS_PER_SEC;
use crate::scene::serialization;
use crate::scene::{SceneConfiguration, SceneUpdate};
use crate::settings::LabSettings;
use crate::storage::KeyValueStore;
use crate::store::{EngineStatus, SceneStore, StoreEvent, SubscriptionId};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Session-level actions bound to keys in the desktop front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabCommand {
    RequestRender,
    ToggleAutoRotate,
    DownloadRender,
    ExportConfiguration,
    SavePreset,
    /// Applies the n-th listed preset, zero based.
    ApplyPreset(usize),
    ResetScene,
    ClearModel,
}

/// One Light Lab session: the store plus everything that reads or drives it.
///
/// Every failure is logged and turned into inline feedback; nothing here
/// returns an error to the caller.
pub struct LabSession<S: RenderSurface> {
    store: SceneStore,
    presets: PresetRegistry,
    likes: LikeLedger,
    pipeline: RenderPipeline,
    models: CustomAssetLoader,
    surface: S,
    output_dir: PathBuf,
    spin_radians: f32,
    feedback: Option<String>,
}

impl<S: RenderSurface> LabSession<S> {
    pub fn new(settings: &LabSettings, storage: Rc<dyn KeyValueStore>, surface: S) -> Self {
        Self {
            store: SceneStore::new(settings.debounce()),
            presets: PresetRegistry::load(storage.clone()),
            likes: LikeLedger::load(storage),
            pipeline: RenderPipeline::new(settings.render_delay(), settings.notification()),
            models: CustomAssetLoader::new(settings.cache_dir.clone()),
            surface,
            output_dir: settings.output_dir.clone(),
            spin_radians: 0.0,
            feedback: None,
        }
    }

    pub fn config(&self) -> &SceneConfiguration {
        self.store.config()
    }

    pub fn status(&self) -> EngineStatus {
        self.store.status()
    }

    pub fn status_label(&self) -> &'static str {
        self.store.status().label()
    }

    /// Recomputed from the current configuration on every call.
    pub fn guidance(&self) -> GuidanceSnapshot {
        GuidanceSnapshot::of(self.store.config())
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(StoreEvent, &SceneConfiguration) + 'static,
    {
        self.store.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    pub fn active_preset(&self) -> Option<&Preset> {
        self.presets.active(self.store.config())
    }

    pub fn likes(&self) -> &LikeLedger {
        &self.likes
    }

    pub fn model(&self) -> Option<&ModelHandle> {
        self.models.current()
    }

    pub fn render_phase(&self) -> RenderPhase {
        self.pipeline.phase()
    }

    pub fn artifact(&self) -> Option<&RenderArtifact> {
        self.pipeline.artifact()
    }

    pub fn success_visible(&self) -> bool {
        self.pipeline.success_visible()
    }

    pub fn spin_radians(&self) -> f32 {
        self.spin_radians
    }

    /// Latest inline message, if any.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    fn report(&mut self, message: String) {
        log::warn!("{}", message);
        self.feedback = Some(message);
    }

    /// Merges a partial update. Out-of-range values leave the scene as it was.
    pub fn update(&mut self, update: &SceneUpdate, now: Instant) -> bool {
        match self.store.apply_update(update, now) {
            Ok(()) => true,
            Err(err) => {
                self.report(format!("Rejected update: {err}"));
                false
            }
        }
    }

    pub fn apply_preset(&mut self, id: &str, now: Instant) -> bool {
        match self.presets.apply(id, &mut self.store, now) {
            Ok(()) => true,
            Err(err) => {
                self.report(format!("Could not apply preset: {err}"));
                false
            }
        }
    }

    pub fn save_preset(&mut self, name: &str) -> Option<Preset> {
        match self.presets.save(name, self.store.config()) {
            Ok(preset) => {
                self.feedback = Some(format!("Saved preset '{}'", preset.name));
                Some(preset)
            }
            Err(err) => {
                self.report(format!("Could not save preset: {err}"));
                None
            }
        }
    }

    pub fn delete_preset(&mut self, id: &str) -> bool {
        match self.presets.delete(id) {
            Ok(()) => true,
            Err(err) => {
                self.report(format!("Could not delete preset: {err}"));
                false
            }
        }
    }

    pub fn toggle_like(&mut self, post_id: &str) -> Option<bool> {
        match self.likes.toggle(post_id) {
            Ok(liked) => Some(liked),
            Err(err) => {
                self.report(format!("Could not store like: {err}"));
                None
            }
        }
    }

    /// Default scene, no custom model, spin back at rest.
    pub fn reset_scene(&mut self) {
        self.store.reset_to_default();
        self.models.clear();
        self.spin_radians = 0.0;
        log::info!("Scene reset to defaults");
    }

    pub fn request_render(&mut self, now: Instant) -> bool {
        match self.pipeline.request_render(&mut self.store, now) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("Render request ignored: {}", err);
                false
            }
        }
    }

    pub fn load_model(&mut self, path: &Path) -> bool {
        match self.models.load_from_dropped_file(path) {
            Ok(handle) => {
                self.feedback = Some(format!("Loaded model '{}'", handle.source_name()));
                true
            }
            Err(err) => {
                self.report(format!("Model rejected: {err}"));
                false
            }
        }
    }

    pub fn clear_model(&mut self) -> bool {
        self.models.clear()
    }

    /// Writes the last render to the output directory. `None` when there is
    /// nothing to download or the write failed.
    pub fn download_render(&mut self) -> Option<PathBuf> {
        let dir = self.output_dir.clone();
        self.download_render_to(&dir)
    }

    pub fn download_render_to(&mut self, dir: &Path) -> Option<PathBuf> {
        match self.pipeline.download_artifact(dir) {
            Ok(path) => path,
            Err(err) => {
                self.report(format!("Download failed: {err}"));
                None
            }
        }
    }

    /// Exports configuration plus guidance. Available in any render state.
    pub fn export_configuration(&mut self) -> Option<PathBuf> {
        let dir = self.output_dir.clone();
        self.export_configuration_to(&dir)
    }

    pub fn export_configuration_to(&mut self, dir: &Path) -> Option<PathBuf> {
        match serialization::export_to_dir(self.store.config(), dir) {
            Ok(path) => {
                log::info!("Configuration exported to {}", path.display());
                Some(path)
            }
            Err(err) => {
                self.report(format!("Export failed: {err}"));
                None
            }
        }
    }

    /// Loads an exported document and applies its configuration as one
    /// update. A malformed or out-of-range document changes nothing.
    pub fn import_configuration(&mut self, path: &Path, now: Instant) -> bool {
        let config = match serialization::load_config_from_export(path) {
            Ok(config) => config,
            Err(err) => {
                self.report(format!("Import failed: {err}"));
                return false;
            }
        };
        if !self.update(&SceneUpdate::from(&config), now) {
            return false;
        }
        log::info!("Configuration imported from {}", path.display());
        true
    }

    pub fn handle_command(&mut self, command: LabCommand, now: Instant) {
        match command {
            LabCommand::RequestRender => {
                self.request_render(now);
            }
            LabCommand::ToggleAutoRotate => {
                let enabled = !self.store.config().auto_rotate_enabled;
                self.update(&SceneUpdate::auto_rotate(enabled), now);
            }
            LabCommand::DownloadRender => {
                if self.pipeline.artifact().is_none() {
                    log::debug!("Nothing rendered yet");
                    return;
                }
                self.download_render();
            }
            LabCommand::ExportConfiguration => {
                self.export_configuration();
            }
            LabCommand::SavePreset => {
                let name = format!("Preset {}", self.presets.user_presets().len() + 1);
                self.save_preset(&name);
            }
            LabCommand::ApplyPreset(index) => {
                let Some(id) = self.presets.list().nth(index).map(|preset| preset.id.clone()) else {
                    log::debug!("No preset at slot {}", index + 1);
                    return;
                };
                self.apply_preset(&id, now);
            }
            LabCommand::ResetScene => self.reset_scene(),
            LabCommand::ClearModel => {
                self.clear_model();
            }
        }
    }

    /// One pass of the frame loop: settles timers, advances auto-rotate,
    /// redraws the surface and completes a due capture.
    pub fn frame(&mut self, now: Instant, dt: Duration) -> Vec<RenderEvent> {
        self.store.tick(now);
        let mut events = self.pipeline.tick(now);

        if self.store.config().auto_rotate_enabled {
            self.spin_radians = (self.spin_radians + AUTO_ROTATE_RADIANS_PER_SEC * dt.as_secs_f32())
                % std::f32::consts::TAU;
        }

        let config = self.store.config().clone();
        let frame = FrameInputs {
            config: &config,
            model: self.models.current(),
            spin_radians: self.spin_radians,
        };
        self.surface.draw(&frame);
        if let Some(event) = self
            .pipeline
            .capture_with(&mut self.surface, &frame, &mut self.store, now)
        {
            if let RenderEvent::Failed(reason) = &event {
                self.feedback = Some(format!("Render failed: {reason}"));
            }
            events.push(event);
        }
        events
    }

    /// Earliest instant at which `frame` has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.store.next_deadline(), self.pipeline.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Cancels every timer and releases the custom model. Safe to call twice.
    pub fn shutdown(&mut self) {
        self.pipeline.shutdown(&mut self.store);
        self.store.shutdown();
        if self.models.clear() {
            log::debug!("Released custom model on shutdown");
        }
    }
}

impl<S: RenderSurface> Drop for LabSession<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SoftwareSurface;
    use crate::scene::LightSource;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    struct Fixture {
        _cache: tempfile::TempDir,
        output: tempfile::TempDir,
        session: LabSession<SoftwareSurface>,
    }

    fn fixture() -> Fixture {
        let cache = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let settings = LabSettings {
            cache_dir: cache.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            ..LabSettings::default()
        };
        let session = LabSession::new(&settings, Rc::new(MemoryStore::new()), SoftwareSurface::new(32));
        Fixture {
            _cache: cache,
            output,
            session,
        }
    }

    fn run(session: &mut LabSession<SoftwareSurface>, start: Instant, from: u64, to: u64) -> Vec<RenderEvent> {
        let mut events = Vec::new();
        for step in (from..=to).step_by(50) {
            events.extend(session.frame(start + ms(step), ms(50)));
        }
        events
    }

    #[test]
    fn rapid_updates_settle_once() {
        let mut fx = fixture();
        let start = Instant::now();
        let ready = Rc::new(RefCell::new(0));
        let counter = ready.clone();
        fx.session.subscribe(move |event, _| {
            if event == StoreEvent::StatusChanged(EngineStatus::Ready) {
                *counter.borrow_mut() += 1;
            }
        });

        for (i, kelvin) in [3000, 3100, 3200, 3300].into_iter().enumerate() {
            assert!(fx.session.update(&SceneUpdate::temperature(kelvin), start + ms(i as u64 * 100)));
        }
        assert_eq!(fx.session.status_label(), "SIMULATING...");
        run(&mut fx.session, start, 300, 550);
        assert_eq!(*ready.borrow(), 0);
        run(&mut fx.session, start, 600, 1000);
        assert_eq!(*ready.borrow(), 1);
        assert_eq!(fx.session.status_label(), "ENGINE_READY");
        assert_eq!(fx.session.config().temperature_kelvin, 3300);
    }

    #[test]
    fn warm_temperature_reads_as_candle() {
        let mut fx = fixture();
        fx.session.update(&SceneUpdate::temperature(3000), Instant::now());
        assert_eq!(fx.session.guidance().lighting.mood, "CANDLE WARM");
        fx.session.update(&SceneUpdate::temperature(7600), Instant::now());
        assert_eq!(fx.session.guidance().lighting.mood, "MOONLIT");
    }

    #[test]
    fn out_of_range_update_is_reported_and_ignored() {
        let mut fx = fixture();
        assert!(!fx.session.update(&SceneUpdate::intensity(5.0), Instant::now()));
        assert_eq!(fx.session.config(), &SceneConfiguration::default());
        assert!(fx.session.feedback().unwrap().contains("intensity"));
        assert_eq!(fx.session.status(), EngineStatus::Ready);
    }

    #[test]
    fn double_render_request_completes_once() {
        let mut fx = fixture();
        let start = Instant::now();
        assert!(fx.session.request_render(start));
        assert!(!fx.session.request_render(start));
        assert_eq!(fx.session.status_label(), "RENDERING...");

        let events = run(&mut fx.session, start, 0, 8000);
        let completed = events
            .iter()
            .filter(|e| matches!(e, RenderEvent::Completed { .. }))
            .count();
        let cleared = events
            .iter()
            .filter(|e| **e == RenderEvent::NotificationCleared)
            .count();
        assert_eq!(completed, 1);
        assert_eq!(cleared, 1);
        assert!(!fx.session.config().is_rendering);
        assert!(!fx.session.success_visible());

        let artifact = fx.session.artifact().unwrap();
        assert_eq!((artifact.image().width(), artifact.image().height()), (32, 18));
        let path = fx.session.download_render().unwrap();
        assert!(path.starts_with(fx.output.path()));
        assert!(path.exists());
    }

    #[test]
    fn updates_during_render_do_not_touch_status() {
        let mut fx = fixture();
        let start = Instant::now();
        fx.session.request_render(start);
        fx.session.update(&SceneUpdate::intensity(1.5), start + ms(100));
        assert_eq!(fx.session.status(), EngineStatus::Rendering);
        assert_eq!(fx.session.config().intensity, 1.5);
    }

    #[test]
    fn saved_preset_round_trips() {
        let mut fx = fixture();
        let now = Instant::now();
        let update = SceneUpdate {
            light_source: Some(LightSource::Ember),
            temperature_kelvin: Some(2400),
            resin_age: Some(0.8),
            ..SceneUpdate::default()
        };
        fx.session.update(&update, now);
        let saved = fx.session.save_preset("X").unwrap();
        let captured = fx.session.config().clone();

        fx.session.reset_scene();
        assert_ne!(fx.session.config(), &captured);
        assert!(fx.session.apply_preset(&saved.id, now));
        assert!(saved.config.matches(fx.session.config()));
        assert_eq!(fx.session.config().light_source, LightSource::Ember);
        assert_eq!(fx.session.active_preset().map(|p| p.id.as_str()), Some(saved.id.as_str()));
    }

    #[test]
    fn builtin_presets_cannot_be_deleted() {
        let mut fx = fixture();
        let before: Vec<String> = fx.session.presets().list().map(|p| p.id.clone()).collect();
        assert!(!fx.session.delete_preset("studio_neutral"));
        let after: Vec<String> = fx.session.presets().list().map(|p| p.id.clone()).collect();
        assert_eq!(before, after);
        assert!(fx.session.feedback().is_some());
    }

    #[test]
    fn unknown_preset_is_a_no_op() {
        let mut fx = fixture();
        assert!(!fx.session.apply_preset("nope", Instant::now()));
        assert_eq!(fx.session.config(), &SceneConfiguration::default());
    }

    #[test]
    fn model_drop_accepts_glb_and_rejects_png() {
        let mut fx = fixture();
        let source = tempfile::tempdir().unwrap();
        let glb = source.path().join("model.glb");
        let png = source.path().join("model.png");
        std::fs::write(&glb, b"glTF").unwrap();
        std::fs::write(&png, b"\x89PNG").unwrap();

        assert!(!fx.session.load_model(&png));
        assert!(fx.session.model().is_none());

        assert!(fx.session.load_model(&glb));
        let staged = fx.session.model().unwrap().path().to_path_buf();
        assert!(staged.exists());

        fx.session.frame(Instant::now(), ms(16));
        fx.session.reset_scene();
        assert!(fx.session.model().is_none());
        assert!(!staged.exists());
    }

    #[test]
    fn shutdown_releases_model() {
        let fx = fixture();
        let source = tempfile::tempdir().unwrap();
        let glb = source.path().join("model.glb");
        std::fs::write(&glb, b"glTF").unwrap();

        let Fixture {
            _cache,
            output: _output,
            mut session,
        } = fx;
        session.load_model(&glb);
        session.request_render(Instant::now());
        let staged = session.model().unwrap().path().to_path_buf();
        drop(session);
        assert!(!staged.exists());
    }

    #[test]
    fn commands_drive_the_session() {
        let mut fx = fixture();
        let start = Instant::now();

        fx.session.handle_command(LabCommand::ToggleAutoRotate, start);
        assert!(fx.session.config().auto_rotate_enabled);
        fx.session.frame(start + ms(1000), ms(1000));
        assert!((fx.session.spin_radians() - 0.2).abs() < 1e-5);

        fx.session.handle_command(LabCommand::ToggleAutoRotate, start);
        assert!(!fx.session.config().auto_rotate_enabled);

        fx.session.handle_command(LabCommand::ApplyPreset(2), start);
        assert_eq!(fx.session.active_preset().map(|p| p.id.as_str()), Some("cool_night"));

        fx.session.handle_command(LabCommand::SavePreset, start);
        assert_eq!(fx.session.presets().user_presets()[0].name, "Preset 1");

        fx.session.handle_command(LabCommand::RequestRender, start);
        assert_eq!(fx.session.render_phase(), RenderPhase::Processing);

        fx.session.handle_command(LabCommand::ExportConfiguration, start);
        let exported = std::fs::read_dir(fx.output.path()).unwrap().count();
        assert_eq!(exported, 1);

        fx.session.handle_command(LabCommand::ResetScene, start);
        assert_eq!(fx.session.spin_radians(), 0.0);
        assert!(fx.session.config().is_rendering);
    }

    #[test]
    fn exported_configuration_imports_back() {
        let mut fx = fixture();
        let now = Instant::now();
        let update = SceneUpdate {
            light_source: Some(LightSource::Moonlight),
            environment_rotation_degrees: Some(90),
            translucency: Some(0.9),
            auto_rotate_enabled: Some(true),
            ..SceneUpdate::default()
        };
        fx.session.update(&update, now);
        let exported = fx.session.config().clone();
        let path = fx.session.export_configuration().unwrap();

        fx.session.reset_scene();
        assert!(fx.session.import_configuration(&path, now));
        assert_eq!(fx.session.config(), &exported);
    }

    #[test]
    fn out_of_range_import_leaves_scene_alone() {
        let mut fx = fixture();
        let path = fx.output.path().join("tampered.json");
        let mut doc = serde_json::to_value(crate::scene::serialization::ExportDocument::new(
            &SceneConfiguration::default(),
        ))
        .unwrap();
        doc["config"]["temperatureKelvin"] = 50000.into();
        std::fs::write(&path, doc.to_string()).unwrap();

        assert!(!fx.session.import_configuration(&path, Instant::now()));
        assert_eq!(fx.session.config(), &SceneConfiguration::default());
        assert!(fx.session.feedback().unwrap().starts_with("Import failed"));
    }

    #[test]
    fn download_before_render_writes_nothing() {
        let mut fx = fixture();
        assert!(fx.session.download_render().is_none());
        assert_eq!(std::fs::read_dir(fx.output.path()).unwrap().count(), 0);
    }

    #[test]
    fn likes_toggle_through_session() {
        let mut fx = fixture();
        assert_eq!(fx.session.toggle_like("post-1"), Some(true));
        assert!(fx.session.likes().is_liked("post-1"));
        assert_eq!(fx.session.toggle_like("post-1"), Some(false));
    }

    #[test]
    fn next_deadline_tracks_pending_timers() {
        let mut fx = fixture();
        let start = Instant::now();
        assert_eq!(fx.session.next_deadline(), None);
        fx.session.update(&SceneUpdate::intensity(1.2), start);
        assert_eq!(fx.session.next_deadline(), Some(start + ms(300)));
        fx.session.request_render(start);
        assert_eq!(fx.session.next_deadline(), Some(start + ms(2000)));
    }
}
