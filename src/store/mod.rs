pub mod timer;

use crate::scene::{SceneConfiguration, SceneUpdate, ValidationError};
use std::time::{Duration, Instant};
use timer::Deadline;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Engine readout shown next to the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineStatus {
    Ready,
    Simulating,
    Rendering,
}

impl EngineStatus {
    pub fn label(self) -> &'static str {
        match self {
            EngineStatus::Ready => "ENGINE_READY",
            EngineStatus::Simulating => "SIMULATING...",
            EngineStatus::Rendering => "RENDERING...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    ConfigChanged,
    StatusChanged(EngineStatus),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(StoreEvent, &SceneConfiguration)>;

/// Single owner of the scene configuration.
///
/// Time is passed in explicitly: `apply_update` arms the debounce relative to
/// `now` and `tick` settles it, so the event loop (or a test) decides what
/// "now" means.
pub struct SceneStore {
    config: SceneConfiguration,
    status: EngineStatus,
    debounce: Deadline,
    debounce_window: Duration,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl SceneStore {
    /// A store holding the default scene, engine ready.
    pub fn new(debounce_window: Duration) -> Self {
        Self {
            config: SceneConfiguration::default(),
            status: EngineStatus::Ready,
            debounce: Deadline::default(),
            debounce_window,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn config(&self) -> &SceneConfiguration {
        &self.config
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_rendering(&self) -> bool {
        self.config.is_rendering
    }

    /// When the store next needs a `tick`, if ever.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.due()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(StoreEvent, &SceneConfiguration) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(event, &self.config);
        }
    }

    fn set_status(&mut self, status: EngineStatus) {
        if self.status != status {
            log::debug!("engine status {:?} -> {:?}", self.status, status);
            self.status = status;
            self.notify(StoreEvent::StatusChanged(status));
        }
    }

    /// Merges `update` into the configuration. Outside a render this marks
    /// the engine as simulating and restarts the debounce window; during a
    /// render the status is left alone.
    pub fn apply_update(&mut self, update: &SceneUpdate, now: Instant) -> Result<(), ValidationError> {
        self.config.apply(update)?;
        self.notify(StoreEvent::ConfigChanged);

        if !self.config.is_rendering {
            self.set_status(EngineStatus::Simulating);
            self.debounce.arm(now, self.debounce_window);
        }
        Ok(())
    }

    /// Settles the debounce once its window has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if self.debounce.fire(now) && self.status == EngineStatus::Simulating {
            self.set_status(EngineStatus::Ready);
        }
    }

    /// Restores the default scene and drops any pending debounce. An in-flight
    /// render keeps its flag so the pipeline can still complete it.
    pub fn reset_to_default(&mut self) {
        self.debounce.cancel();
        let rendering = self.config.is_rendering;
        self.config = SceneConfiguration {
            is_rendering: rendering,
            ..SceneConfiguration::default()
        };
        self.notify(StoreEvent::Reset);
        if !rendering {
            self.set_status(EngineStatus::Ready);
        }
    }

    /// Flips the store into RENDERING. Returns false if a render is already
    /// in flight.
    pub(crate) fn begin_render(&mut self) -> bool {
        if self.config.is_rendering {
            return false;
        }
        self.debounce.cancel();
        self.config.is_rendering = true;
        self.notify(StoreEvent::ConfigChanged);
        self.set_status(EngineStatus::Rendering);
        true
    }

    pub(crate) fn finish_render(&mut self) {
        if !self.config.is_rendering {
            return;
        }
        self.config.is_rendering = false;
        self.notify(StoreEvent::ConfigChanged);
        self.set_status(EngineStatus::Ready);
    }

    /// Cancels pending timers; called on session teardown.
    pub fn shutdown(&mut self) {
        if self.debounce.cancel() {
            log::debug!("cancelled pending debounce on shutdown");
        }
        self.subscribers.clear();
    }
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
