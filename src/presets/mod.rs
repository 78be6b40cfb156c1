use crate::scene::serialization::unix_millis;
use crate::scene::{
    AspectRatio, FigureScale, HexColor, LightSource, ResinType, SceneConfiguration, SceneUpdate,
    ValidationError,
};
use crate::storage::{self, KeyValueStore, StorageError};
use crate::store::SceneStore;
use std::rc::Rc;
use std::time::Instant;

pub const PRESETS_KEY: &str = "valo-lab-presets";
pub const USER_ID_PREFIX: &str = "custom_";

/// The part of a scene a preset captures: everything except the render flag,
/// the camera transform and auto-rotate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetConfig {
    pub light_source: LightSource,
    pub temperature_kelvin: u32,
    pub intensity: f32,
    pub environment_rotation_degrees: u16,
    pub focal_length: f32,
    pub aperture: f32,
    pub focus_distance: f32,
    pub grain_enabled: bool,
    pub skin_tone: HexColor,
    pub roughness: f32,
    pub resin_type: ResinType,
    pub resin_age: f32,
    pub translucency: f32,
    pub show_grid: bool,
    pub scale: FigureScale,
    pub aspect_ratio: AspectRatio,
}

impl PresetConfig {
    pub fn capture(config: &SceneConfiguration) -> Self {
        Self {
            light_source: config.light_source,
            temperature_kelvin: config.temperature_kelvin,
            intensity: config.intensity,
            environment_rotation_degrees: config.environment_rotation_degrees,
            focal_length: config.focal_length,
            aperture: config.aperture,
            focus_distance: config.focus_distance,
            grain_enabled: config.grain_enabled,
            skin_tone: config.skin_tone,
            roughness: config.roughness,
            resin_type: config.resin_type,
            resin_age: config.resin_age,
            translucency: config.translucency,
            show_grid: config.show_grid,
            scale: config.scale,
            aspect_ratio: config.aspect_ratio,
        }
    }

    pub fn to_update(&self) -> SceneUpdate {
        SceneUpdate {
            light_source: Some(self.light_source),
            temperature_kelvin: Some(self.temperature_kelvin),
            intensity: Some(self.intensity),
            environment_rotation_degrees: Some(i32::from(self.environment_rotation_degrees)),
            camera: None,
            focal_length: Some(self.focal_length),
            aperture: Some(self.aperture),
            focus_distance: Some(self.focus_distance),
            grain_enabled: Some(self.grain_enabled),
            auto_rotate_enabled: None,
            skin_tone: Some(self.skin_tone),
            roughness: Some(self.roughness),
            resin_type: Some(self.resin_type),
            resin_age: Some(self.resin_age),
            translucency: Some(self.translucency),
            show_grid: Some(self.show_grid),
            scale: Some(self.scale),
            aspect_ratio: Some(self.aspect_ratio),
        }
    }

    /// Whether applying this preset would leave `config` unchanged. Compares
    /// every captured field.
    pub fn matches(&self, config: &SceneConfiguration) -> bool {
        *self == Self::capture(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.environment_rotation_degrees >= 360 {
            return Err(ValidationError::OutOfRange {
                field: "environmentRotationDegrees",
                value: self.environment_rotation_degrees as f64,
                min: 0.0,
                max: 359.0,
            });
        }
        self.to_update().validate()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub config: PresetConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("preset name must not be empty")]
    EmptyName,
    #[error("no deletable preset with id '{id}'")]
    NotFound { id: String },
    #[error("preset values are out of range: {0}")]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, PresetError>;

#[allow(clippy::too_many_arguments)]
fn builtin(
    id: &str,
    name: &str,
    light_source: LightSource,
    temperature_kelvin: u32,
    intensity: f32,
    environment_rotation_degrees: u16,
    lens: [f32; 3],
    grain_enabled: bool,
    skin_tone: HexColor,
    material: (f32, ResinType, f32, f32),
    layout: (bool, FigureScale, AspectRatio),
) -> Preset {
    let [focal_length, aperture, focus_distance] = lens;
    let (roughness, resin_type, resin_age, translucency) = material;
    let (show_grid, scale, aspect_ratio) = layout;
    Preset {
        id: id.to_string(),
        name: name.to_string(),
        config: PresetConfig {
            light_source,
            temperature_kelvin,
            intensity,
            environment_rotation_degrees,
            focal_length,
            aperture,
            focus_distance,
            grain_enabled,
            skin_tone,
            roughness,
            resin_type,
            resin_age,
            translucency,
            show_grid,
            scale,
            aspect_ratio,
        },
    }
}

const PORCELAIN: HexColor = HexColor::new(0xf5, 0xe6, 0xd3);
const MOON_PALE: HexColor = HexColor::new(0xf0, 0xf4, 0xf5);

pub fn builtin_presets() -> Vec<Preset> {
    vec![
        builtin(
            "studio_neutral",
            "Neutral Studio",
            LightSource::Studio,
            5600,
            1.0,
            0,
            [0.5, 0.5, 0.5],
            true,
            PORCELAIN,
            (0.2, ResinType::Standard, 0.0, 0.4),
            (true, FigureScale::OneThird, AspectRatio::Cinema),
        ),
        builtin(
            "warm_sunset",
            "Golden Hour",
            LightSource::Daylight,
            3500,
            1.2,
            90,
            [0.3, 0.6, 0.5],
            true,
            PORCELAIN,
            (0.2, ResinType::Standard, 0.1, 0.5),
            (false, FigureScale::OneThird, AspectRatio::Cinema),
        ),
        builtin(
            "cool_night",
            "Moonlight Drama",
            LightSource::Moonlight,
            8000,
            0.8,
            180,
            [0.8, 0.2, 0.6],
            true,
            MOON_PALE,
            (0.1, ResinType::French, 0.0, 0.6),
            (false, FigureScale::OneThird, AspectRatio::Classic),
        ),
        builtin(
            "macro_detail",
            "Macro Detail",
            LightSource::Studio,
            5000,
            1.5,
            45,
            [0.9, 0.1, 0.2],
            false,
            PORCELAIN,
            (0.3, ResinType::Environmental, 0.0, 0.3),
            (true, FigureScale::OneQuarter, AspectRatio::Square),
        ),
        builtin(
            "vintage_mellow",
            "Vintage Mellow",
            LightSource::Ember,
            4000,
            0.9,
            20,
            [0.6, 0.4, 0.5],
            true,
            PORCELAIN,
            (0.35, ResinType::Vintage, 0.6, 0.2),
            (true, FigureScale::OneThird, AspectRatio::Classic),
        ),
    ]
}

/// Built-in presets followed by the user's saved ones.
pub struct PresetRegistry {
    builtins: Vec<Preset>,
    user: Vec<Preset>,
    storage: Rc<dyn KeyValueStore>,
}

impl PresetRegistry {
    /// Loads user presets from `storage`. Unreadable data, out-of-range
    /// entries and ids that collide with earlier ones are dropped.
    pub fn load(storage: Rc<dyn KeyValueStore>) -> Self {
        let builtins = builtin_presets();
        let stored: Vec<Preset> = storage::load_list_or_default(storage.as_ref(), PRESETS_KEY);

        let mut user: Vec<Preset> = Vec::with_capacity(stored.len());
        for preset in stored {
            if let Err(err) = preset.config.validate() {
                log::warn!("Skipping stored preset '{}': {}", preset.id, err);
                continue;
            }
            let taken = builtins.iter().chain(user.iter()).any(|p| p.id == preset.id);
            if taken {
                log::warn!("Skipping stored preset with duplicate id '{}'", preset.id);
                continue;
            }
            user.push(preset);
        }
        log::info!("Loaded {} user preset(s)", user.len());

        Self {
            builtins,
            user,
            storage,
        }
    }

    pub fn list(&self) -> impl Iterator<Item = &Preset> {
        self.builtins.iter().chain(self.user.iter())
    }

    pub fn user_presets(&self) -> &[Preset] {
        &self.user
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.list().find(|preset| preset.id == id)
    }

    /// First listed preset whose every captured field matches `config`.
    pub fn active(&self, config: &SceneConfiguration) -> Option<&Preset> {
        self.list().find(|preset| preset.config.matches(config))
    }

    /// Forwards the preset to the store as one update. Unknown ids report
    /// `NotFound` and leave the store untouched.
    pub fn apply(&self, id: &str, store: &mut SceneStore, now: Instant) -> Result<()> {
        let preset = self.get(id).ok_or_else(|| PresetError::NotFound { id: id.to_string() })?;
        store.apply_update(&preset.config.to_update(), now)?;
        log::info!("Applied preset '{}'", preset.name);
        Ok(())
    }

    pub fn save(&mut self, name: &str, config: &SceneConfiguration) -> Result<Preset> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }
        let preset = Preset {
            id: self.next_user_id(),
            name: name.to_string(),
            config: PresetConfig::capture(config),
        };

        self.user.push(preset.clone());
        if let Err(err) = self.persist() {
            self.user.pop();
            return Err(err);
        }
        log::info!("Saved preset '{}' as {}", preset.name, preset.id);
        Ok(preset)
    }

    /// Removes a user preset. Built-in and unknown ids report `NotFound`.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let index = self
            .user
            .iter()
            .position(|preset| preset.id == id)
            .ok_or_else(|| PresetError::NotFound { id: id.to_string() })?;

        let removed = self.user.remove(index);
        if let Err(err) = self.persist() {
            self.user.insert(index, removed);
            return Err(err);
        }
        log::info!("Deleted preset '{}'", removed.name);
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        storage::save_json(self.storage.as_ref(), PRESETS_KEY, &self.user)?;
        Ok(())
    }

    fn next_user_id(&self) -> String {
        let base = format!("{USER_ID_PREFIX}{}", unix_millis());
        if self.get(&base).is_none() {
            return base;
        }
        (1u32..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or(base)
    }
}
