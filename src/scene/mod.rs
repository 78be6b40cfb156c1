pub mod color;
pub mod guidance;
pub mod rig;
pub mod serialization;

use std::fmt;

/// Which lighting rig drives the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightSource {
    Daylight,
    Studio,
    Moonlight,
    Ember,
}

/// Resin formulation; selects the optical constants of the material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResinType {
    Standard,
    French,
    Environmental,
    Vintage,
}

/// Doll body scale shown by the layout grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FigureScale {
    #[serde(rename = "1/3")]
    OneThird,
    #[serde(rename = "1/4")]
    OneQuarter,
    #[serde(rename = "1/6")]
    OneSixth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Cinema,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Width over height.
    pub fn ratio(self) -> f32 {
        match self {
            AspectRatio::Cinema => 16.0 / 9.0,
            AspectRatio::Classic => 4.0 / 3.0,
            AspectRatio::Square => 1.0,
        }
    }
}

/// A `#rrggbb` color as typed into the skin tone picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor([u8; 3]);

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidColor(value.to_string());
        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    /// Channels in `[0, 1]`.
    pub fn to_unit(self) -> [f32; 3] {
        let [r, g, b] = self.0;
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl TryFrom<String> for HexColor {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ViewOffset {
    pub x: f32,
    pub y: f32,
}

/// Viewport transform reserved for the camera tools.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub zoom: f32,
    pub rotation_degrees: f32,
    pub position: ViewOffset,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            rotation_degrees: 0.0,
            position: ViewOffset::default(),
        }
    }
}

pub const TEMPERATURE_RANGE: (u32, u32) = (2000, 9000);
pub const INTENSITY_RANGE: (f32, f32) = (0.5, 2.0);
pub const UNIT_RANGE: (f32, f32) = (0.0, 1.0);

/// The full Light Lab scene; one instance per session, owned by the store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfiguration {
    pub light_source: LightSource,
    pub temperature_kelvin: u32,
    pub intensity: f32,
    pub environment_rotation_degrees: u16,
    pub camera: CameraState,
    pub focal_length: f32,
    pub aperture: f32,
    pub focus_distance: f32,
    pub grain_enabled: bool,
    pub auto_rotate_enabled: bool,
    pub skin_tone: HexColor,
    pub roughness: f32,
    pub resin_type: ResinType,
    pub resin_age: f32,
    pub translucency: f32,
    pub show_grid: bool,
    pub scale: FigureScale,
    pub aspect_ratio: AspectRatio,
    pub is_rendering: bool,
}

impl Default for SceneConfiguration {
    fn default() -> Self {
        Self {
            light_source: LightSource::Studio,
            temperature_kelvin: 5600,
            intensity: 1.0,
            environment_rotation_degrees: 0,
            camera: CameraState::default(),
            focal_length: 0.5,
            aperture: 0.5,
            focus_distance: 0.5,
            grain_enabled: true,
            auto_rotate_enabled: false,
            skin_tone: HexColor::new(0xf5, 0xe6, 0xd3),
            roughness: 0.2,
            resin_type: ResinType::Standard,
            resin_age: 0.0,
            translucency: 0.4,
            show_grid: true,
            scale: FigureScale::OneThird,
            aspect_ratio: AspectRatio::Cinema,
            is_rendering: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("invalid skin tone '{0}', expected #rrggbb")]
    InvalidColor(String),
}

fn check_range(field: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}

fn check_temperature(value: u32) -> Result<(), ValidationError> {
    let (min, max) = TEMPERATURE_RANGE;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: "temperatureKelvin",
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}

fn check_camera(camera: &CameraState) -> Result<(), ValidationError> {
    if !camera.zoom.is_finite() {
        return Err(ValidationError::NotFinite { field: "camera.zoom" });
    }
    if camera.zoom <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "camera.zoom",
            value: camera.zoom as f64,
            min: f32::EPSILON as f64,
            max: f32::MAX as f64,
        });
    }
    let finite = [
        ("camera.rotationDegrees", camera.rotation_degrees),
        ("camera.position.x", camera.position.x),
        ("camera.position.y", camera.position.y),
    ];
    for (field, value) in finite {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
    }
    Ok(())
}

/// Environment rotation is an angle: any integer wraps into `[0, 360)`.
pub fn wrap_rotation(degrees: i32) -> u16 {
    degrees.rem_euclid(360) as u16
}

impl SceneConfiguration {
    /// Checks every bounded field. Used for configurations that arrive from
    /// outside the store (stored presets, imported documents).
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_temperature(self.temperature_kelvin)?;
        check_range("intensity", self.intensity, INTENSITY_RANGE)?;
        if self.environment_rotation_degrees >= 360 {
            return Err(ValidationError::OutOfRange {
                field: "environmentRotationDegrees",
                value: self.environment_rotation_degrees as f64,
                min: 0.0,
                max: 359.0,
            });
        }
        check_camera(&self.camera)?;
        check_range("focalLength", self.focal_length, UNIT_RANGE)?;
        check_range("aperture", self.aperture, UNIT_RANGE)?;
        check_range("focusDistance", self.focus_distance, UNIT_RANGE)?;
        check_range("roughness", self.roughness, UNIT_RANGE)?;
        check_range("resinAge", self.resin_age, UNIT_RANGE)?;
        check_range("translucency", self.translucency, UNIT_RANGE)?;
        Ok(())
    }

    /// Shallow-merges `update`. The whole update is validated first, so a
    /// rejected update leaves the configuration untouched.
    pub fn apply(&mut self, update: &SceneUpdate) -> Result<(), ValidationError> {
        update.validate()?;

        if let Some(value) = update.light_source {
            self.light_source = value;
        }
        if let Some(value) = update.temperature_kelvin {
            self.temperature_kelvin = value;
        }
        if let Some(value) = update.intensity {
            self.intensity = value;
        }
        if let Some(value) = update.environment_rotation_degrees {
            self.environment_rotation_degrees = wrap_rotation(value);
        }
        if let Some(value) = update.camera {
            self.camera = value;
        }
        if let Some(value) = update.focal_length {
            self.focal_length = value;
        }
        if let Some(value) = update.aperture {
            self.aperture = value;
        }
        if let Some(value) = update.focus_distance {
            self.focus_distance = value;
        }
        if let Some(value) = update.grain_enabled {
            self.grain_enabled = value;
        }
        if let Some(value) = update.auto_rotate_enabled {
            self.auto_rotate_enabled = value;
        }
        if let Some(value) = update.skin_tone {
            self.skin_tone = value;
        }
        if let Some(value) = update.roughness {
            self.roughness = value;
        }
        if let Some(value) = update.resin_type {
            self.resin_type = value;
        }
        if let Some(value) = update.resin_age {
            self.resin_age = value;
        }
        if let Some(value) = update.translucency {
            self.translucency = value;
        }
        if let Some(value) = update.show_grid {
            self.show_grid = value;
        }
        if let Some(value) = update.scale {
            self.scale = value;
        }
        if let Some(value) = update.aspect_ratio {
            self.aspect_ratio = value;
        }
        Ok(())
    }
}

/// A partial configuration. `isRendering` is deliberately absent: only the
/// render pipeline flips it.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_source: Option<LightSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_kelvin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_rotation_degrees: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_rotate_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_tone: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resin_type: Option<ResinType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resin_age: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translucency: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_grid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<FigureScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
}

/// Every user-settable field of `config`, as one update.
impl From<&SceneConfiguration> for SceneUpdate {
    fn from(config: &SceneConfiguration) -> Self {
        Self {
            light_source: Some(config.light_source),
            temperature_kelvin: Some(config.temperature_kelvin),
            intensity: Some(config.intensity),
            environment_rotation_degrees: Some(config.environment_rotation_degrees as i32),
            camera: Some(config.camera),
            focal_length: Some(config.focal_length),
            aperture: Some(config.aperture),
            focus_distance: Some(config.focus_distance),
            grain_enabled: Some(config.grain_enabled),
            auto_rotate_enabled: Some(config.auto_rotate_enabled),
            skin_tone: Some(config.skin_tone),
            roughness: Some(config.roughness),
            resin_type: Some(config.resin_type),
            resin_age: Some(config.resin_age),
            translucency: Some(config.translucency),
            show_grid: Some(config.show_grid),
            scale: Some(config.scale),
            aspect_ratio: Some(config.aspect_ratio),
        }
    }
}

impl SceneUpdate {
    pub fn temperature(kelvin: u32) -> Self {
        Self {
            temperature_kelvin: Some(kelvin),
            ..Self::default()
        }
    }

    pub fn intensity(value: f32) -> Self {
        Self {
            intensity: Some(value),
            ..Self::default()
        }
    }

    pub fn auto_rotate(enabled: bool) -> Self {
        Self {
            auto_rotate_enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(value) = self.temperature_kelvin {
            check_temperature(value)?;
        }
        if let Some(value) = self.intensity {
            check_range("intensity", value, INTENSITY_RANGE)?;
        }
        if let Some(camera) = &self.camera {
            check_camera(camera)?;
        }
        let unit_fields = [
            ("focalLength", self.focal_length),
            ("aperture", self.aperture),
            ("focusDistance", self.focus_distance),
            ("roughness", self.roughness),
            ("resinAge", self.resin_age),
            ("translucency", self.translucency),
        ];
        for (field, value) in unit_fields {
            if let Some(value) = value {
                check_range(field, value, UNIT_RANGE)?;
            }
        }
        Ok(())
    }
}
