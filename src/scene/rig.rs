use super::color::kelvin_to_color;
use super::{AspectRatio, FigureScale, LightSource, ResinType, SceneConfiguration};
use glam::Vec3;

/// Spin applied per second while auto-rotate is on.
pub const AUTO_ROTATE_RADIANS_PER_SEC: f32 = 0.2;
pub const GRAIN_OPACITY: f32 = 0.15;

const MOONLIGHT_COLOR: [f32; 3] = [0xaa as f32 / 255.0, 0xcc as f32 / 255.0, 1.0];
const EMBER_COLOR: [f32; 3] = [1.0, 0xaa as f32 / 255.0, 0.0];
const STUDIO_FILL_COLOR: [f32; 3] = [0.0, 0.0, 1.0];
const AGED_RESIN_TINT: [f32; 3] = [0xf0 as f32 / 255.0, 0xe6 as f32 / 255.0, 0x8c as f32 / 255.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Spot { angle: f32, penumbra: f32 },
    Point { range: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigLight {
    pub kind: LightKind,
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
    pub casts_shadow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub lights: Vec<RigLight>,
}

impl LightRig {
    pub fn for_config(config: &SceneConfiguration) -> Self {
        let color = kelvin_to_color(config.temperature_kelvin as f64).to_unit();
        let scale = config.intensity;

        let lights = match config.light_source {
            LightSource::Daylight => vec![RigLight {
                kind: LightKind::Directional,
                position: Vec3::new(5.0, 5.0, 5.0),
                color,
                intensity: 1.5 * scale,
                casts_shadow: true,
            }],
            LightSource::Studio => vec![
                RigLight {
                    kind: LightKind::Spot {
                        angle: 0.15,
                        penumbra: 1.0,
                    },
                    position: Vec3::new(5.0, 5.0, 5.0),
                    color,
                    intensity: 2.0 * scale,
                    casts_shadow: true,
                },
                // Fill light ignores the global intensity.
                RigLight {
                    kind: LightKind::Point { range: 0.0 },
                    position: Vec3::new(-5.0, -5.0, -5.0),
                    color: STUDIO_FILL_COLOR,
                    intensity: 0.5,
                    casts_shadow: false,
                },
            ],
            LightSource::Moonlight => vec![RigLight {
                kind: LightKind::Directional,
                position: Vec3::new(-2.0, 5.0, -2.0),
                color: MOONLIGHT_COLOR,
                intensity: 0.8 * scale,
                casts_shadow: true,
            }],
            LightSource::Ember => vec![RigLight {
                kind: LightKind::Point { range: 10.0 },
                position: Vec3::new(2.0, 0.0, 2.0),
                color: EMBER_COLOR,
                intensity: 3.0 * scale,
                casts_shadow: false,
            }],
        };

        Self {
            ambient_color: color,
            ambient_intensity: 0.2 * scale,
            lights,
        }
    }
}

/// Physical material parameters for the resin preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResinOptics {
    pub base_color: [f32; 3],
    pub transmission: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub ior: f32,
    pub thickness: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub attenuation_color: [f32; 3],
    pub attenuation_distance: f32,
}

impl ResinOptics {
    pub fn for_config(config: &SceneConfiguration) -> Self {
        let (ior, clearcoat) = match config.resin_type {
            ResinType::French => (1.54, 1.0),
            ResinType::Vintage => (1.52, 0.3),
            ResinType::Standard | ResinType::Environmental => (1.5, 0.5),
        };
        let attenuation_color = if config.resin_age > 0.0 {
            AGED_RESIN_TINT
        } else {
            [1.0, 1.0, 1.0]
        };

        Self {
            base_color: config.skin_tone.to_unit(),
            transmission: config.translucency,
            roughness: config.roughness,
            metalness: 0.1,
            ior,
            thickness: 2.0,
            clearcoat,
            clearcoat_roughness: 0.1,
            attenuation_color,
            attenuation_distance: 1.0 - config.resin_age * 0.5,
        }
    }
}

/// Lens values as shown to the user, derived from the normalized sliders.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LensReadout {
    pub focal_length_mm: f32,
    pub f_stop: f32,
    pub bokeh_scale: f32,
    pub focus_distance: f32,
}

impl LensReadout {
    pub fn for_config(config: &SceneConfiguration) -> Self {
        Self {
            focal_length_mm: 20.0 + config.focal_length * 180.0,
            f_stop: 1.4 + (1.0 - config.aperture) * 14.0,
            bokeh_scale: config.aperture * 5.0,
            focus_distance: config.focus_distance,
        }
    }
}

pub fn grid_divisions(scale: FigureScale) -> u32 {
    match scale {
        FigureScale::OneThird => 20,
        FigureScale::OneQuarter => 30,
        FigureScale::OneSixth => 40,
    }
}

/// Share of the viewport height the framed preview occupies.
pub fn viewport_height_fraction(aspect: AspectRatio) -> f32 {
    match aspect {
        AspectRatio::Cinema => 1.0,
        AspectRatio::Classic => 0.9,
        AspectRatio::Square => 0.8,
    }
}

/// Everything the rendering surface needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceInputs {
    pub rig: LightRig,
    pub optics: ResinOptics,
    pub lens: LensReadout,
    pub environment_rotation_radians: f32,
    pub grid_divisions: Option<u32>,
    pub grain_opacity: f32,
    pub aspect_ratio: AspectRatio,
    pub viewport_height_fraction: f32,
    pub zoom: f32,
}

impl SurfaceInputs {
    pub fn for_config(config: &SceneConfiguration) -> Self {
        Self {
            rig: LightRig::for_config(config),
            optics: ResinOptics::for_config(config),
            lens: LensReadout::for_config(config),
            environment_rotation_radians: (config.environment_rotation_degrees as f32).to_radians(),
            grid_divisions: config.show_grid.then(|| grid_divisions(config.scale)),
            grain_opacity: if config.grain_enabled { GRAIN_OPACITY } else { 0.0 },
            aspect_ratio: config.aspect_ratio,
            viewport_height_fraction: viewport_height_fraction(config.aspect_ratio),
            zoom: config.camera.zoom,
        }
    }
}
