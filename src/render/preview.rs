//! CPU stand-in for the GPU preview: shades the procedural resin sphere from
//! the derived light rig and material optics.

use super::{FrameInputs, RenderError, RenderSurface};
use crate::scene::rig::{LensReadout, LightKind, RigLight, SurfaceInputs};
use glam::{Quat, Vec3};
use image::{Rgba, RgbaImage};

const BACKGROUND_TOP: Vec3 = Vec3::new(0.055, 0.055, 0.06);
const BACKGROUND_BOTTOM: Vec3 = Vec3::new(0.02, 0.02, 0.025);
const GRID_MAJOR: Vec3 = Vec3::new(0.2, 0.2, 0.2);
const GRID_LINE_WIDTH: f32 = 0.04;
const SPHERE_FILL: f32 = 0.36;
/// Facet count used to stand in for a custom model.
const PROXY_FACETS: f32 = 6.0;

pub struct SoftwareSurface {
    width: u32,
    frames_drawn: u64,
    last_inputs: Option<SurfaceInputs>,
}

impl SoftwareSurface {
    pub fn new(width: u32) -> Self {
        Self {
            width: width.max(16),
            frames_drawn: 0,
            last_inputs: None,
        }
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Inputs seen by the most recent `draw`.
    pub fn last_inputs(&self) -> Option<&SurfaceInputs> {
        self.last_inputs.as_ref()
    }

    pub fn frame_size(&self, inputs: &SurfaceInputs) -> (u32, u32) {
        let height = (self.width as f32 / inputs.aspect_ratio.ratio()).round() as u32;
        (self.width, height.max(1))
    }

    pub fn render(&self, frame: &FrameInputs<'_>) -> RgbaImage {
        let inputs = SurfaceInputs::for_config(frame.config);
        let (width, height) = self.frame_size(&inputs);
        let faceted = frame.model.is_some();
        let seed = (self.frames_drawn as u32).wrapping_mul(0x9e37_79b9);

        let env = Quat::from_rotation_y(inputs.environment_rotation_radians);
        let spin = Quat::from_rotation_y(frame.spin_radians);
        let band = inputs.viewport_height_fraction * height as f32;
        let band_top = (height as f32 - band) * 0.5;
        let radius = SPHERE_FILL * band * inputs.zoom;
        let center = (width as f32 * 0.5, height as f32 * 0.5);
        let grid_blur = grid_blur(&inputs.lens);

        RgbaImage::from_fn(width, height, |x, y| {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            if py < band_top || py > band_top + band {
                return Rgba([0, 0, 0, 255]);
            }
            let nx = (px - center.0) / radius;
            let ny = (center.1 - py) / radius;
            let r2 = nx * nx + ny * ny;

            let mut color = if r2 <= 1.0 {
                let mut normal = Vec3::new(nx, ny, (1.0 - r2).sqrt());
                if faceted {
                    normal = facet(spin.inverse() * normal, spin);
                }
                shade(&inputs, env, normal)
            } else {
                background(&inputs, grid_blur, px / width as f32, (py - band_top) / band)
            };

            if inputs.grain_opacity > 0.0 {
                let noise = hash(x, y, seed) - 0.5;
                color += Vec3::splat(noise * inputs.grain_opacity * 0.5);
            }
            let vignette = vignette(px / width as f32, py / height as f32);
            to_pixel(color * vignette)
        })
    }
}

fn shade(inputs: &SurfaceInputs, env: Quat, normal: Vec3) -> Vec3 {
    let optics = &inputs.optics;
    let view = Vec3::Z;
    let surface_point = normal;
    let base = Vec3::from(optics.base_color);
    let wrap = optics.transmission * 0.5;

    let mut diffuse = Vec3::from(inputs.rig.ambient_color) * inputs.rig.ambient_intensity;
    let mut specular = Vec3::ZERO;
    let shininess = 2.0 / (optics.roughness.powi(4) + 1e-3) - 2.0;
    let shininess = shininess.clamp(2.0, 512.0);

    for light in &inputs.rig.lights {
        let (direction, falloff) = light_direction(light, env, surface_point);
        let radiance = Vec3::from(light.color) * light.intensity * falloff;
        let n_dot_l = normal.dot(direction);
        // Wrap lighting lets translucent resin glow past the terminator.
        let lambert = ((n_dot_l + wrap) / (1.0 + wrap)).max(0.0);
        diffuse += radiance * lambert;

        if n_dot_l > 0.0 {
            let half = (direction + view).normalize();
            let spec = normal.dot(half).max(0.0).powf(shininess);
            specular += radiance * spec * (0.25 + optics.clearcoat * 0.5);
        }
    }

    let attenuation = Vec3::ONE.lerp(
        Vec3::from(optics.attenuation_color),
        (1.0 - optics.attenuation_distance) * 2.0,
    );
    let fresnel_f0 = ((optics.ior - 1.0) / (optics.ior + 1.0)).powi(2);
    let rim = (1.0 - normal.dot(view).max(0.0)).powi(5);
    let rim = Vec3::splat((fresnel_f0 + (1.0 - fresnel_f0) * rim) * optics.clearcoat * 0.2);

    tone_map(base * attenuation * diffuse + specular + rim)
}

/// Direction from the surface towards the light and its distance falloff.
fn light_direction(light: &RigLight, env: Quat, surface_point: Vec3) -> (Vec3, f32) {
    let position = env * light.position;
    match light.kind {
        LightKind::Directional | LightKind::Spot { .. } => (position.normalize_or_zero(), 1.0),
        LightKind::Point { range } => {
            let to_light = position - surface_point;
            let distance = to_light.length().max(1e-3);
            let falloff = if range > 0.0 {
                (1.0 - distance / range).clamp(0.0, 1.0).powi(2)
            } else {
                1.0 / (1.0 + distance * distance * 0.05)
            };
            (to_light / distance, falloff)
        }
    }
}

/// Quantizes a normal in model space so a custom model reads as a faceted
/// proxy that turns with auto-rotate.
fn facet(model_normal: Vec3, spin: Quat) -> Vec3 {
    let yaw = model_normal.x.atan2(model_normal.z);
    let step = std::f32::consts::TAU / PROXY_FACETS;
    let yaw = (yaw / step).round() * step;
    let pitch = model_normal.y.clamp(-1.0, 1.0).asin();
    let pitch = (pitch / (step * 0.5)).round() * (step * 0.5);
    let quantized = Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());
    spin * quantized
}

/// How far the floor grid sits outside the focal plane: 0 is sharp, and it
/// grows with bokeh as focus moves towards the subject.
fn grid_blur(lens: &LensReadout) -> f32 {
    lens.bokeh_scale * (1.0 - lens.focus_distance)
}

fn background(inputs: &SurfaceInputs, blur: f32, u: f32, v: f32) -> Vec3 {
    let mut color = BACKGROUND_TOP.lerp(BACKGROUND_BOTTOM, v);
    let ambient = Vec3::from(inputs.rig.ambient_color) * inputs.rig.ambient_intensity * 0.1;
    color += ambient;

    if let Some(divisions) = inputs.grid_divisions {
        // Floor plane occupies the lower 35% of the frame.
        let floor_start = 0.65;
        if v > floor_start {
            let depth = (v - floor_start) / (1.0 - floor_start);
            let perspective_u = (u - 0.5) / (0.3 + depth * 0.7);
            let cell = 1.0 / divisions as f32;
            let line_u = (perspective_u / cell).fract().abs();
            let line_v = (depth * divisions as f32 * 0.25).fract();
            let thickness = (GRID_LINE_WIDTH * (1.0 + blur)).min(0.25);
            if line_u < thickness || line_u > 1.0 - thickness || line_v < thickness {
                color = color.lerp(GRID_MAJOR, 0.35 * depth / (1.0 + blur));
            }
        }
    }
    color
}

fn vignette(u: f32, v: f32) -> f32 {
    let du = u - 0.5;
    let dv = v - 0.5;
    let distance = (du * du + dv * dv).sqrt();
    1.0 - ((distance - 0.1).max(0.0) * 0.5 * 1.2).min(0.5)
}

fn tone_map(color: Vec3) -> Vec3 {
    Vec3::ONE - (-color).exp()
}

fn hash(x: u32, y: u32, seed: u32) -> f32 {
    let mut h = x.wrapping_mul(0x85eb_ca6b) ^ y.wrapping_mul(0xc2b2_ae35) ^ seed;
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    (h & 0x00ff_ffff) as f32 / 0x0100_0000 as f32
}

fn to_pixel(color: Vec3) -> Rgba<u8> {
    let c = color.clamp(Vec3::ZERO, Vec3::ONE);
    // Approximate sRGB encode.
    let encode = |v: f32| (v.powf(1.0 / 2.2) * 255.0).round() as u8;
    Rgba([encode(c.x), encode(c.y), encode(c.z), 255])
}

impl RenderSurface for SoftwareSurface {
    fn draw(&mut self, frame: &FrameInputs<'_>) {
        self.frames_drawn += 1;
        self.last_inputs = Some(SurfaceInputs::for_config(frame.config));
    }

    fn capture(&mut self, frame: &FrameInputs<'_>) -> Result<RgbaImage, RenderError> {
        let image = self.render(frame);
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::Capture("empty frame".to_string()));
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AspectRatio, LightSource, SceneConfiguration};

    fn frame(config: &SceneConfiguration) -> FrameInputs<'_> {
        FrameInputs {
            config,
            model: None,
            spin_radians: 0.0,
        }
    }

    fn luminance(pixel: &Rgba<u8>) -> u32 {
        pixel.0[0] as u32 + pixel.0[1] as u32 + pixel.0[2] as u32
    }

    #[test]
    fn frame_size_follows_aspect_ratio() {
        let mut surface = SoftwareSurface::new(64);
        for (aspect, height) in [
            (AspectRatio::Cinema, 36),
            (AspectRatio::Classic, 48),
            (AspectRatio::Square, 64),
        ] {
            let config = SceneConfiguration {
                aspect_ratio: aspect,
                ..SceneConfiguration::default()
            };
            let image = surface.capture(&frame(&config)).unwrap();
            assert_eq!((image.width(), image.height()), (64, height));
        }
    }

    #[test]
    fn sphere_is_brighter_than_background() {
        let surface = SoftwareSurface::new(96);
        let config = SceneConfiguration {
            grain_enabled: false,
            show_grid: false,
            ..SceneConfiguration::default()
        };
        let image = surface.render(&frame(&config));
        let center = image.get_pixel(48, 27);
        let corner = image.get_pixel(2, 2);
        assert!(luminance(center) > luminance(corner));
    }

    #[test]
    fn intensity_brightens_the_subject() {
        let surface = SoftwareSurface::new(96);
        let dim = SceneConfiguration {
            intensity: 0.5,
            grain_enabled: false,
            light_source: LightSource::Daylight,
            ..SceneConfiguration::default()
        };
        let bright = SceneConfiguration {
            intensity: 2.0,
            ..dim.clone()
        };
        let a = surface.render(&frame(&dim));
        let b = surface.render(&frame(&bright));
        assert!(luminance(b.get_pixel(55, 20)) > luminance(a.get_pixel(55, 20)));
    }

    #[test]
    fn narrower_aspects_are_letterboxed() {
        let surface = SoftwareSurface::new(64);
        let square = SceneConfiguration {
            aspect_ratio: AspectRatio::Square,
            grain_enabled: false,
            ..SceneConfiguration::default()
        };
        let cinema = SceneConfiguration {
            aspect_ratio: AspectRatio::Cinema,
            ..square.clone()
        };
        let boxed = surface.render(&frame(&square));
        assert_eq!(boxed.get_pixel(32, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(boxed.get_pixel(32, 62), &Rgba([0, 0, 0, 255]));
        assert!(luminance(boxed.get_pixel(32, 32)) > 0);

        let full = surface.render(&frame(&cinema));
        assert!(luminance(full.get_pixel(32, 1)) > 0);
    }

    #[test]
    fn wide_aperture_softens_the_floor_grid() {
        let surface = SoftwareSurface::new(96);
        let sharp = SceneConfiguration {
            aperture: 0.0,
            grain_enabled: false,
            ..SceneConfiguration::default()
        };
        let soft = SceneConfiguration {
            aperture: 1.0,
            ..sharp.clone()
        };
        let a = surface.render(&frame(&sharp));
        let b = surface.render(&frame(&soft));
        assert_eq!(a.get_pixel(48, 27), b.get_pixel(48, 27));
        assert_ne!(a, b);

        let sharp_lens = SurfaceInputs::for_config(&sharp).lens;
        let soft_lens = SurfaceInputs::for_config(&soft).lens;
        assert_eq!(grid_blur(&sharp_lens), 0.0);
        assert!(grid_blur(&soft_lens) > 0.0);
    }

    #[test]
    fn rendering_is_deterministic_for_same_frame_count() {
        let surface = SoftwareSurface::new(48);
        let config = SceneConfiguration::default();
        assert_eq!(surface.render(&frame(&config)), surface.render(&frame(&config)));
    }

    #[test]
    fn draw_tracks_latest_configuration() {
        let mut surface = SoftwareSurface::new(32);
        let config = SceneConfiguration {
            light_source: LightSource::Ember,
            ..SceneConfiguration::default()
        };
        surface.draw(&frame(&config));
        surface.draw(&frame(&config));
        assert_eq!(surface.frames_drawn(), 2);
        let inputs = surface.last_inputs().unwrap();
        assert_eq!(inputs.rig.lights.len(), 1);
    }
}
