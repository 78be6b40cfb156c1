//! Human-readable shot guidance derived from the scene configuration.
//!
//! Every label is a pure function of a narrow slice of the configuration.
//! Buckets are contiguous; a value sitting exactly on a boundary falls into
//! the bucket on the "strict comparison failed" side (`3200K` is GOLDEN, an
//! aperture of exactly `0.7` is MODERATE DOF). Comparisons run in `f32`, the
//! precision the configuration stores.

use super::{AspectRatio, FigureScale, LightSource, ResinType, SceneConfiguration};

/// First label whose exclusive upper limit is above `value`, else `top`.
fn below(value: f32, limits: &[(f32, &'static str)], top: &'static str) -> &'static str {
    limits
        .iter()
        .find(|(limit, _)| value < *limit)
        .map(|(_, label)| *label)
        .unwrap_or(top)
}

/// First label whose exclusive lower floor is under `value`, else `bottom`.
/// `floors` are listed from highest to lowest.
fn above(value: f32, floors: &[(f32, &'static str)], bottom: &'static str) -> &'static str {
    floors
        .iter()
        .find(|(floor, _)| value > *floor)
        .map(|(_, label)| *label)
        .unwrap_or(bottom)
}

const MOOD: &[(f32, &str)] = &[
    (3200.0, "CANDLE WARM"),
    (4500.0, "GOLDEN"),
    (6000.0, "NEUTRAL DAY"),
    (7500.0, "COOL DAY"),
];
const INTENSITY_CLASS: &[(f32, &str)] = &[
    (0.8, "SOFT VOLUME"),
    (1.2, "BALANCED"),
    (1.6, "CONTRASTED"),
];
const HIGHLIGHT: &[(f32, &str)] = &[(0.9, "SOFT EDGE"), (1.3, "DEFINED FORM")];
const DEPTH_OF_FIELD: &[(f32, &str)] = &[(0.7, "SHALLOW DOF"), (0.4, "MODERATE DOF")];
const PERSPECTIVE: &[(f32, &str)] = &[(0.7, "TELE COMPRESSION"), (0.4, "STANDARD VIEW")];
const FRAMING: &[(f32, &str)] = &[(0.75, "DETAIL CROP"), (0.5, "PORTRAIT")];
const BOKEH: &[(f32, &str)] = &[(0.7, "BOKEH EMPHASIS"), (0.4, "SOFT BACKGROUND")];
const TRANSLUCENCY: &[(f32, &str)] = &[(0.7, "JELLY GLOW"), (0.4, "MILKY DEPTH")];
const FINISH: &[(f32, &str)] = &[(0.25, "WET POLISH"), (0.55, "SATIN SKIN")];
const AGE: &[(f32, &str)] = &[(0.7, "ARCHIVAL PATINA"), (0.35, "AGED RESIN")];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingInputs {
    pub light_source: LightSource,
    pub temperature_kelvin: u32,
    pub intensity: f32,
    pub aperture: f32,
    pub focal_length: f32,
    pub focus_distance: f32,
}

impl From<&SceneConfiguration> for LightingInputs {
    fn from(config: &SceneConfiguration) -> Self {
        Self {
            light_source: config.light_source,
            temperature_kelvin: config.temperature_kelvin,
            intensity: config.intensity,
            aperture: config.aperture,
            focal_length: config.focal_length,
            focus_distance: config.focus_distance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialInputs {
    pub translucency: f32,
    pub roughness: f32,
    pub resin_age: f32,
    pub resin_type: ResinType,
}

impl From<&SceneConfiguration> for MaterialInputs {
    fn from(config: &SceneConfiguration) -> Self {
        Self {
            translucency: config.translucency,
            roughness: config.roughness,
            resin_age: config.resin_age,
            resin_type: config.resin_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutInputs {
    pub scale: FigureScale,
    pub aspect_ratio: AspectRatio,
    pub show_grid: bool,
}

impl From<&SceneConfiguration> for LayoutInputs {
    fn from(config: &SceneConfiguration) -> Self {
        Self {
            scale: config.scale,
            aspect_ratio: config.aspect_ratio,
            show_grid: config.show_grid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingGuidance {
    pub source: &'static str,
    pub mood: &'static str,
    pub intensity: &'static str,
    pub use_case: &'static str,
    pub highlight: &'static str,
    pub dof: &'static str,
    pub perspective: &'static str,
    pub focus: &'static str,
    pub framing: &'static str,
    pub bokeh: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MaterialGuidance {
    pub translucency: &'static str,
    pub finish: &'static str,
    pub age: &'static str,
    pub base: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LayoutGuidance {
    pub scale: &'static str,
    pub framing: &'static str,
    pub composition: &'static str,
}

/// All guidance for one configuration. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GuidanceSnapshot {
    pub lighting: LightingGuidance,
    pub material: MaterialGuidance,
    pub layout: LayoutGuidance,
}

impl GuidanceSnapshot {
    pub fn of(config: &SceneConfiguration) -> Self {
        Self {
            lighting: build_lighting_guidance(&config.into()),
            material: build_material_guidance(&config.into()),
            layout: build_layout_guidance(&config.into()),
        }
    }
}

fn source_label(source: LightSource) -> &'static str {
    match source {
        LightSource::Daylight => "DAYLIGHT",
        LightSource::Studio => "STUDIO",
        LightSource::Moonlight => "MOONLIGHT",
        LightSource::Ember => "EMBER",
    }
}

pub fn build_lighting_guidance(inputs: &LightingInputs) -> LightingGuidance {
    let kelvin = inputs.temperature_kelvin as f32;
    let intensity = inputs.intensity;
    let aperture = inputs.aperture;
    let focal = inputs.focal_length;
    let focus = inputs.focus_distance;

    let use_case = if kelvin < 3500.0 {
        "WARM PORTRAIT"
    } else if kelvin > 7000.0 {
        "SCULPT STUDY"
    } else {
        "CATALOG NEUTRAL"
    };
    let focus_class = if focus < 0.35 {
        "SUBJECT EMPHASIS"
    } else if focus > 0.7 {
        "SCENE BALANCE"
    } else {
        "MID FOCUS"
    };

    LightingGuidance {
        source: source_label(inputs.light_source),
        mood: below(kelvin, MOOD, "MOONLIT"),
        intensity: below(intensity, INTENSITY_CLASS, "HIGH DRAMA"),
        use_case,
        highlight: below(intensity, HIGHLIGHT, "HARD RIM"),
        dof: above(aperture, DEPTH_OF_FIELD, "DEEP DOF"),
        perspective: above(focal, PERSPECTIVE, "WIDE CONTEXT"),
        focus: focus_class,
        framing: above(focal, FRAMING, "FULL BODY"),
        bokeh: above(aperture, BOKEH, "CRISP LAYERS"),
    }
}

pub fn build_material_guidance(inputs: &MaterialInputs) -> MaterialGuidance {
    let base = match inputs.resin_type {
        ResinType::Environmental => "ECO RESIN",
        ResinType::French => "FRENCH CAST",
        ResinType::Vintage => "VINTAGE BLEND",
        ResinType::Standard => "STANDARD BASE",
    };

    MaterialGuidance {
        translucency: above(inputs.translucency, TRANSLUCENCY, "OPAQUE CORE"),
        finish: below(inputs.roughness, FINISH, "MATTE SHELL"),
        age: above(inputs.resin_age, AGE, "FRESH CAST"),
        base,
    }
}

pub fn build_layout_guidance(inputs: &LayoutInputs) -> LayoutGuidance {
    let scale = match inputs.scale {
        FigureScale::OneSixth => "MINIATURE STUDY",
        FigureScale::OneQuarter => "BALANCED SCALE",
        FigureScale::OneThird => "DETAIL SCALE",
    };
    let framing = match inputs.aspect_ratio {
        AspectRatio::Cinema => "CINEMA WIDE",
        AspectRatio::Classic => "CLASSIC FRAME",
        AspectRatio::Square => "SQUARE STUDY",
    };
    let composition = if inputs.show_grid {
        "GRID LOCKED"
    } else {
        "FREE COMPOSE"
    };

    LayoutGuidance {
        scale,
        framing,
        composition,
    }
}
