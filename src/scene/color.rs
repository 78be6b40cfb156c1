//! Black-body approximation used to tint the lighting rig.

/// Inputs are clamped to this range before evaluation; the curve fit is not
/// meaningful outside it.
pub const KELVIN_FIT_RANGE: (f64, f64) = (1000.0, 40000.0);

/// A perceptual light color with channels in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LightColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl LightColor {
    /// Channels scaled to `[0, 1]`.
    pub fn to_unit(self) -> [f32; 3] {
        [
            (self.r / 255.0) as f32,
            (self.g / 255.0) as f32,
            (self.b / 255.0) as f32,
        ]
    }
}

fn clamp_channel(value: f64) -> f64 {
    value.clamp(0.0, 255.0)
}

pub fn kelvin_to_color(kelvin: f64) -> LightColor {
    let (min, max) = KELVIN_FIT_RANGE;
    let temp = kelvin.clamp(min, max) / 100.0;

    let (r, g, b) = if temp <= 66.0 {
        let g = 99.470_802_586_1 * temp.ln() - 161.119_568_166_1;
        let b = if temp <= 19.0 {
            0.0
        } else {
            138.517_731_223_1 * (temp - 10.0).ln() - 305.044_792_730_7
        };
        (255.0, g, b)
    } else {
        let r = 329.698_727_446 * (temp - 60.0).powf(-0.133_204_759_2);
        let g = 288.122_169_528_3 * (temp - 60.0).powf(-0.075_514_849_2);
        (r, g, 255.0)
    };

    LightColor {
        r: clamp_channel(r),
        g: clamp_channel(g),
        b: clamp_channel(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_channel_range(color: LightColor) -> bool {
        [color.r, color.g, color.b]
            .iter()
            .all(|c| (0.0..=255.0).contains(c))
    }

    #[test]
    fn channels_stay_in_range_across_configuration_domain() {
        for kelvin in (2000..=9000).step_by(50) {
            let color = kelvin_to_color(kelvin as f64);
            assert!(in_channel_range(color), "{kelvin}K -> {color:?}");
        }
    }

    #[test]
    fn warm_temperatures_saturate_red() {
        let color = kelvin_to_color(2000.0);
        assert_eq!(color.r, 255.0);
        assert!(color.b < color.g);
    }

    #[test]
    fn cool_temperatures_saturate_blue() {
        let color = kelvin_to_color(9000.0);
        assert_eq!(color.b, 255.0);
        assert!(color.r < 255.0);
    }

    #[test]
    fn very_low_temperatures_drop_blue() {
        assert_eq!(kelvin_to_color(1500.0).b, 0.0);
    }

    #[test]
    fn out_of_fit_inputs_are_clamped() {
        assert_eq!(kelvin_to_color(0.0), kelvin_to_color(1000.0));
        assert_eq!(kelvin_to_color(1.0e6), kelvin_to_color(40000.0));
    }

    #[test]
    fn deterministic_below_sixty_six_hundred() {
        let a = kelvin_to_color(5600.0);
        let b = kelvin_to_color(5600.0);
        assert_eq!(a, b);
        assert_eq!(a.r, 255.0);
    }
}
