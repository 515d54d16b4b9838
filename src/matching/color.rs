use serde::{Deserialize, Serialize};

use super::profile::profile_for;

/// Mean color of a sampled region; channels are 0..=255 but fractional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Degrees in `[0, 360)`.
    pub h: f64,
    /// Percent in `[0, 100]`.
    pub s: f64,
    /// Percent in `[0, 100]`.
    pub l: f64,
}

pub fn rgb_to_hsl(r: f64, g: f64, b: f64) -> Hsl {
    let nr = (r / 255.0).clamp(0.0, 1.0);
    let ng = (g / 255.0).clamp(0.0, 1.0);
    let nb = (b / 255.0).clamp(0.0, 1.0);

    let max = nr.max(ng).max(nb);
    let min = nr.min(ng).min(nb);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d == 0.0 {
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let s = d / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == nr {
        60.0 * (((ng - nb) / d) % 6.0)
    } else if max == ng {
        60.0 * ((nb - nr) / d + 2.0)
    } else {
        60.0 * ((nr - ng) / d + 4.0)
    };

    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    let mut h = h.rem_euclid(360.0);
    if h >= 360.0 {
        h = 0.0;
    }

    Hsl {
        h,
        s: (s * 100.0).clamp(0.0, 100.0),
        l: (l * 100.0).clamp(0.0, 100.0),
    }
}

/// Circular range test: `[345, 15]` covers 345..360 and 0..15.
pub fn hue_in_range(h: f64, start: f64, end: f64) -> bool {
    if start <= end {
        h >= start && h <= end
    } else {
        h >= start || h <= end
    }
}

/// Returns false for unknown color names instead of failing.
pub fn is_color_match(avg: Rgb, color_name: &str) -> bool {
    let name = normalize_label(color_name);
    let Some(profile) = profile_for(&name) else {
        return false;
    };

    let hsl = rgb_to_hsl(avg.r, avg.g, avg.b);
    let light_matches = hsl.l >= profile.min_lightness && hsl.l <= profile.max_lightness;

    if profile.achromatic {
        return light_matches;
    }

    let (start, end) = profile.hue_range;
    hue_in_range(hsl.h, start, end) && hsl.s >= profile.min_saturation && light_matches
}

/// Trim and lowercase a color name or class label before comparison.
pub fn normalize_label(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.5
    }

    #[test]
    fn primary_colors_convert() {
        let red = rgb_to_hsl(255.0, 0.0, 0.0);
        assert!(approx(red.h, 0.0) && approx(red.s, 100.0) && approx(red.l, 50.0));

        let green = rgb_to_hsl(0.0, 255.0, 0.0);
        assert!(approx(green.h, 120.0));

        let blue = rgb_to_hsl(0.0, 0.0, 255.0);
        assert!(approx(blue.h, 240.0));

        let magenta_ish = rgb_to_hsl(255.0, 0.0, 40.0);
        assert!(magenta_ish.h > 340.0 && magenta_ish.h < 360.0);
    }

    #[test]
    fn achromatic_input_has_zero_saturation() {
        for value in [0.0, 1.0, 77.0, 128.0, 254.0, 255.0] {
            let hsl = rgb_to_hsl(value, value, value);
            assert_eq!(hsl.s, 0.0);
            assert_eq!(hsl.h, 0.0);
        }
    }

    #[test]
    fn hsl_stays_in_bounds_across_the_cube() {
        let steps = [0.0, 1.0, 31.0, 64.0, 127.5, 128.0, 200.0, 254.0, 255.0];
        for r in steps {
            for g in steps {
                for b in steps {
                    let hsl = rgb_to_hsl(r, g, b);
                    assert!((0.0..360.0).contains(&hsl.h), "h={} for {r},{g},{b}", hsl.h);
                    assert!((0.0..=100.0).contains(&hsl.s));
                    assert!((0.0..=100.0).contains(&hsl.l));
                }
            }
        }
    }

    #[test]
    fn wrapping_hue_range() {
        assert!(hue_in_range(0.0, 345.0, 15.0));
        assert!(hue_in_range(350.0, 345.0, 15.0));
        assert!(hue_in_range(10.0, 345.0, 15.0));
        assert!(!hue_in_range(180.0, 345.0, 15.0));

        assert!(hue_in_range(100.0, 71.0, 165.0));
        assert!(!hue_in_range(170.0, 71.0, 165.0));
    }

    #[test]
    fn achromatic_names_ignore_hue_and_saturation() {
        // Saturated red at ~5% lightness.
        let dark_red = Rgb::new(26.0, 0.0, 0.0);
        assert!(is_color_match(dark_red, "black"));
        assert!(!is_color_match(dark_red, "red"));

        assert!(is_color_match(Rgb::new(250.0, 250.0, 250.0), "white"));
        assert!(is_color_match(Rgb::new(120.0, 120.0, 120.0), "gray"));
    }

    #[test]
    fn chromatic_match_needs_hue_saturation_and_lightness() {
        let red = Rgb::new(200.0, 30.0, 30.0);
        assert!(is_color_match(red, "red"));
        assert!(is_color_match(red, "  RED "));
        assert!(!is_color_match(red, "blue"));

        // Right hue, washed out.
        assert!(!is_color_match(Rgb::new(130.0, 125.0, 125.0), "red"));

        assert!(is_color_match(Rgb::new(30.0, 60.0, 200.0), "blue"));
        assert!(is_color_match(Rgb::new(40.0, 160.0, 60.0), "green"));
    }

    #[test]
    fn unknown_color_never_matches() {
        assert!(!is_color_match(Rgb::new(200.0, 30.0, 30.0), "chartreuse-ish"));
        assert!(!is_color_match(Rgb::new(0.0, 0.0, 0.0), ""));
    }
}
