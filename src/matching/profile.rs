/// Acceptance window for a named color, in HSL degree/percentage units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorProfile {
    /// Circular hue range `[start, end]`; wraps past 360 when `start > end`.
    pub hue_range: (f64, f64),
    pub min_saturation: f64,
    pub min_lightness: f64,
    pub max_lightness: f64,
    /// Achromatic profiles match on lightness alone.
    pub achromatic: bool,
}

const fn chromatic(start: f64, end: f64, min_sat: f64, min_light: f64, max_light: f64) -> ColorProfile {
    ColorProfile {
        hue_range: (start, end),
        min_saturation: min_sat,
        min_lightness: min_light,
        max_lightness: max_light,
        achromatic: false,
    }
}

const fn achromatic(min_light: f64, max_light: f64) -> ColorProfile {
    ColorProfile {
        hue_range: (0.0, 359.0),
        min_saturation: 0.0,
        min_lightness: min_light,
        max_lightness: max_light,
        achromatic: true,
    }
}

/// Canonical threshold table. Saturation floors are the lenient set
/// (10-14%) so dim camera frames still register.
pub const COLOR_PROFILES: &[(&str, ColorProfile)] = &[
    ("red", chromatic(345.0, 15.0, 14.0, 20.0, 85.0)),
    ("orange", chromatic(16.0, 40.0, 12.0, 20.0, 88.0)),
    ("yellow", chromatic(41.0, 70.0, 10.0, 22.0, 95.0)),
    ("green", chromatic(71.0, 165.0, 12.0, 20.0, 90.0)),
    ("blue", chromatic(166.0, 255.0, 10.0, 18.0, 90.0)),
    ("purple", chromatic(256.0, 320.0, 12.0, 15.0, 85.0)),
    ("pink", chromatic(321.0, 344.0, 10.0, 30.0, 95.0)),
    ("brown", chromatic(16.0, 35.0, 10.0, 10.0, 45.0)),
    ("black", achromatic(0.0, 15.0)),
    ("white", achromatic(82.0, 100.0)),
    ("gray", achromatic(15.0, 82.0)),
];

/// Looks up a profile by already-normalized name.
pub fn profile_for(name: &str) -> Option<&'static ColorProfile> {
    COLOR_PROFILES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, profile)| profile)
}
