pub mod color;
pub mod object;
pub mod profile;

pub use color::{hue_in_range, is_color_match, normalize_label, rgb_to_hsl, Hsl, Rgb};
pub use object::{detections_match, label_matches, Detection};
pub use profile::{profile_for, ColorProfile, COLOR_PROFILES};
