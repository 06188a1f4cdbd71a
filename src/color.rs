use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Colours shared by the PNG renderer and the viewer
// ---------------------------------------------------------------------------

/// 8-bit sRGB colour, independent of any UI toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Noise trace.
    pub const NOISE: Rgb = Rgb(128, 128, 128);
    /// Shading of rain segments.
    pub const RAIN: Rgb = Rgb(255, 0, 0);
    /// Shading of failure segments.
    pub const FAILURE: Rgb = Rgb(128, 128, 128);
    /// Low-pass trace with flagged samples removed.
    pub const FILTERED: Rgb = Rgb(0, 0, 0);
}

/// Opacity of rain / failure shading.
pub const SHADE_ALPHA: f32 = 0.25;

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            // start at blue so a single channel keeps the usual trace colour
            let hue = 215.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            Rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}
