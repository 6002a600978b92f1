//! RGBA colors and CSS color-string parsing.
//!
//! Colors are stored as straight (non-premultiplied) RGBA with every channel
//! in `0.0..=1.0`. Parsing accepts the CSS forms authors write in styles:
//! hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), `rgb()`/`rgba()`,
//! `hsl()`/`hsla()`, named colors, and `transparent`.

use std::fmt;
use std::str::FromStr;

use palette::{FromColor, Hsl, Srgb};

/// A straight-alpha RGBA color with `f32` channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from 8-bit sRGB channels and a `0..=1` alpha.
    pub fn from_srgb8(rgb: Srgb<u8>, alpha: f32) -> Self {
        let rgb: Srgb<f32> = rgb.into_format();
        Self::new(rgb.red, rgb.green, rgb.blue, alpha.clamp(0.0, 1.0))
    }

    /// Channels scaled to `0..=255`, alpha included.
    pub fn to_rgba8(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Channel-wise linear blend; `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, _] = self.to_rgba8();
        write!(f, "rgba({r},{g},{b},{})", self.a)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

/// The input string is not a color in any supported notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not parse color from {input:?}")]
pub struct ColorParseError {
    pub input: String,
}

/// Parse a CSS color string.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn parse_color(input: &str) -> Result<Color, ColorParseError> {
    let normalized = input.trim().to_ascii_lowercase();
    let invalid = || ColorParseError {
        input: input.to_string(),
    };

    if normalized == "transparent" {
        return Ok(Color::TRANSPARENT);
    }

    if let Some(hex) = normalized.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    if let Some((name, args)) = split_function(&normalized) {
        let parsed = match name {
            "rgb" | "rgba" => parse_rgb_args(&args),
            "hsl" | "hsla" => parse_hsl_args(&args),
            _ => None,
        };
        return parsed.ok_or_else(invalid);
    }

    palette::named::from_str(&normalized)
        .map(|rgb| Color::from_srgb8(rgb, 1.0))
        .ok_or_else(invalid)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let (rgb, alpha) = match hex.len() {
        3 | 6 => (hex, None),
        4 => (&hex[..3], Some(hex[3..].repeat(2))),
        8 => (&hex[..6], Some(hex[6..].to_string())),
        _ => return None,
    };

    let rgb = Srgb::<u8>::from_str(rgb).ok()?;
    let alpha = match alpha {
        Some(digits) => u8::from_str_radix(&digits, 16).ok()?,
        None => u8::MAX,
    };
    Some(Color::from_srgb8(rgb, f32::from(alpha) / 255.0))
}

/// Split `name(a, b, c)` into its name and argument list.
///
/// Arguments may be separated by commas, whitespace, or the CSS4 `/` that
/// precedes alpha.
fn split_function(s: &str) -> Option<(&str, Vec<&str>)> {
    let open = s.find('(')?;
    let inner = s[open + 1..].strip_suffix(')')?;
    let args = inner
        .split([',', '/', ' ', '\t'])
        .filter(|part| !part.is_empty())
        .collect();
    Some((s[..open].trim(), args))
}

/// A numeric CSS component, with whether it carried a `%` suffix.
fn parse_component(s: &str) -> Option<(f32, bool)> {
    match s.strip_suffix('%') {
        Some(number) => number.parse().ok().map(|v| (v, true)),
        None => s.parse().ok().map(|v| (v, false)),
    }
}

fn parse_alpha(s: Option<&&str>) -> Option<f32> {
    let Some(s) = s else {
        return Some(1.0);
    };
    let (value, percent) = parse_component(s)?;
    let value = if percent { value / 100.0 } else { value };
    Some(value.clamp(0.0, 1.0))
}

fn parse_rgb_args(args: &[&str]) -> Option<Color> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }

    let mut channels = [0.0_f32; 3];
    for (channel, arg) in channels.iter_mut().zip(args) {
        let (value, percent) = parse_component(arg)?;
        let value = if percent { value / 100.0 * 255.0 } else { value };
        *channel = value.round().clamp(0.0, 255.0) / 255.0;
    }

    let alpha = parse_alpha(args.get(3))?;
    Some(Color::new(channels[0], channels[1], channels[2], alpha))
}

fn parse_hsl_args(args: &[&str]) -> Option<Color> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }

    let hue: f32 = args[0].strip_suffix("deg").unwrap_or(args[0]).parse().ok()?;
    let (saturation, _) = parse_component(args[1])?;
    let (lightness, _) = parse_component(args[2])?;

    let hsl: Hsl = Hsl::new(
        hue,
        (saturation / 100.0).clamp(0.0, 1.0),
        (lightness / 100.0).clamp(0.0, 1.0),
    );
    let rgb = Srgb::from_color(hsl);

    let alpha = parse_alpha(args.get(3))?;
    Some(Color::new(rgb.red, rgb.green, rgb.blue, alpha))
}
