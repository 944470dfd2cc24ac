use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{PhotocardError, PhotocardResult};

pub use kurbo::{Affine, Point, Vec2};

/// Logical canvas dimensions in pixels.
///
/// Edit coordinates always live in this space; export multipliers resize the finished buffer and
/// never touch it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// The 1080×1080 square every card is edited on.
    pub const SQUARE_1080: Canvas = Canvas {
        width: 1080,
        height: 1080,
    };

    /// Create a validated canvas. Both sides must be non-zero and fit a u16 raster surface.
    pub fn new(width: u32, height: u32) -> PhotocardResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn validate(self) -> PhotocardResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PhotocardError::validation("canvas dimensions must be > 0"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(PhotocardError::validation(
                "canvas dimensions must be <= 65535",
            ));
        }
        Ok(())
    }

    pub fn center(self) -> Position {
        Position::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    /// Length of an RGBA8 buffer covering the canvas.
    pub fn byte_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::SQUARE_1080
    }
}

/// A point in canvas (model) space.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<Position> for Point {
    fn from(p: Position) -> Self {
        Point::new(p.x, p.y)
    }
}

/// Opaque RGB color, written as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Premultiplied RGBA8 with full alpha (identical to the straight value).
    pub fn to_opaque_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl Default for Rgb8 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Rgb8 {
    type Err = PhotocardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| PhotocardError::validation(format!("color '{s}' must start with '#'")))?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PhotocardError::validation(format!(
                "invalid hex color '{s}'"
            )));
        }

        let channel = |h: &str| {
            u8::from_str_radix(h, 16)
                .map_err(|_| PhotocardError::validation(format!("invalid hex color '{s}'")))
        };

        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |h: &str| channel(h).map(|v| v * 17);
                Ok(Self::new(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => Err(PhotocardError::validation(format!(
                "invalid hex color '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for Rgb8 {
    type Error = PhotocardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb8> for String {
    fn from(c: Rgb8) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_rejects_empty_and_oversized() {
        assert!(Canvas::new(0, 10).is_err());
        assert!(Canvas::new(10, 70_000).is_err());
        assert_eq!(Canvas::new(1080, 1080).unwrap(), Canvas::SQUARE_1080);
    }

    #[test]
    fn canvas_center_is_half_extent() {
        assert_eq!(Canvas::SQUARE_1080.center(), Position::new(540.0, 540.0));
        assert_eq!(Canvas::SQUARE_1080.byte_len(), 1080 * 1080 * 4);
    }

    #[test]
    fn rgb8_parses_long_and_short_hex() {
        assert_eq!("#ffffff".parse::<Rgb8>().unwrap(), Rgb8::WHITE);
        assert_eq!("#4169E1".parse::<Rgb8>().unwrap(), Rgb8::new(65, 105, 225));
        assert_eq!("#f0a".parse::<Rgb8>().unwrap(), Rgb8::new(255, 0, 170));
        assert!("ffffff".parse::<Rgb8>().is_err());
        assert!("#ggg".parse::<Rgb8>().is_err());
        assert!("#12345".parse::<Rgb8>().is_err());
    }

    #[test]
    fn rgb8_rejects_signed_digits() {
        assert!("#+f+f+f".parse::<Rgb8>().is_err());
        assert!("#+ff0000".parse::<Rgb8>().is_err());
        assert!("#-1f".parse::<Rgb8>().is_err());
    }

    #[test]
    fn rgb8_serializes_as_hex_string() {
        let json = serde_json::to_string(&Rgb8::new(1, 2, 255)).unwrap();
        assert_eq!(json, "\"#0102ff\"");
        let back: Rgb8 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb8::new(1, 2, 255));
        assert!(serde_json::from_str::<Rgb8>("\"red\"").is_err());
    }
}
