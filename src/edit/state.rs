use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{Canvas, Position, Rgb8};
use crate::foundation::error::{PhotocardError, PhotocardResult};
use crate::geometry::normalize_degrees;

/// Upper bound of the filter sliders. The lower bound is 0.
pub const FILTER_MAX_PERCENT: f32 = 200.0;

/// Percent-parameterized color filters applied to the user photo.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// 100 = unchanged.
    pub brightness: f32,
    /// 100 = unchanged.
    pub contrast: f32,
    /// 0 = unchanged.
    pub grayscale: f32,
    /// 0 = unchanged.
    pub sepia: f32,
}

impl FilterSettings {
    pub const NEUTRAL: FilterSettings = FilterSettings {
        brightness: 100.0,
        contrast: 100.0,
        grayscale: 0.0,
        sepia: 0.0,
    };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// Clamp every value into the slider domain `[0, 200]`. Non-finite values fall back to neutral.
    pub fn clamped(self) -> Self {
        fn clamp(v: f32, neutral: f32) -> f32 {
            if v.is_finite() {
                v.clamp(0.0, FILTER_MAX_PERCENT)
            } else {
                neutral
            }
        }
        Self {
            brightness: clamp(self.brightness, 100.0),
            contrast: clamp(self.contrast, 100.0),
            grayscale: clamp(self.grayscale, 0.0),
            sepia: clamp(self.sepia, 0.0),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Pixel compositing operator used when drawing the user photo over the background.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    #[serde(alias = "source-over")]
    Normal,
    Multiply,
    Overlay,
    Screen,
}

impl BlendMode {
    pub const ALL: [BlendMode; 4] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Overlay,
        BlendMode::Screen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Overlay => "overlay",
            BlendMode::Screen => "screen",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendMode {
    type Err = PhotocardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "source-over" => Ok(BlendMode::Normal),
            "multiply" => Ok(BlendMode::Multiply),
            "overlay" => Ok(BlendMode::Overlay),
            "screen" => Ok(BlendMode::Screen),
            other => Err(PhotocardError::validation(format!(
                "unknown blend mode '{other}'"
            ))),
        }
    }
}

/// Everything the user can adjust, captured as one value. This is the unit of undo/redo.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditState {
    /// Center of the user photo in model space.
    pub position: Position,
    /// Clockwise rotation in `[0, 360)`.
    pub rotation_deg: f64,
    pub scale: f64,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub background: Rgb8,
    #[serde(default)]
    pub blend: BlendMode,
}

impl EditState {
    /// Pristine state: photo centered, unrotated, unscaled, unfiltered, on white.
    pub fn centered(canvas: Canvas) -> Self {
        Self {
            position: canvas.center(),
            rotation_deg: 0.0,
            scale: 1.0,
            filters: FilterSettings::NEUTRAL,
            background: Rgb8::WHITE,
            blend: BlendMode::Normal,
        }
    }

    /// Bring an externally supplied state into the ranges the controls maintain.
    pub fn normalized(self, min_scale: f64, max_scale: f64) -> PhotocardResult<Self> {
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return Err(PhotocardError::validation("position must be finite"));
        }
        if !self.rotation_deg.is_finite() {
            return Err(PhotocardError::validation("rotation must be finite"));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PhotocardError::validation("scale must be finite and > 0"));
        }
        Ok(Self {
            rotation_deg: normalize_degrees(self.rotation_deg),
            scale: self.scale.clamp(min_scale, max_scale),
            filters: self.filters.clamped(),
            ..self
        })
    }
}

impl Default for EditState {
    fn default() -> Self {
        Self::centered(Canvas::default())
    }
}
