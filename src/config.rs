use std::io::Read;

use crate::foundation::core::Canvas;
use crate::foundation::error::{PhotocardError, PhotocardResult};

/// 10 MiB, the upload cap for both photos and templates.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Tunables for one editing session.
///
/// Every field has a default, so a JSON config only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub canvas: Canvas,
    /// Distance from the canvas center under which a dragged axis snaps to it.
    pub snap_threshold_px: f64,
    pub nudge_step_px: f64,
    pub rotate_step_deg: f64,
    pub zoom_step: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub max_upload_bytes: usize,
    /// JPEG quality (1..=100) used when re-encoding an export.
    pub jpeg_quality: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::SQUARE_1080,
            snap_threshold_px: 20.0,
            nudge_step_px: 5.0,
            rotate_step_deg: 90.0,
            zoom_step: 0.1,
            min_scale: 0.1,
            max_scale: 3.0,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            jpeg_quality: 92,
        }
    }
}

impl EditorConfig {
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn from_json_str(s: &str) -> PhotocardResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_reader(r: impl Read) -> PhotocardResult<Self> {
        let cfg: Self = serde_json::from_reader(r)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> PhotocardResult<()> {
        self.canvas.validate()?;

        let positive = [
            ("snap_threshold_px", self.snap_threshold_px),
            ("nudge_step_px", self.nudge_step_px),
            ("rotate_step_deg", self.rotate_step_deg),
            ("zoom_step", self.zoom_step),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(PhotocardError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        if self.min_scale > self.max_scale {
            return Err(PhotocardError::validation(
                "min_scale must be <= max_scale",
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(PhotocardError::validation("max_upload_bytes must be > 0"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PhotocardError::validation(
                "jpeg_quality must be within 1..=100",
            ));
        }
        Ok(())
    }
}
