//! Pointer-space to model-space mapping.
//!
//! The user image is drawn rotated about the canvas center, but its position is stored unrotated.
//! Pointer events arrive in screen space, so they are rotated back by the negative angle before
//! they touch the edit state.

use crate::foundation::core::{Canvas, Position};

/// Rotate `(x, y)` by `-rotation_deg` around the center of a `width` × `height` box.
///
/// Returns the point as it sits in the unrotated (model) frame.
pub fn rotate_point(x: f64, y: f64, rotation_deg: f64, width: f64, height: f64) -> Position {
    let cx = width / 2.0;
    let cy = height / 2.0;
    let dx = x - cx;
    let dy = y - cy;
    let (sin, cos) = (-rotation_deg).to_radians().sin_cos();
    Position::new(dx * cos - dy * sin + cx, dx * sin + dy * cos + cy)
}

/// [`rotate_point`] over a canvas.
pub fn screen_to_model(p: Position, rotation_deg: f64, canvas: Canvas) -> Position {
    rotate_point(
        p.x,
        p.y,
        rotation_deg,
        f64::from(canvas.width),
        f64::from(canvas.height),
    )
}

pub fn snap_axis(value: f64, center: f64, threshold: f64) -> f64 {
    if (value - center).abs() < threshold {
        center
    } else {
        value
    }
}

/// Snap each axis of `candidate` to the canvas center independently.
pub fn snap_to_center(candidate: Position, canvas: Canvas, threshold: f64) -> Position {
    let c = canvas.center();
    Position::new(
        snap_axis(candidate.x, c.x, threshold),
        snap_axis(candidate.y, c.y, threshold),
    )
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid of a tiny negative rounds up to exactly 360.0
    if r >= 360.0 { 0.0 } else { r }
}
