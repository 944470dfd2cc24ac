//! Canvas paint pipeline.
//!
//! One pass per frame: background, the transformed and filtered photo under its blend mode, the
//! template stretched over the full canvas, and optionally the guide overlay.

use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::edit::state::EditState;
use crate::foundation::core::{Affine, Canvas, Vec2};

pub mod composite;
pub mod cpu;
pub mod filters;
pub mod guides;

pub use cpu::CpuRenderer;

/// A painted canvas, RGBA8 in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn transparent(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.byte_len()],
            premultiplied: true,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Everything one frame depends on.
#[derive(Clone, Copy, Debug)]
pub struct RenderInputs<'a> {
    pub photo: &'a Arc<PreparedImage>,
    pub template: &'a Arc<PreparedImage>,
    pub state: &'a EditState,
    pub guides: bool,
}

/// Maps photo pixel space to canvas space.
///
/// Rotation pivots on the canvas center; `state.position` is where the photo's center lands before
/// that rotation.
pub fn photo_transform(canvas: Canvas, photo_w: u32, photo_h: u32, state: &EditState) -> Affine {
    let center = canvas.center();
    let center = Vec2::new(center.x, center.y);
    let draw = Vec2::new(f64::from(photo_w), f64::from(photo_h)) * state.scale;
    let top_left = Vec2::new(state.position.x, state.position.y) - draw / 2.0 - center;

    Affine::translate(center)
        * Affine::rotate(state.rotation_deg.to_radians())
        * Affine::translate(top_left)
        * Affine::scale(state.scale)
}

/// Stretches a template of any size over the full canvas.
pub fn template_transform(canvas: Canvas, template_w: u32, template_h: u32) -> Affine {
    Affine::scale_non_uniform(
        f64::from(canvas.width) / f64::from(template_w.max(1)),
        f64::from(canvas.height) / f64::from(template_h.max(1)),
    )
}
