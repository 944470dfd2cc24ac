//! CSS Filter Effects color matrices for the photo layer.
//!
//! The chain runs brightness, contrast, grayscale, sepia in that order. Every stage works on
//! straight color and clamps to `[0, 1]` before the next one sees it.

use crate::edit::state::FilterSettings;

/// Row-major 4×5 matrix: each output channel is `m·[r, g, b, a] + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorMatrix(pub [f32; 20]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// `amount` 1.0 is unchanged.
    pub fn brightness(amount: f32) -> Self {
        Self::rgb_linear(amount, 0.0)
    }

    /// `amount` 1.0 is unchanged; 0.0 collapses to mid grey.
    pub fn contrast(amount: f32) -> Self {
        Self::rgb_linear(amount, 0.5 - 0.5 * amount)
    }

    /// `amount` saturates at 1.0 (fully grey).
    pub fn grayscale(amount: f32) -> Self {
        if amount <= 0.0 {
            return Self::IDENTITY;
        }
        let s = 1.0 - amount.min(1.0);
        Self::rgb3([
            [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
            [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
            [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
        ])
    }

    /// `amount` saturates at 1.0 (full sepia tone).
    pub fn sepia(amount: f32) -> Self {
        if amount <= 0.0 {
            return Self::IDENTITY;
        }
        let s = 1.0 - amount.min(1.0);
        Self::rgb3([
            [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
            [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
            [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
        ])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    fn rgb_linear(slope: f32, intercept: f32) -> Self {
        let mut m = Self::IDENTITY.0;
        for row in 0..3 {
            m[row * 5 + row] = slope;
            m[row * 5 + 4] = intercept;
        }
        Self(m)
    }

    fn rgb3(rows: [[f32; 3]; 3]) -> Self {
        let mut m = Self::IDENTITY.0;
        for (r, row) in rows.iter().enumerate() {
            m[r * 5..r * 5 + 3].copy_from_slice(row);
        }
        Self(m)
    }

    fn apply(&self, [r, g, b, a]: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let row = |i: usize| {
            (m[i] * r + m[i + 1] * g + m[i + 2] * b + m[i + 3] * a + m[i + 4]).clamp(0.0, 1.0)
        };
        [row(0), row(5), row(10), row(15)]
    }
}

/// The non-identity stages of a [`FilterSettings`], in application order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChain {
    stages: Vec<ColorMatrix>,
}

impl FilterChain {
    pub fn from_settings(f: &FilterSettings) -> Self {
        let stages = [
            ColorMatrix::brightness(f.brightness / 100.0),
            ColorMatrix::contrast(f.contrast / 100.0),
            ColorMatrix::grayscale(f.grayscale / 100.0),
            ColorMatrix::sepia(f.sepia / 100.0),
        ]
        .into_iter()
        .filter(|m| !m.is_identity())
        .collect();
        Self { stages }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[ColorMatrix] {
        &self.stages
    }

    /// Filter a premultiplied RGBA8 buffer in place. An empty chain does not touch the bytes.
    pub fn apply_in_place(&self, rgba8_premul: &mut [u8]) {
        if self.stages.is_empty() {
            return;
        }
        for px in rgba8_premul.chunks_exact_mut(4) {
            if px[3] == 0 {
                continue;
            }
            let a = f32::from(px[3]) / 255.0;
            let straight = |c: u8| (f32::from(c) / 255.0 / a).clamp(0.0, 1.0);
            let mut v = [straight(px[0]), straight(px[1]), straight(px[2]), a];
            for m in &self.stages {
                v = m.apply(v);
            }
            let out_a = v[3];
            px[0] = to_u8(v[0] * out_a);
            px[1] = to_u8(v[1] * out_a);
            px[2] = to_u8(v[2] * out_a);
            px[3] = to_u8(out_a);
        }
    }
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
