use crate::edit::state::BlendMode;
use crate::foundation::error::{PhotocardError, PhotocardResult};

pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over for one premultiplied pixel.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> PhotocardResult<()> {
    check_lengths(dst, src, "over_in_place")?;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Composite `src` onto `dst` with a separable blend mode.
pub fn blend_over_in_place(dst: &mut [u8], src: &[u8], mode: BlendMode) -> PhotocardResult<()> {
    check_lengths(dst, src, "blend_over_in_place")?;

    // Dispatch once per layer; each arm monomorphizes its own kernel.
    match mode {
        BlendMode::Normal => over_in_place(dst, src),
        BlendMode::Multiply => {
            blend_kernel(dst, src, |s, d| s * d);
            Ok(())
        }
        BlendMode::Screen => {
            blend_kernel(dst, src, |s, d| s + d - s * d);
            Ok(())
        }
        BlendMode::Overlay => {
            blend_kernel(dst, src, |s, d| {
                if d <= 0.5 {
                    2.0 * s * d
                } else {
                    1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                }
            });
            Ok(())
        }
    }
}

/// Overwrite every pixel with `px`.
pub fn fill(dst: &mut [u8], px: PremulRgba8) {
    for d in dst.chunks_exact_mut(4) {
        d.copy_from_slice(&px);
    }
}

#[inline(always)]
fn blend_kernel<F>(dst: &mut [u8], src: &[u8], blend_fn: F)
where
    F: Fn(f32, f32) -> f32,
{
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        // out_a = sa + da * (1 - sa)
        // out_p = sp * (1 - da) + dp * (1 - sa) + B(sc, dc) * sa * da
        let sa = f32::from(s[3]) / 255.0;
        let da = f32::from(d[3]) / 255.0;
        let out_a = (sa + da * (1.0 - sa)).clamp(0.0, 1.0);

        for c in 0..3 {
            let sp = f32::from(s[c]) / 255.0;
            let dp = f32::from(d[c]) / 255.0;
            let sc = (sp / sa).clamp(0.0, 1.0);
            let dc = if da > 0.0 { (dp / da).clamp(0.0, 1.0) } else { 0.0 };
            let b = blend_fn(sc, dc).clamp(0.0, 1.0);
            let out_p = (sp * (1.0 - da) + dp * (1.0 - sa) + b * sa * da).clamp(0.0, 1.0);
            d[c] = to_u8(out_p);
        }
        d[3] = to_u8(out_a);
    }
}

fn check_lengths(dst: &[u8], src: &[u8], what: &str) -> PhotocardResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PhotocardError::render(format!(
            "{what} expects equal-length rgba8 buffers"
        )));
    }
    Ok(())
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blend_px(dst: PremulRgba8, src: PremulRgba8, mode: BlendMode) -> PremulRgba8 {
        let mut d = dst.to_vec();
        blend_over_in_place(&mut d, &src, mode).unwrap();
        [d[0], d[1], d[2], d[3]]
    }

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        assert_eq!(over(dst, [255, 255, 255, 0]), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        assert_eq!(over([0, 0, 0, 255], [255, 0, 0, 255]), [255, 0, 0, 255]);
    }

    #[test]
    fn over_half_white_on_black() {
        assert_eq!(over([0, 0, 0, 255], [128, 128, 128, 128]), [128, 128, 128, 255]);
    }

    #[test]
    fn multiply_on_white_keeps_source() {
        let out = blend_px([255, 255, 255, 255], [200, 100, 50, 255], BlendMode::Multiply);
        assert_eq!(out, [200, 100, 50, 255]);
    }

    #[test]
    fn multiply_on_black_is_black() {
        let out = blend_px([0, 0, 0, 255], [200, 100, 50, 255], BlendMode::Multiply);
        assert_eq!(out, [0, 0, 0, 255]);
    }

    #[test]
    fn screen_on_black_keeps_source_and_on_white_is_white() {
        let src = [200, 100, 50, 255];
        assert_eq!(blend_px([0, 0, 0, 255], src, BlendMode::Screen), src);
        assert_eq!(
            blend_px([255, 255, 255, 255], src, BlendMode::Screen),
            [255, 255, 255, 255]
        );
    }

    #[test]
    fn overlay_keys_on_destination() {
        let src = [128, 128, 128, 255];
        // Mid grey source over a dark backdrop darkens less than multiply would.
        let out = blend_px([64, 64, 64, 255], src, BlendMode::Overlay);
        assert!((i32::from(out[0]) - 64).abs() <= 1, "{out:?}");
        let out = blend_px([255, 255, 255, 255], src, BlendMode::Overlay);
        assert_eq!(out, [255, 255, 255, 255]);
    }

    #[test]
    fn blend_on_transparent_dst_is_plain_source() {
        let src = [100, 50, 25, 128];
        for mode in BlendMode::ALL {
            assert_eq!(blend_px([0, 0, 0, 0], src, mode), src, "{mode}");
        }
    }

    #[test]
    fn transparent_source_leaves_dst_for_every_mode() {
        let dst = [12, 34, 56, 255];
        for mode in BlendMode::ALL {
            assert_eq!(blend_px(dst, [0, 0, 0, 0], mode), dst, "{mode}");
        }
    }

    #[test]
    fn mismatched_buffers_are_a_render_error() {
        let mut dst = vec![0u8; 8];
        let err = blend_over_in_place(&mut dst, &[0u8; 4], BlendMode::Screen).unwrap_err();
        assert!(matches!(err, PhotocardError::Render(_)));
    }

    #[test]
    fn fill_writes_every_pixel() {
        let mut buf = vec![0u8; 12];
        fill(&mut buf, [1, 2, 3, 4]);
        assert_eq!(buf, [1, 2, 3, 4].repeat(3));
    }
}
