use crate::foundation::core::Canvas;

/// Royal blue at half opacity.
pub const CENTERLINE_RGBA: [u8; 4] = [65, 105, 225, 128];
pub const THIRDS_RGBA: [u8; 4] = [255, 255, 255, 128];

pub const CENTERLINE_WIDTH: f64 = 2.0;
pub const DASH_ON: f64 = 5.0;
pub const DASH_OFF: f64 = 5.0;
pub const THIRDS_WIDTH: f64 = 1.0;

/// An axis-aligned, straight-alpha colored rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuideRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub rgba: [u8; 4],
}

impl GuideRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Dashed centerlines first, then the rule-of-thirds grid.
pub fn guide_rects(canvas: Canvas) -> Vec<GuideRect> {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let c = canvas.center();
    let half = CENTERLINE_WIDTH / 2.0;
    let mut out = Vec::new();

    let mut y = 0.0;
    while y < h {
        out.push(GuideRect {
            x0: c.x - half,
            y0: y,
            x1: c.x + half,
            y1: (y + DASH_ON).min(h),
            rgba: CENTERLINE_RGBA,
        });
        y += DASH_ON + DASH_OFF;
    }
    let mut x = 0.0;
    while x < w {
        out.push(GuideRect {
            x0: x,
            y0: c.y - half,
            x1: (x + DASH_ON).min(w),
            y1: c.y + half,
            rgba: CENTERLINE_RGBA,
        });
        x += DASH_ON + DASH_OFF;
    }

    for i in 1..=2 {
        let gx = (w * f64::from(i) / 3.0).floor();
        out.push(GuideRect {
            x0: gx,
            y0: 0.0,
            x1: gx + THIRDS_WIDTH,
            y1: h,
            rgba: THIRDS_RGBA,
        });
        let gy = (h * f64::from(i) / 3.0).floor();
        out.push(GuideRect {
            x0: 0.0,
            y0: gy,
            x1: w,
            y1: gy + THIRDS_WIDTH,
            rgba: THIRDS_RGBA,
        });
    }
    out
}
