use std::sync::Arc;
use std::time::Instant;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Affine, Canvas};
use crate::foundation::error::{PhotocardError, PhotocardResult};
use crate::render::composite::{blend_over_in_place, fill, over_in_place};
use crate::render::filters::FilterChain;
use crate::render::guides::guide_rects;
use crate::render::{FrameRGBA, RenderInputs, photo_transform, template_transform};

/// Software renderer that owns the painted surface.
///
/// `vello_cpu` rasterizes each layer into a transparent scratch pixmap; layers are then composited
/// onto the surface with the premultiplied kernels in [`crate::render::composite`].
pub struct CpuRenderer {
    canvas: Canvas,
    width: u16,
    height: u16,
    ctx: Option<vello_cpu::RenderContext>,
    scratch: vello_cpu::Pixmap,
    photo_paint: Option<CachedPaint>,
    template_paint: Option<CachedPaint>,
    frame: FrameRGBA,
}

struct CachedPaint {
    source: Arc<PreparedImage>,
    paint: vello_cpu::Image,
}

impl CpuRenderer {
    pub fn new(canvas: Canvas) -> PhotocardResult<Self> {
        canvas.validate()?;
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| PhotocardError::render("canvas width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| PhotocardError::render("canvas height exceeds u16"))?;
        Ok(Self {
            canvas,
            width,
            height,
            ctx: None,
            scratch: vello_cpu::Pixmap::new(width, height),
            photo_paint: None,
            template_paint: None,
            frame: FrameRGBA::transparent(canvas),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// The most recently painted surface.
    pub fn frame(&self) -> &FrameRGBA {
        &self.frame
    }

    /// Repaint the surface from scratch. Identical inputs give byte-identical output.
    #[tracing::instrument(skip_all, fields(guides = inputs.guides))]
    pub fn render(&mut self, inputs: &RenderInputs<'_>) -> PhotocardResult<&FrameRGBA> {
        let started = Instant::now();
        let state = inputs.state;

        fill(&mut self.frame.data, state.background.to_opaque_rgba());

        let photo = inputs.photo;
        let paint = paint_for(&mut self.photo_paint, photo)?;
        let transform = photo_transform(self.canvas, photo.width, photo.height, state);
        self.rasterize_image(paint, transform, photo.width, photo.height);
        FilterChain::from_settings(&state.filters)
            .apply_in_place(self.scratch.data_as_u8_slice_mut());
        blend_over_in_place(
            &mut self.frame.data,
            self.scratch.data_as_u8_slice(),
            state.blend,
        )?;

        let template = inputs.template;
        if template.width == self.canvas.width && template.height == self.canvas.height {
            over_in_place(&mut self.frame.data, template.rgba8_premul.as_slice())?;
        } else {
            let paint = paint_for(&mut self.template_paint, template)?;
            let transform = template_transform(self.canvas, template.width, template.height);
            self.rasterize_image(paint, transform, template.width, template.height);
            over_in_place(&mut self.frame.data, self.scratch.data_as_u8_slice())?;
        }

        if inputs.guides {
            self.rasterize_guides();
            over_in_place(&mut self.frame.data, self.scratch.data_as_u8_slice())?;
        }

        tracing::trace!(
            elapsed_us = started.elapsed().as_micros() as u64,
            "frame rendered"
        );
        Ok(&self.frame)
    }

    fn rasterize_image(&mut self, paint: vello_cpu::Image, transform: Affine, w: u32, h: u32) {
        self.with_ctx(|ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(w),
                f64::from(h),
            ));
        });
    }

    fn rasterize_guides(&mut self) {
        let rects = guide_rects(self.canvas);
        self.with_ctx(|ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            for r in &rects {
                let [red, green, blue, alpha] = r.rgba;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(red, green, blue, alpha));
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1));
            }
        });
    }

    /// Run one vello pass into the cleared scratch pixmap.
    fn with_ctx(&mut self, draw: impl FnOnce(&mut vello_cpu::RenderContext)) {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == self.width && ctx.height() == self.height => ctx,
            _ => vello_cpu::RenderContext::new(self.width, self.height),
        };
        ctx.reset();
        draw(&mut ctx);
        ctx.flush();
        fill(self.scratch.data_as_u8_slice_mut(), [0, 0, 0, 0]);
        ctx.render_to_pixmap(&mut self.scratch);
        self.ctx = Some(ctx);
    }
}

/// Reuse the cached paint while the same decoded handle is being drawn.
fn paint_for(
    cache: &mut Option<CachedPaint>,
    image: &Arc<PreparedImage>,
) -> PhotocardResult<vello_cpu::Image> {
    if let Some(cached) = cache.as_ref()
        && Arc::ptr_eq(&cached.source, image)
    {
        return Ok(cached.paint.clone());
    }

    let pixmap = premul_bytes_to_pixmap(image.rgba8_premul.as_slice(), image.width, image.height)?;
    let paint = vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    };
    *cache = Some(CachedPaint {
        source: Arc::clone(image),
        paint: paint.clone(),
    });
    Ok(paint)
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> PhotocardResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| PhotocardError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| PhotocardError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(PhotocardError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels: Vec<_> = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}
