use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::imageops::FilterType;

use crate::assets::data_url::encode_data_url;
use crate::assets::decode::MediaType;
use crate::foundation::error::{PhotocardError, PhotocardResult};
use crate::render::FrameRGBA;

pub const DEFAULT_FILE_STEM: &str = "photo-card";

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn media_type(self) -> MediaType {
        match self {
            ExportFormat::Png => MediaType::Png,
            ExportFormat::Jpeg => MediaType::Jpeg,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PhotocardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
            other => Err(PhotocardError::validation(format!(
                "unsupported export format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

/// Output resolution multiplier over the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExportScale {
    #[default]
    X1,
    X2,
    X4,
}

impl ExportScale {
    pub fn factor(self) -> u32 {
        match self {
            ExportScale::X1 => 1,
            ExportScale::X2 => 2,
            ExportScale::X4 => 4,
        }
    }
}

impl TryFrom<u32> for ExportScale {
    type Error = PhotocardError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(ExportScale::X1),
            2 => Ok(ExportScale::X2),
            4 => Ok(ExportScale::X4),
            other => Err(PhotocardError::validation(format!(
                "export scale must be 1, 2 or 4 (got {other})"
            ))),
        }
    }
}

impl FromStr for ExportScale {
    type Err = PhotocardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches(['x', 'X']);
        let v: u32 = digits
            .parse()
            .map_err(|_| PhotocardError::validation(format!("invalid export scale '{s}'")))?;
        Self::try_from(v)
    }
}

impl fmt::Display for ExportScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

/// An encoded raster plus what is needed to label it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn mime(&self) -> &'static str {
        self.format.media_type().mime()
    }

    pub fn to_data_url(&self) -> String {
        encode_data_url(self.format.media_type(), &self.bytes)
    }
}

/// Encode a painted frame losslessly, undoing premultiplication first.
pub fn encode_png(frame: &FrameRGBA) -> PhotocardResult<EncodedImage> {
    let mut data = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut data);
    }
    let img = image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| PhotocardError::export("frame buffer does not match its dimensions"))?;
    let bytes = write_png(&image::DynamicImage::ImageRgba8(img))?;
    Ok(EncodedImage {
        format: ExportFormat::Png,
        width: frame.width,
        height: frame.height,
        bytes,
    })
}

/// `"{stem}-{n}x.{ext}"`, with `photo-card` standing in for a missing or blank stem.
pub fn export_file_name(stem: Option<&str>, scale: ExportScale, format: ExportFormat) -> String {
    let stem = stem
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FILE_STEM);
    format!("{stem}-{scale}.{}", format.extension())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    pub scale: ExportScale,
    pub format: ExportFormat,
    pub file_stem: Option<String>,
    /// 1..=100, only used for JPEG.
    pub jpeg_quality: u8,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            scale: ExportScale::X1,
            format: ExportFormat::Png,
            file_stem: None,
            jpeg_quality: 92,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub image: EncodedImage,
}

/// Hands out at most one [`ExportJob`] at a time.
///
/// Clones share the in-flight flag, so a job may run on another thread while the UI side polls
/// [`Exporter::is_busy`].
#[derive(Clone, Debug, Default)]
pub struct Exporter {
    in_flight: Arc<AtomicBool>,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn begin(&self, confirmed: &EncodedImage, request: &ExportRequest) -> PhotocardResult<ExportJob> {
        if !(1..=100).contains(&request.jpeg_quality) {
            return Err(PhotocardError::validation(
                "jpeg_quality must be within 1..=100",
            ));
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("export requested while another is running");
            return Err(PhotocardError::export("an export is already in progress"));
        }
        Ok(ExportJob {
            source: confirmed.bytes.clone(),
            request: request.clone(),
            _guard: InFlight(Arc::clone(&self.in_flight)),
        })
    }
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One upscale and re-encode. The exporter stays busy until this is dropped.
pub struct ExportJob {
    source: Vec<u8>,
    request: ExportRequest,
    _guard: InFlight,
}

impl fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportJob")
            .field("source_len", &self.source.len())
            .field("request", &self.request)
            .finish()
    }
}

impl ExportJob {
    pub fn request(&self) -> &ExportRequest {
        &self.request
    }

    #[tracing::instrument(skip(self), fields(scale = %self.request.scale, format = ?self.request.format))]
    pub fn run(self) -> PhotocardResult<ExportArtifact> {
        let req = &self.request;
        let src = image::load_from_memory(&self.source)
            .map_err(|e| PhotocardError::export(format!("decode confirmed image: {e}")))?
            .to_rgba8();

        let factor = req.scale.factor();
        let (w, h) = (src.width() * factor, src.height() * factor);
        let scaled = if factor == 1 {
            src
        } else {
            image::imageops::resize(&src, w, h, FilterType::Lanczos3)
        };

        let bytes = match req.format {
            ExportFormat::Png => write_png(&image::DynamicImage::ImageRgba8(scaled))?,
            ExportFormat::Jpeg => write_jpeg(&flatten_on_black(&scaled), req.jpeg_quality)?,
        };
        tracing::debug!(width = w, height = h, len = bytes.len(), "export encoded");

        Ok(ExportArtifact {
            file_name: export_file_name(req.file_stem.as_deref(), req.scale, req.format),
            image: EncodedImage {
                format: req.format,
                width: w,
                height: h,
                bytes,
            },
        })
    }
}

fn write_png(img: &image::DynamicImage) -> PhotocardResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PhotocardError::export(format!("encode png: {e}")))?;
    Ok(buf)
}

fn write_jpeg(img: &image::RgbImage, quality: u8) -> PhotocardResult<Vec<u8>> {
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(img)
        .map_err(|e| PhotocardError::export(format!("encode jpeg: {e}")))?;
    Ok(buf)
}

/// Drop alpha the way a canvas JPEG export does: composite over opaque black.
fn flatten_on_black(img: &image::RgbaImage) -> image::RgbImage {
    image::RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let a = u32::from(a);
        let f = |c: u8| ((u32::from(c) * a + 127) / 255) as u8;
        image::Rgb([f(r), f(g), f(b)])
    })
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;

    fn confirmed(w: u32, h: u32, px: [u8; 4]) -> EncodedImage {
        let canvas = Canvas::new(w, h).unwrap();
        let mut frame = FrameRGBA::transparent(canvas);
        for d in frame.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        encode_png(&frame).unwrap()
    }

    #[test]
    fn file_names_follow_stem_scale_extension() {
        assert_eq!(
            export_file_name(None, ExportScale::X1, ExportFormat::Png),
            "photo-card-1x.png"
        );
        assert_eq!(
            export_file_name(Some("party"), ExportScale::X4, ExportFormat::Jpeg),
            "party-4x.jpg"
        );
        assert_eq!(
            export_file_name(Some("  "), ExportScale::X2, ExportFormat::Png),
            "photo-card-2x.png"
        );
    }

    #[test]
    fn scale_parsing() {
        assert_eq!("2".parse::<ExportScale>().unwrap(), ExportScale::X2);
        assert_eq!("4x".parse::<ExportScale>().unwrap(), ExportScale::X4);
        assert!("3".parse::<ExportScale>().is_err());
        assert!(ExportScale::try_from(0).is_err());
        assert_eq!("JPG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert!("gif".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn encode_png_unpremultiplies() {
        let img = confirmed(2, 2, [64, 0, 0, 128]);
        let back = image::load_from_memory(&img.bytes).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(0, 0).0, [128, 0, 0, 128]);
        assert!(img.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn png_export_upscales() {
        let exporter = Exporter::new();
        let src = confirmed(5, 3, [10, 20, 30, 255]);
        let job = exporter
            .begin(
                &src,
                &ExportRequest {
                    scale: ExportScale::X2,
                    ..ExportRequest::default()
                },
            )
            .unwrap();
        let art = job.run().unwrap();
        assert_eq!((art.image.width, art.image.height), (10, 6));
        assert_eq!(art.file_name, "photo-card-2x.png");
        let back = image::load_from_memory(&art.image.bytes).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (10, 6));
        let px = back.get_pixel(4, 2).0;
        for (got, want) in px.iter().zip([10u8, 20, 30, 255]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
        assert!(!exporter.is_busy());
    }

    #[test]
    fn jpeg_export_flattens_onto_black() {
        let exporter = Exporter::new();
        let src = confirmed(8, 8, [0, 0, 0, 0]);
        let art = exporter
            .begin(
                &src,
                &ExportRequest {
                    scale: ExportScale::X4,
                    format: ExportFormat::Jpeg,
                    file_stem: Some("card".into()),
                    jpeg_quality: 92,
                },
            )
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(art.file_name, "card-4x.jpg");
        assert_eq!(art.image.mime(), "image/jpeg");
        assert_eq!(
            image::guess_format(&art.image.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        let back = image::load_from_memory(&art.image.bytes).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (32, 32));
        assert!(back.get_pixel(16, 16).0.iter().all(|&c| c < 8));
    }

    #[test]
    fn second_begin_fails_while_a_job_is_alive() {
        let exporter = Exporter::new();
        let src = confirmed(2, 2, [1, 2, 3, 255]);
        let job = exporter.begin(&src, &ExportRequest::default()).unwrap();
        assert!(exporter.is_busy());

        let err = exporter.begin(&src, &ExportRequest::default()).unwrap_err();
        assert!(matches!(err, PhotocardError::Export(_)));
        assert!(exporter.clone().is_busy());

        drop(job);
        assert!(!exporter.is_busy());
        assert!(exporter.begin(&src, &ExportRequest::default()).is_ok());
    }

    #[test]
    fn bad_quality_is_rejected_without_taking_the_slot() {
        let exporter = Exporter::new();
        let src = confirmed(2, 2, [1, 2, 3, 255]);
        let req = ExportRequest {
            jpeg_quality: 0,
            ..ExportRequest::default()
        };
        assert!(exporter.begin(&src, &req).unwrap_err().is_validation());
        assert!(!exporter.is_busy());
    }
}
