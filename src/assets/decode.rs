use std::fmt;
use std::sync::Arc;

use crate::foundation::error::{PhotocardError, PhotocardResult};

/// Which input an image is destined for. Templates must keep their alpha, so only PNG is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Photo,
    Template,
}

impl ImageRole {
    pub fn accepts(self, media: MediaType) -> bool {
        match self {
            ImageRole::Photo => matches!(media, MediaType::Png | MediaType::Jpeg),
            ImageRole::Template => media == MediaType::Png,
        }
    }

    fn type_error(self) -> &'static str {
        match self {
            ImageRole::Photo => "only JPG, JPEG, and PNG files are allowed",
            ImageRole::Template => "only PNG files are allowed for templates",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageRole::Photo => "photo",
            ImageRole::Template => "template",
        })
    }
}

/// The two raster encodings the editor reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaType {
    Png,
    Jpeg,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(MediaType::Png),
            "image/jpeg" | "image/jpg" => Some(MediaType::Jpeg),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }

    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(MediaType::Png),
            image::ImageFormat::Jpeg => Some(MediaType::Jpeg),
            _ => None,
        }
    }
}

/// A decoded raster, premultiplied RGBA8, shared between the session and the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Build from straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> PhotocardResult<Self> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(PhotocardError::decode("rgba8 byte length mismatch"));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }
}

/// Reject oversized or wrongly typed input before any decode happens.
///
/// `declared_mime` is what the picker reported; the sniffed signature must agree with it.
pub fn validate_input(
    role: ImageRole,
    bytes: &[u8],
    declared_mime: Option<&str>,
    max_bytes: usize,
) -> PhotocardResult<MediaType> {
    if bytes.len() > max_bytes {
        return Err(PhotocardError::validation(format!(
            "file size exceeds {}MB limit",
            max_bytes / (1024 * 1024)
        )));
    }

    let declared = match declared_mime {
        Some(mime) => {
            let media =
                MediaType::from_mime(mime).ok_or_else(|| PhotocardError::validation(role.type_error()))?;
            if !role.accepts(media) {
                return Err(PhotocardError::validation(role.type_error()));
            }
            Some(media)
        }
        None => None,
    };

    let sniffed = image::guess_format(bytes)
        .ok()
        .and_then(MediaType::from_image_format)
        .ok_or_else(|| PhotocardError::validation(role.type_error()))?;
    if !role.accepts(sniffed) {
        return Err(PhotocardError::validation(role.type_error()));
    }
    if let Some(declared) = declared
        && declared != sniffed
    {
        return Err(PhotocardError::validation(format!(
            "{role} content is {} but was declared as {}",
            sniffed.mime(),
            declared.mime()
        )));
    }
    Ok(sniffed)
}

pub fn decode_image(bytes: &[u8]) -> PhotocardResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| PhotocardError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
        return Err(PhotocardError::decode(format!(
            "image is {width}x{height}; both sides must be <= 65535"
        )));
    }

    PreparedImage::from_straight_rgba8(width, height, rgba.into_raw())
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
