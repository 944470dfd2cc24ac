use base64::{Engine as _, engine::general_purpose};

use crate::assets::decode::MediaType;
use crate::foundation::error::{PhotocardError, PhotocardResult};

/// `data:<mime>;base64,<payload>`
pub fn encode_data_url(media: MediaType, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media.mime(),
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Parse a base64 data URL for one of the supported raster types.
pub fn decode_data_url(url: &str) -> PhotocardResult<(MediaType, Vec<u8>)> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| PhotocardError::decode("data url must start with 'data:'"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| PhotocardError::decode("data url is missing ','"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| PhotocardError::decode("only base64 data urls are supported"))?;
    let media = MediaType::from_mime(mime)
        .ok_or_else(|| PhotocardError::decode(format!("unsupported data url type '{mime}'")))?;
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| PhotocardError::decode(format!("invalid base64 payload: {e}")))?;
    Ok((media, bytes))
}
