//! Inline resource payloads (`data:` URIs).
//!
//! The host reads raw bytes and ships them as `data:<mime>;base64,<data>`.
//! The surface decodes the URI back into a [`Resource`]. Non-base64 data URIs
//! are accepted and percent-decoded.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::utils::mime;

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Decoded resource handed to view fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub mime: String,
    pub bytes: Vec<u8>,
    /// Pixel size when the bytes are a raster format the decoder recognizes
    pub dimensions: Option<(u32, u32)>,
}

impl Resource {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_image(&self) -> bool {
        mime::is_image(&self.mime)
    }
}

/// Payload decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload is not a data URI")]
    NotDataUri,

    #[error("data URI has no `,` separator")]
    MissingData,

    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

/// Encode raw bytes as a base64 data URI.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("{DATA_SCHEME}{mime}{BASE64_MARKER},{}", STANDARD.encode(bytes))
}

/// Decode a data URI into a [`Resource`].
pub fn decode_data_uri(text: &str) -> Result<Resource, PayloadError> {
    let rest = strip_scheme(text.trim()).ok_or(PayloadError::NotDataUri)?;
    let (header, data) = rest.split_once(',').ok_or(PayloadError::MissingData)?;

    let (media_type, is_base64) = match header.strip_suffix(BASE64_MARKER) {
        Some(media_type) => (media_type, true),
        None => (header, false),
    };

    let bytes = if is_base64 {
        STANDARD
            .decode(data)
            .map_err(|e| PayloadError::Base64(e.to_string()))?
    } else {
        percent_decode_str(data).collect()
    };

    // Parameters like `;charset=` are not part of the mime itself
    let mime = media_type.split(';').next().unwrap_or_default().trim();
    let mime = if mime.is_empty() { mime::types::PLAIN } else { mime };

    let dimensions = probe_dimensions(&bytes);
    Ok(Resource {
        mime: mime.to_ascii_lowercase(),
        bytes,
        dimensions,
    })
}

fn strip_scheme(text: &str) -> Option<&str> {
    let prefix = text.get(..DATA_SCHEME.len())?;
    prefix
        .eq_ignore_ascii_case(DATA_SCHEME)
        .then(|| &text[DATA_SCHEME.len()..])
}

/// Read the pixel size from the image header without decoding pixels.
fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(test)]
pub(crate) fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_payload_decodes_with_dimensions() {
        let png = tiny_png(3, 2);
        let uri = encode_data_uri(mime::types::PNG, &png);
        assert!(uri.starts_with("data:image/png;base64,"));

        let resource = decode_data_uri(&uri).unwrap();
        assert_eq!(resource.mime, "image/png");
        assert_eq!(resource.bytes, png);
        assert_eq!(resource.dimensions, Some((3, 2)));
        assert!(resource.is_image());
    }

    #[test]
    fn test_non_image_bytes_have_no_dimensions() {
        let uri = encode_data_uri(mime::types::SVG, b"<svg/>");
        let resource = decode_data_uri(&uri).unwrap();
        assert_eq!(resource.mime, "image/svg+xml");
        assert_eq!(resource.dimensions, None);
    }

    #[test]
    fn test_percent_encoded_payload() {
        let resource = decode_data_uri("DATA:text/plain;charset=utf-8,hello%20tiles").unwrap();
        assert_eq!(resource.mime, "text/plain");
        assert_eq!(resource.bytes, b"hello tiles");
    }

    #[test]
    fn test_default_mime_when_header_empty() {
        let resource = decode_data_uri("data:,abc").unwrap();
        assert_eq!(resource.mime, "text/plain");
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(
            decode_data_uri("https://example.com/a.png"),
            Err(PayloadError::NotDataUri)
        );
        assert_eq!(
            decode_data_uri("data:image/png;base64"),
            Err(PayloadError::MissingData)
        );
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@not base64@@"),
            Err(PayloadError::Base64(_))
        ));
    }
}
