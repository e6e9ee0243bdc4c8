//! Validation of user-supplied image bytes before they reach storage.

use crate::{Error, Result};
use image::ImageFormat;

/// Largest upload accepted by the server.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Sniff the image format from magic bytes and return its MIME type.
///
/// The client-declared content type is ignored; only the bytes count.
pub fn detect_image_mime(bytes: &[u8]) -> Result<&'static str> {
    if bytes.is_empty() {
        return Err(Error::Validation("Uploaded file is empty".to_string()));
    }

    // Formats with two-byte signatures (BMP, PNM) also match ordinary text
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::WebP) => Ok("image/webp"),
        Ok(ImageFormat::Gif) => Ok("image/gif"),
        _ => {
            tracing::warn!(
                "Unsupported upload format (first 4 bytes: {:02X?})",
                &bytes[..bytes.len().min(4)]
            );
            Err(Error::Validation(
                "Uploaded file is not a supported image".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        assert_eq!(
            detect_image_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap(),
            "image/png"
        );
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(
            detect_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(),
            "image/jpeg"
        );
    }

    #[test]
    fn test_detect_webp() {
        assert_eq!(
            detect_image_mime(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ])
            .unwrap(),
            "image/webp"
        );
    }

    #[test]
    fn test_unknown_bytes_are_rejected() {
        let err = detect_image_mime(b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_detect_gif() {
        assert_eq!(detect_image_mime(b"GIF89a\x01\x00").unwrap(), "image/gif");
    }

    #[test]
    fn test_text_with_short_image_signature_is_rejected() {
        for text in [
            &b"BMW service notes: oil change due"[..],
            &b"P1 meeting agenda"[..],
        ] {
            assert!(matches!(detect_image_mime(text), Err(Error::Validation(_))));
        }
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        assert!(matches!(detect_image_mime(&[]), Err(Error::Validation(_))));
    }
}
