//! Converting binary data to a `data:` URL.

use base64::{Engine as _, prelude::BASE64_STANDARD};

use crate::prelude::*;

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    // Some sources indicate that the Base64 data should be percent-encoded, but
    // in practice this breaks several vision models.
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// Get the MIME type of an image from its contents, falling back to the
/// file extension.
pub fn image_mime_type(path: &Path, data: &[u8]) -> Result<String> {
    if let Some(kind) = infer::get(data) {
        return Ok(kind.mime_type().to_owned());
    }
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_owned())
        .ok_or_else(|| anyhow!("unknown MIME type for {:?}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_uses_base64() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn mime_type_sniffs_contents_before_extension() {
        // PNG magic number, but a misleading extension.
        let png_header = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        let mime = image_mime_type(Path::new("receipt.jpg"), png_header).unwrap();
        assert_eq!(mime, "image/png");

        let mime = image_mime_type(Path::new("receipt.jpg"), b"not an image").unwrap();
        assert_eq!(mime, "image/jpeg");

        assert!(image_mime_type(Path::new("receipt"), b"???").is_err());
    }
}
