//! MIME type detection for uploaded images.
//!
//! Used to label stored blobs when the client did not declare a content type.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png"                   => "image/png",
        "gif"                   => "image/gif",
        "webp"                  => "image/webp",
        "bmp"                   => "image/bmp",
        "ico"                   => "image/x-icon",
        "tiff" | "tif"          => "image/tiff",
        "heic"                  => "image/heic",
        "avif"                  => "image/avif",
        "svg"                   => "image/svg+xml",
        "pdf"                   => "application/pdf",
        _                       => "application/octet-stream",
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_image_types() {
        assert_eq!(detect_mime_type(Path::new("cat.PNG")), "image/png");
        assert_eq!(detect_mime_type(Path::new("my photo!.jpeg")), "image/jpeg");
        assert_eq!(detect_mime_type(Path::new("scan.tif")), "image/tiff");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let mime = detect_mime_type(Path::new("upload"));
        assert_eq!(mime, "application/octet-stream");
        assert!(!is_image(mime));
        assert!(is_image(detect_mime_type(Path::new("a.webp"))));
    }
}
