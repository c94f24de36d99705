//! Recognized media extensions and the content type sent with each upload

use std::path::Path;

/// Lower-case extension → MIME type for every format the library accepts
const MEDIA_TYPES: &[(&str, &str)] = &[
    // Photos
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("avif", "image/avif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/x-icon"),
    // RAW
    ("dng", "image/x-adobe-dng"),
    ("cr2", "image/x-canon-cr2"),
    ("crw", "image/x-canon-crw"),
    ("nef", "image/x-nikon-nef"),
    ("nrw", "image/x-nikon-nrw"),
    ("arw", "image/x-sony-arw"),
    ("orf", "image/x-olympus-orf"),
    ("raf", "image/x-fuji-raf"),
    ("rw2", "image/x-panasonic-rw2"),
    // Videos
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("wmv", "video/x-ms-wmv"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("mts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
    ("3gp", "video/3gpp"),
    ("3g2", "video/3gpp2"),
    ("webm", "video/webm"),
];

/// Fallback for files uploaded explicitly with an unknown extension
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn lookup(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Whether the file extension is on the media allow-list (case-insensitive)
pub fn is_media_file(path: &Path) -> bool {
    lookup(path).is_some()
}

/// Content-type hint for the staging request
pub fn content_type(path: &Path) -> &'static str {
    lookup(path).unwrap_or(DEFAULT_CONTENT_TYPE)
}
