//! Content-type inference from key extensions.

/// MIME type for a storage key, matched case-insensitively on the extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type_for_key("videos/clip.mp4"), "video/mp4");
        assert_eq!(content_type_for_key("clip.webm"), "video/webm");
        assert_eq!(content_type_for_key("clip.MOV"), "video/quicktime");
        assert_eq!(content_type_for_key("thumbnails/clip.jpg"), "image/jpeg");
        assert_eq!(content_type_for_key("thumbnails/clip.JPEG"), "image/jpeg");
        assert_eq!(
            content_type_for_key("hls/clip/clip_master.m3u8"),
            "application/vnd.apple.mpegurl"
        );
        assert_eq!(content_type_for_key("hls/clip/clip_720p_000.ts"), "video/mp2t");
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(content_type_for_key("exports/data.json"), "application/octet-stream");
        assert_eq!(content_type_for_key("no_extension"), "application/octet-stream");
    }
}
