//! Content type inference for served files.
//!
//! Two independent rules are used:
//! - `/edit` downloads sniff the leading bytes and answer either
//!   `text/plain` or `application/octet-stream` ([`ContentKind`]).
//! - Static serving maps the file extension to a MIME type ([`mime_for_path`]).

use std::path::Path;

/// Number of leading bytes inspected by [`ContentKind::sniff`].
pub const SNIFF_LEN: usize = 1024;

/// Text/binary classification of file content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Printable ASCII plus CR, LF and TAB only
    Text,
    /// Anything else
    Binary,
}

impl ContentKind {
    /// Classify content by its first [`SNIFF_LEN`] bytes.
    ///
    /// # Examples
    /// ```
    /// use capture_server::content_type::ContentKind;
    ///
    /// assert_eq!(ContentKind::sniff(b"hello\r\n\tworld"), ContentKind::Text);
    /// assert_eq!(ContentKind::sniff(b"PK\x03\x04"), ContentKind::Binary);
    /// ```
    pub fn sniff(data: &[u8]) -> Self {
        let head = &data[..data.len().min(SNIFF_LEN)];
        if head.iter().all(|&b| is_text_byte(b)) {
            ContentKind::Text
        } else {
            ContentKind::Binary
        }
    }

    /// MIME type sent for this kind.
    pub fn to_mime(self) -> &'static str {
        match self {
            ContentKind::Text => "text/plain",
            ContentKind::Binary => "application/octet-stream",
        }
    }
}

fn is_text_byte(byte: u8) -> bool {
    (32..128).contains(&byte) || matches!(byte, b'\r' | b'\n' | b'\t')
}

/// Guess the MIME type of a static file from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "css" => "text/css",
        "html" | "htm" => "text/html",
        "gif" => "image/gif",
        "jpeg" | "jpg" => "image/jpeg",
        "js" => "text/javascript",
        "json" => "application/json",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "txt" | "csv" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_text() {
        assert_eq!(ContentKind::sniff(b""), ContentKind::Text);
        assert_eq!(
            ContentKind::sniff(b"key = value\r\nother\t= 1\n~"),
            ContentKind::Text
        );
    }

    #[test]
    fn test_sniff_control_bytes() {
        assert_eq!(ContentKind::sniff(b"abc\0def"), ContentKind::Binary);
        assert_eq!(ContentKind::sniff(b"bell\x07"), ContentKind::Binary);
        assert_eq!(ContentKind::sniff(b"\x1b[0m"), ContentKind::Binary);
    }

    #[test]
    fn test_sniff_high_bytes() {
        assert_eq!(ContentKind::sniff(&[0x80]), ContentKind::Binary);
        assert_eq!(ContentKind::sniff("caf\u{e9}".as_bytes()), ContentKind::Binary);
        assert_eq!(ContentKind::sniff(&[b'a', 0xff]), ContentKind::Binary);
    }

    #[test]
    fn test_sniff_only_inspects_prefix() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0);
        assert_eq!(ContentKind::sniff(&data), ContentKind::Text);

        data[SNIFF_LEN - 1] = 0;
        assert_eq!(ContentKind::sniff(&data), ContentKind::Binary);
    }

    #[test]
    fn test_to_mime() {
        assert_eq!(ContentKind::Text.to_mime(), "text/plain");
        assert_eq!(ContentKind::Binary.to_mime(), "application/octet-stream");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("index.html")), "text/html");
        assert_eq!(mime_for_path(Path::new("a/B.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("app.js")), "text/javascript");
        assert_eq!(mime_for_path(Path::new("capture.raw")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("Makefile")), "application/octet-stream");
    }
}
