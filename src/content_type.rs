//! Suffix-based content type resolution.
//!
//! Pure mapping from a file-name suffix to a MIME type string. No I/O and no
//! error conditions: anything unrecognized falls back to `text/plain`, and a
//! request that explicitly asks to be treated as a download forces
//! `application/octet-stream` regardless of suffix.

/// Resolve the MIME type for `path`.
///
/// `download` reflects the request's `download` argument; when set the
/// resolved type is always `application/octet-stream`.
pub fn content_type_for(path: &str, download: bool) -> &'static str {
    if download {
        return "application/octet-stream";
    }
    match suffix(path) {
        Some("htm") | Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("xml") => "text/xml",
        Some("pdf") => "application/x-pdf",
        Some("zip") => "application/x-zip",
        Some("gz") => "application/x-gzip",
        _ => "text/plain",
    }
}

fn suffix(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_suffixes_resolve() {
        assert_eq!(content_type_for("/index.html", false), "text/html");
        assert_eq!(content_type_for("/index.htm", false), "text/html");
        assert_eq!(content_type_for("/app.js", false), "application/javascript");
        assert_eq!(content_type_for("/style.css", false), "text/css");
        assert_eq!(content_type_for("/logo.png", false), "image/png");
        assert_eq!(content_type_for("/bundle.gz", false), "application/x-gzip");
    }

    #[test]
    fn unknown_suffix_falls_back_to_text_plain() {
        assert_eq!(content_type_for("/data.bin", false), "text/plain");
        assert_eq!(content_type_for("/noext", false), "text/plain");
    }

    #[test]
    fn download_forces_octet_stream() {
        assert_eq!(
            content_type_for("/index.html", true),
            "application/octet-stream"
        );
    }
}
