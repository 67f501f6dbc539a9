//! Local file names for the archive and its checksum sidecar.
//!
//! Both are derived from the last path segment of the archive URL, so a cache
//! directory populated by hand (or by a previous online run) lines up with the
//! names the fetcher looks for.

/// Fallback when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Suffix appended to both the archive URL and the archive file name.
pub const SIDECAR_SUFFIX: &str = ".sha256";

/// Longest file name accepted by common filesystems.
const NAME_MAX: usize = 255;

/// Archive file name: last non-empty URL path segment (query and fragment ignored),
/// made safe for the local filesystem.
pub fn archive_file_name(url: &str) -> String {
    let candidate = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
    });

    let raw = match candidate {
        Some(c) => c,
        None => return DEFAULT_FILENAME.to_string(),
    };

    let decoded = percent_decode(&raw);
    let sanitized = sanitize_file_name(&decoded);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// URL of the checksum sidecar published next to the archive.
pub fn sidecar_url(archive_url: &str) -> String {
    format!("{}{}", archive_url, SIDECAR_SUFFIX)
}

pub fn sidecar_file_name(archive_name: &str) -> String {
    format!("{}{}", archive_name, SIDECAR_SUFFIX)
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Replaces path separators, control and reserved characters with `_`,
/// trims leading/trailing dots and spaces, caps the length.
fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let reserved = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        if reserved || c.is_control() || c.is_whitespace() {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = c == '_';
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_segment() {
        assert_eq!(
            archive_file_name("https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-full.zip"),
            "ffmpeg-release-full.zip"
        );
        assert_eq!(archive_file_name("https://example.com/single"), "single");
    }

    #[test]
    fn ignores_query_and_trailing_slash() {
        assert_eq!(
            archive_file_name("https://example.com/dl/file.zip?token=abc#frag"),
            "file.zip"
        );
        assert_eq!(archive_file_name("https://example.com/dl/file.zip/"), "file.zip");
    }

    #[test]
    fn root_or_unparseable_falls_back() {
        assert_eq!(archive_file_name("https://example.com/"), "download.bin");
        assert_eq!(archive_file_name("https://example.com"), "download.bin");
        assert_eq!(archive_file_name("not a url"), "download.bin");
        assert_eq!(archive_file_name("https://example.com/.."), "download.bin");
    }

    #[test]
    fn decodes_and_sanitizes() {
        assert_eq!(
            archive_file_name("https://example.com/ffmpeg%20build%3Av7.zip"),
            "ffmpeg_build_v7.zip"
        );
        assert_eq!(archive_file_name("https://example.com/a%2Fb.zip"), "a_b.zip");
    }

    #[test]
    fn sidecar_names() {
        let url = "https://example.com/builds/ffmpeg.zip";
        assert_eq!(sidecar_url(url), "https://example.com/builds/ffmpeg.zip.sha256");
        assert_eq!(sidecar_file_name(&archive_file_name(url)), "ffmpeg.zip.sha256");
    }
}
