//! Incremental parsing of the response head curl hands to the header callback.

/// `Content-Range` of a 206 or 416 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentRange {
    /// `bytes START-END/TOTAL` (`TOTAL` may be `*`).
    Bytes { start: u64, end: u64, total: Option<u64> },
    /// `bytes */TOTAL`, sent with 416.
    Unsatisfied { total: u64 },
}

/// Status and length headers of the most recent response.
///
/// curl reports the heads of redirect hops and interim responses too; each
/// status line starts over so only the final response survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub content_range: Option<ContentRange>,
}

impl ResponseHead {
    /// Feed one raw header line (terminator included or not).
    pub fn feed(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if let Some(code) = parse_status_line(line) {
            *self = ResponseHead {
                status: Some(code),
                ..Default::default()
            };
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    self.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("content-range") {
                self.content_range = parse_content_range(value);
            }
        }
    }

    /// Size the file should reach once the body arrives in full, when the head says so.
    /// `base` is the number of bytes already on disk before the body.
    pub fn expected_total(&self, base: u64) -> Option<u64> {
        match self.content_range {
            Some(ContentRange::Bytes { total: Some(total), .. }) => Some(total),
            Some(ContentRange::Bytes { end, .. }) => Some(end + 1),
            _ => self.content_length.map(|len| base + len),
        }
    }
}

/// Status code from `HTTP/1.1 206 Partial Content` or `HTTP/2 200`.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.split_whitespace();
    let _version = parts.next()?;
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}

pub(crate) fn parse_content_range(value: &str) -> Option<ContentRange> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = spec.split_once('/')?;
    let total = total.trim();
    let range = range.trim();
    if range == "*" {
        return Some(ContentRange::Unsatisfied { total: total.parse().ok()? });
    }
    let (start, end) = range.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    if end < start {
        return None;
    }
    let total = if total == "*" { None } else { Some(total.parse().ok()?) };
    Some(ContentRange::Bytes { start, end, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        assert_eq!(parse_status_line("HTTP/1.1 206 Partial Content"), Some(206));
        assert_eq!(parse_status_line("HTTP/2 200"), Some(200));
        assert_eq!(parse_status_line("HTTP/1.0 416 Range Not Satisfiable\r\n"), Some(416));
        assert_eq!(parse_status_line("Content-Length: 5"), None);
        assert_eq!(parse_status_line("HTTP/1.1 20 short"), None);
    }

    #[test]
    fn content_ranges() {
        assert_eq!(
            parse_content_range("bytes 100-199/200"),
            Some(ContentRange::Bytes { start: 100, end: 199, total: Some(200) })
        );
        assert_eq!(
            parse_content_range("bytes 0-9/*"),
            Some(ContentRange::Bytes { start: 0, end: 9, total: None })
        );
        assert_eq!(
            parse_content_range("bytes */4096"),
            Some(ContentRange::Unsatisfied { total: 4096 })
        );
        assert_eq!(parse_content_range("bytes 9-3/10"), None);
        assert_eq!(parse_content_range("items 0-1/2"), None);
    }

    #[test]
    fn redirect_head_is_replaced() {
        let mut head = ResponseHead::default();
        for line in [
            "HTTP/1.1 302 Found\r\n",
            "Location: /real\r\n",
            "Content-Length: 17\r\n",
            "\r\n",
            "HTTP/1.1 206 Partial Content\r\n",
            "Content-Range: bytes 10-19/20\r\n",
            "Content-Length: 10\r\n",
            "\r\n",
        ] {
            head.feed(line);
        }
        assert_eq!(head.status, Some(206));
        assert_eq!(head.content_length, Some(10));
        assert_eq!(head.expected_total(10), Some(20));
    }

    #[test]
    fn expected_total_from_length() {
        let mut head = ResponseHead::default();
        head.feed("HTTP/1.1 200 OK");
        head.feed("content-length: 64");
        assert_eq!(head.expected_total(0), Some(64));
        head.content_length = None;
        assert_eq!(head.expected_total(0), None);
    }
}
