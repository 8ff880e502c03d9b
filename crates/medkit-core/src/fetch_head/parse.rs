//! Parse HTTP response header lines into HeadResult.

use super::HeadResult;

/// Parse collected header lines. With redirects curl reports every response's
/// headers in order, so a new status line discards what came before it.
pub(crate) fn parse_headers(lines: &[String]) -> HeadResult {
    let mut result = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            result = HeadResult::default();
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => result.content_length = value.parse().ok(),
            "content-type" => result.content_type = Some(value.to_string()),
            "accept-ranges" => {
                result.accept_ranges = value
                    .split(',')
                    .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"))
            }
            "etag" => result.etag = Some(value.trim_matches('"').to_string()),
            "last-modified" => result.last_modified = Some(value.to_string()),
            "content-disposition" => result.content_disposition = Some(value.to_string()),
            _ => {}
        }
    }

    result
}
