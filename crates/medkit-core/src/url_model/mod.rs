//! Cache filename derivation from artifact URLs.

/// Used when the URL has no usable last path segment.
const DEFAULT_FILENAME: &str = "download.bin";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Derives a safe cache filename from the last path segment of `url`.
///
/// Query strings and fragments are ignored. Separators, NUL and control
/// characters become `_`; leading dots are stripped so the file is never
/// hidden or a relative reference.
///
/// # Examples
///
/// - `derive_filename("https://repo.turris.cz/hbs/omnia/medkit/sha256sums")` → `"sha256sums"`
/// - `derive_filename("https://example.com/")` → `"download.bin"`
pub fn derive_filename(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(str::to_string)
    });

    match segment.map(|s| sanitize(&s)) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_start_matches('.').trim_end();

    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
