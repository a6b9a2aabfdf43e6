//! Filename sanitization and extension handling for resolved output paths.

/// Replaces path-unsafe characters and collapses separator runs.
///
/// Slashes, Windows-reserved punctuation, whitespace, and control characters
/// all map to `_`; consecutive replacements collapse to a single `_` and
/// leading/trailing separators are trimmed. An all-unsafe input yields an
/// empty string, which callers treat as "no usable name".
#[must_use]
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Appends `ext` (without a leading dot) unless the name already ends with it.
///
/// The comparison is case-insensitive, so `Clip.MP4` keeps its name when the
/// chosen extension is `mp4`.
#[must_use]
pub fn ensure_extension(name: &str, ext: &str) -> String {
    let suffix = format!(".{}", ext.to_lowercase());
    if name.to_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}.{ext}")
    }
}

/// Extracts the lowercase extension of a URL path, ignoring any query string.
#[must_use]
pub fn url_path_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let dot = last.rfind('.')?;
    let ext = &last[dot + 1..];
    if ext.is_empty() || ext.len() > 8 {
        return None;
    }
    Some(ext.to_lowercase())
}
