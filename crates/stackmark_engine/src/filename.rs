use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// `{root}/{label}/{published}-{slug}.md`
pub fn document_path(root: &Path, label: &str, published: NaiveDate, slug: &str) -> PathBuf {
    root.join(sanitize_component(label)).join(format!(
        "{}-{}.md",
        published.format("%Y-%m-%d"),
        sanitize_component(slug)
    ))
}

/// The captured-markup sidecar that sits next to a document.
pub fn sidecar_path(document: &Path) -> PathBuf {
    document.with_extension("html")
}

/// Makes one path component safe on every platform.
///
/// Separators and other forbidden characters become `-`; an empty result
/// falls back to `untitled`; reserved Windows device names get a suffix.
pub fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '-' } else { c })
        .collect();
    let mut cleaned = cleaned.trim_matches(&[' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
