use std::sync::OnceLock;

use regex::Regex;

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex"))
}

fn separator_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_-]+").expect("static regex"))
}

/// Lowercase, strip non-word characters, and join words with single hyphens.
///
/// The result never has leading or trailing hyphens and `slugify(slugify(x)) == slugify(x)`.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = non_word().replace_all(&lowered, "");
    let hyphenated = separator_run().replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}
