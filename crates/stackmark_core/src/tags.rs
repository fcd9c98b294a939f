use std::sync::OnceLock;

use regex::Regex;

/// Tag that every normalized collection starts with.
pub const SENTINEL_TAG: &str = "substack";

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Lowercase tags, hyphenate internal whitespace, drop blanks and duplicates
/// (first occurrence wins) and put [`SENTINEL_TAG`] first exactly once.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = vec![SENTINEL_TAG.to_string()];
    for tag in tags {
        let lowered = tag.as_ref().trim().to_lowercase();
        let tag = whitespace_run().replace_all(&lowered, "-").into_owned();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
