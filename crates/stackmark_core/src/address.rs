use std::collections::BTreeMap;

use url::Url;

/// Publication label used when an address carries no host.
const FALLBACK_PUBLICATION: &str = "substack";

/// Drop the query component of an address, keeping everything else verbatim.
///
/// Idempotent, and the identity on addresses that have no `?`.
pub fn cleanup_url(url: &str) -> String {
    let Some(query_start) = url.find('?') else {
        return url.to_string();
    };
    let fragment = url[query_start..]
        .find('#')
        .map(|offset| &url[query_start + offset..])
        .unwrap_or("");
    format!("{}{}", &url[..query_start], fragment)
}

/// The host label before the first `.`, e.g. `example` for `example.substack.com`.
pub fn publication_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .and_then(|host| host.split('.').next().map(str::to_string))
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| FALLBACK_PUBLICATION.to_string())
}

/// Directory name for a publication: an explicit mapping wins, otherwise the
/// label is title-cased with spaces turned into underscores.
pub fn publication_label(publication: &str, mappings: &BTreeMap<String, String>) -> String {
    if let Some(mapped) = mappings.get(publication) {
        return mapped.clone();
    }
    title_case(publication).replace(' ', "_")
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if after_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(ch);
            after_letter = false;
        }
    }
    out
}

/// Split a newline-separated address list, skipping blank lines and `#` comments.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}
