use chrono::SecondsFormat;
use serde::Serialize;
use serde_yaml::Value;

use crate::types::ArticleRecord;

const FENCE: &str = "---";

/// Header keys in written order.
#[derive(Debug, Serialize)]
struct HeaderFields<'a> {
    title: &'a str,
    subtitle: &'a str,
    author: &'a str,
    publication: &'a str,
    published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<String>,
    retrieved: String,
    url: &'a str,
    canonical: &'a str,
    slug: &'a str,
    tags: &'a [String],
    image: &'a str,
    video_url: &'a str,
    links_internal: usize,
    links_external: usize,
    source: String,
}

impl<'a> HeaderFields<'a> {
    fn from_record(record: &'a ArticleRecord) -> Self {
        let meta = &record.metadata;
        Self {
            title: &meta.title,
            subtitle: &meta.subtitle,
            author: &meta.author,
            publication: &meta.publication,
            published: meta.published.format("%Y-%m-%d").to_string(),
            updated: meta.updated.map(|d| d.format("%Y-%m-%d").to_string()),
            retrieved: meta.retrieved.to_rfc3339_opts(SecondsFormat::Secs, true),
            url: &meta.url,
            canonical: &meta.url,
            slug: &meta.slug,
            tags: &meta.tags,
            image: meta.image.as_deref().unwrap_or(""),
            video_url: meta.video_url.as_deref().unwrap_or(""),
            links_internal: record.links_internal,
            links_external: record.links_external,
            source: format!("stackmark {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Renders the header block followed by the body.
pub fn render_document(record: &ArticleRecord) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(&HeaderFields::from_record(record))?;
    Ok(format!(
        "{FENCE}\n{yaml}{FENCE}\n\n{}\n",
        record.body.trim_end()
    ))
}

/// Text between the opening fence and the closing fence, if both are present.
fn split_header(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let (first, rest) = content.split_once('\n')?;
    if first.trim_end() != FENCE {
        return None;
    }
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let bare = line.trim_end();
        if bare == FENCE || bare == "..." {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

/// The leading header block parsed as a YAML mapping.
///
/// Returns `None` when the fences are missing or the block is not a mapping.
pub fn parse_header(content: &str) -> Option<Value> {
    let block = split_header(content)?;
    serde_yaml::from_str::<Value>(block)
        .ok()
        .filter(Value::is_mapping)
}

/// The `url` field of the header, when it is a non-empty string.
pub fn header_url(content: &str) -> Option<String> {
    parse_header(content)?
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
