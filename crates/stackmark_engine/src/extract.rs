use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use stackmark_core::{cleanup_url, normalize_markdown, normalize_tags, publication_from_url, slugify};
use url::Url;

use crate::convert::MarkdownConverter;
use crate::error::ExtractError;
use crate::types::ArticleMetadata;

const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting"];

/// Paragraphs shorter than this do not vote for a content container.
const MIN_PARAGRAPH_CHARS: usize = 25;

const NEGATIVE_HINTS: &[&str] = &[
    "comment", "footer", "sidebar", "share", "subscribe", "nav", "related", "promo", "banner",
    "paywall", "button",
];
const POSITIVE_HINTS: &[&str] = &["article", "body", "content", "post", "entry", "markup"];

#[derive(Clone)]
struct Selectors {
    ld_json: Selector,
    meta: Selector,
    h1: Selector,
    h3_subtitle: Selector,
    h3: Selector,
    title: Selector,
    video: Selector,
    paragraph: Selector,
    article: Selector,
    body: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            ld_json: Selector::parse(r#"script[type="application/ld+json"]"#)
                .expect("ld+json selector"),
            meta: Selector::parse("meta").expect("meta selector"),
            h1: Selector::parse("h1").expect("h1 selector"),
            h3_subtitle: Selector::parse("h3.subtitle").expect("subtitle selector"),
            h3: Selector::parse("h3").expect("h3 selector"),
            title: Selector::parse("title").expect("title selector"),
            video: Selector::parse("video[src], video source[src]").expect("video selector"),
            paragraph: Selector::parse("p").expect("paragraph selector"),
            article: Selector::parse("article").expect("article selector"),
            body: Selector::parse("body").expect("body selector"),
        }
    }
}

/// Turns captured page markup into metadata and a normalized Markdown body.
///
/// Pure: the same address, markup and retrieval time always produce the
/// same output.
#[derive(Clone)]
pub struct ContentExtractor {
    selectors: Selectors,
    converter: MarkdownConverter,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            selectors: Selectors::new(),
            converter: MarkdownConverter::new(),
        }
    }

    pub fn extract(
        &self,
        url: &str,
        html: &str,
        retrieved: DateTime<Utc>,
    ) -> Result<(ArticleMetadata, String), ExtractError> {
        let base = Url::parse(url).map_err(|_| ExtractError::InvalidAddress(url.to_string()))?;
        if base.host_str().is_none() {
            return Err(ExtractError::InvalidAddress(url.to_string()));
        }
        if html.trim().is_empty() {
            return Err(ExtractError::EmptyDocument);
        }

        let doc = Html::parse_document(html);
        let ld_blocks = self.ld_blocks(&doc);
        let ld = ld_blocks.iter().find_map(find_article);
        let metas = collect_metas(&doc, &self.selectors.meta);
        let meta = |key: &str| metas.get(key).cloned();

        let title = ld
            .and_then(|v| v.get("headline"))
            .and_then(Value::as_str)
            .map(clean_text)
            .filter(|t| !t.is_empty())
            .or_else(|| first_text(&doc, &self.selectors.h1))
            .or_else(|| meta("og:title"))
            .or_else(|| first_text(&doc, &self.selectors.title))
            .unwrap_or_default();

        let subtitle = first_text(&doc, &self.selectors.h3_subtitle)
            .or_else(|| first_text(&doc, &self.selectors.h3))
            .unwrap_or_default();

        let author = ld
            .and_then(|v| v.get("author"))
            .and_then(author_name)
            .or_else(|| meta("author"))
            .unwrap_or_default();

        let published = ld
            .and_then(|v| v.get("datePublished"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| meta("article:published_time"))
            .and_then(|raw| parse_date(&raw))
            .unwrap_or_else(|| retrieved.date_naive());

        let updated = ld
            .and_then(|v| v.get("dateModified"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| meta("article:modified_time"))
            .and_then(|raw| parse_date(&raw));

        let image = ld
            .and_then(|v| v.get("image"))
            .and_then(image_url)
            .or_else(|| meta("og:image"));

        let mut raw_tags: Vec<String> = meta("keywords")
            .map(|k| k.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        raw_tags.extend(
            doc.select(&self.selectors.meta)
                .filter(|m| m.value().attr("property") == Some("article:tag"))
                .filter_map(|m| m.value().attr("content"))
                .map(str::to_string),
        );
        let tags = normalize_tags(raw_tags);

        let video_url = doc
            .select(&self.selectors.video)
            .filter_map(|v| v.value().attr("src"))
            .find_map(|src| base.join(src.trim()).ok())
            .map(String::from);

        let slug = path_slug(&base)
            .or_else(|| Some(slugify(&title)).filter(|s| !s.is_empty()))
            .ok_or(ExtractError::Unnameable)?;

        let content = self.main_content(&doc);
        let markdown = self.converter.convert_element(content, Some(&base));

        let metadata = ArticleMetadata {
            title,
            subtitle,
            author,
            publication: publication_from_url(url),
            published,
            updated,
            retrieved,
            url: cleanup_url(url),
            slug,
            image,
            tags,
            video_url,
        };
        Ok((metadata, normalize_markdown(&markdown)))
    }

    fn ld_blocks(&self, doc: &Html) -> Vec<Value> {
        doc.select(&self.selectors.ld_json)
            .filter_map(|script| {
                let raw: String = script.text().collect();
                serde_json::from_str::<Value>(raw.trim()).ok()
            })
            .collect()
    }

    /// Readability-style pick of the element holding the article text.
    fn main_content<'a>(&self, doc: &'a Html) -> ElementRef<'a> {
        let mut scores: HashMap<NodeId, f64> = HashMap::new();
        for paragraph in doc.select(&self.selectors.paragraph) {
            let text: String = paragraph.text().collect();
            let text = text.trim();
            let chars = text.chars().count();
            if chars < MIN_PARAGRAPH_CHARS {
                continue;
            }
            let commas = text.matches(',').count() as f64;
            let score = 1.0 + commas + (chars / 100).min(3) as f64;

            let parent = paragraph.parent().and_then(ElementRef::wrap);
            let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);
            for (candidate, share) in [(parent, 1.0), (grandparent, 0.5)] {
                let Some(candidate) = candidate else {
                    continue;
                };
                *scores
                    .entry(candidate.id())
                    .or_insert_with(|| class_weight(candidate)) += score * share;
            }
        }

        scores
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .and_then(|(id, _)| doc.tree.get(id))
            .and_then(ElementRef::wrap)
            .or_else(|| doc.select(&self.selectors.article).next())
            .or_else(|| doc.select(&self.selectors.body).next())
            .unwrap_or_else(|| doc.root_element())
    }
}

fn find_article(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_article),
        Value::Object(map) => {
            let typed = match map.get("@type") {
                Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
                Some(Value::Array(types)) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|t| ARTICLE_TYPES.contains(&t)),
                _ => false,
            };
            if typed {
                Some(value)
            } else {
                map.get("@graph").and_then(find_article)
            }
        }
        _ => None,
    }
}

fn author_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(clean_text(name)),
        Value::Object(map) => map.get("name").and_then(author_name),
        Value::Array(items) => items.first().and_then(author_name),
        _ => None,
    }
    .filter(|name| !name.is_empty())
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => Some(url.trim().to_string()),
        Value::Object(map) => map.get("url").and_then(image_url),
        Value::Array(items) => items.first().and_then(image_url),
        _ => None,
    }
    .filter(|url| !url.is_empty())
}

/// `name=` and `property=` metas, first occurrence wins.
fn collect_metas(doc: &Html, selector: &Selector) -> HashMap<String, String> {
    let mut metas = HashMap::new();
    for meta in doc.select(selector) {
        let element = meta.value();
        let Some(key) = element.attr("property").or_else(|| element.attr("name")) else {
            continue;
        };
        let Some(content) = element.attr("content").map(str::trim) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        metas
            .entry(key.to_ascii_lowercase())
            .or_insert_with(|| content.to_string());
    }
    metas
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .map(|e| clean_text(&e.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn class_weight(element: ElementRef) -> f64 {
    let hints = format!(
        "{} {}",
        element.value().attr("class").unwrap_or(""),
        element.value().attr("id").unwrap_or("")
    )
    .to_ascii_lowercase();
    let mut weight = 0.0;
    if NEGATIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight -= 25.0;
    }
    if POSITIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight += 25.0;
    }
    weight
}

fn path_slug(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(slugify)
        .filter(|slug| !slug.is_empty())
}

/// Accepts `YYYY-MM-DD` and ISO date-times with optional fraction and offset.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    let with_offset = match raw.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => raw.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_str(&with_offset, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
