use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

/// Link text used for images that carry no alt text.
const IMAGE_PLACEHOLDER: &str = "image";

/// Elements removed together with everything inside them.
const DROPPED: &[&str] = &[
    "header", "footer", "aside", "script", "style", "noscript", "template", "svg", "form",
    "button",
];

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Converts an article body to Markdown.
///
/// A pass over the parsed tree first rewrites media as plain hyperlinks:
/// images and inline frames become anchors, figure captions trail the link
/// in emphasis, relative targets are resolved and page chrome is dropped.
/// `html2md` renders the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

impl MarkdownConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn convert(&self, html: &str, base_url: Option<&str>) -> String {
        let fragment = Html::parse_fragment(html);
        let base_url = base_url.and_then(|b| Url::parse(b).ok());
        self.convert_element(fragment.root_element(), base_url.as_ref())
    }

    /// Converts the children of an already parsed element.
    pub fn convert_element(&self, element: ElementRef, base_url: Option<&Url>) -> String {
        let prepared = flatten_media(element, base_url);
        html2md::parse_html(&prepared).trim().to_string()
    }
}

/// Re-serializes the children of `element` with media rewritten as links.
fn flatten_media(element: ElementRef, base: Option<&Url>) -> String {
    let mut out = String::new();
    for child in element.children() {
        write_node(child, base, &mut out);
    }
    out
}

fn write_node(node: NodeRef<'_, Node>, base: Option<&Url>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                write_element(element, base, out);
            }
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, base, out);
            }
        }
        _ => {}
    }
}

fn write_element(element: ElementRef, base: Option<&Url>, out: &mut String) {
    let name = element.value().name().to_ascii_lowercase();
    match name.as_str() {
        tag if DROPPED.contains(&tag) => {}
        "a" => write_anchor(element, base, out),
        "img" => out.push_str(&image_link(element, base)),
        "iframe" => {
            if let Some(link) = embed_link(element, base) {
                out.push_str("<p>");
                out.push_str(&link);
                out.push_str("</p>");
            }
        }
        "figure" => write_figure(element, base, out),
        _ => {
            out.push('<');
            out.push_str(&name);
            for (attr, value) in element.value().attrs() {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID.contains(&name.as_str()) {
                return;
            }
            write_children(element, base, out);
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
    }
}

fn write_children(element: ElementRef, base: Option<&Url>, out: &mut String) {
    for child in element.children() {
        write_node(child, base, out);
    }
}

/// Anchors wrapping media, or with no usable target, give way to their content.
fn write_anchor(element: ElementRef, base: Option<&Url>, out: &mut String) {
    let contains_media = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| matches!(e.value().name(), "img" | "iframe" | "figure"));
    let target = element
        .value()
        .attr("href")
        .and_then(|href| resolve_url(href, base));
    match target {
        Some(url) if !contains_media => {
            out.push_str("<a href=\"");
            out.push_str(&escape_attr(url.as_str()));
            out.push_str("\">");
            write_children(element, base, out);
            out.push_str("</a>");
        }
        _ => write_children(element, base, out),
    }
}

fn write_figure(element: ElementRef, base: Option<&Url>, out: &mut String) {
    let mut media = None;
    let mut caption = String::new();
    for descendant in element.descendants().filter_map(ElementRef::wrap) {
        match descendant.value().name() {
            "img" if media.is_none() => media = Some(image_link(descendant, base)),
            "iframe" if media.is_none() => media = embed_link(descendant, base),
            "figcaption" if caption.is_empty() => caption = collapse(descendant.text()),
            _ => {}
        }
    }
    if media.is_none() && caption.is_empty() {
        return;
    }
    out.push_str("<p>");
    if let Some(link) = &media {
        out.push_str(link);
    }
    if !caption.is_empty() {
        if media.is_some() {
            out.push(' ');
        }
        out.push_str("<em>");
        out.push_str(&escape_text(&caption));
        out.push_str("</em>");
    }
    out.push_str("</p>");
}

/// An anchor to the image source, or `[alt]()` text when no source survives.
fn image_link(element: ElementRef, base: Option<&Url>) -> String {
    let attrs = element.value();
    let label = attrs
        .attr("alt")
        .map(|a| collapse(std::iter::once(a)))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string());
    let target = attrs
        .attr("src")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            attrs
                .attr("srcset")
                .and_then(|set| set.split(',').next())
                .and_then(|candidate| candidate.split_whitespace().next())
        })
        .or_else(|| attrs.attr("data-src"))
        .and_then(|src| resolve_url(src, base));
    match target {
        Some(url) => anchor(url.as_str(), &label),
        None => escape_text(&format!("[{label}]()")),
    }
}

fn embed_link(element: ElementRef, base: Option<&Url>) -> Option<String> {
    let url = resolve_url(element.value().attr("src")?, base)?;
    let label = element
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string());
    Some(anchor(url.as_str(), &label))
}

fn anchor(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_attr(href), escape_text(label))
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(html: &str, base: Option<&str>) -> String {
        let fragment = Html::parse_fragment(html);
        let base = base.and_then(|b| Url::parse(b).ok());
        flatten_media(fragment.root_element(), base.as_ref())
    }

    #[test]
    fn images_become_anchors() {
        assert_eq!(
            flatten(r#"<p><img src="/a.png" alt=" A  chart "></p>"#, Some("https://x.substack.com/p/y")),
            r#"<p><a href="https://x.substack.com/a.png">A chart</a></p>"#
        );
        assert_eq!(
            flatten(r#"<img srcset="https://cdn.x/1.png 1x, https://cdn.x/2.png 2x">"#, None),
            r#"<a href="https://cdn.x/1.png">image</a>"#
        );
        assert_eq!(
            flatten(r#"<img data-src="https://cdn.x/lazy.png" alt="Lazy">"#, None),
            r#"<a href="https://cdn.x/lazy.png">Lazy</a>"#
        );
    }

    #[test]
    fn sourceless_image_keeps_its_alt_text() {
        assert_eq!(flatten(r#"<img alt="Lost">"#, None), "[Lost]()");
        assert_eq!(flatten("<img>", None), "[image]()");
    }

    #[test]
    fn figures_trail_their_caption() {
        assert_eq!(
            flatten(
                r#"<figure><a href="https://cdn.x/full.png"><img src="https://cdn.x/c.png" alt="Chart"></a><figcaption>By <b>year</b></figcaption></figure>"#,
                None
            ),
            r#"<p><a href="https://cdn.x/c.png">Chart</a> <em>By year</em></p>"#
        );
    }

    #[test]
    fn iframes_link_by_title_or_address() {
        assert_eq!(
            flatten(r#"<iframe src="https://www.youtube.com/embed/xyz"></iframe>"#, None),
            r#"<p><a href="https://www.youtube.com/embed/xyz">https://www.youtube.com/embed/xyz</a></p>"#
        );
        assert_eq!(
            flatten(r#"<iframe title="Talk" src="https://v.x/1"></iframe><iframe></iframe>"#, None),
            r#"<p><a href="https://v.x/1">Talk</a></p>"#
        );
    }

    #[test]
    fn chrome_is_dropped_and_anchors_resolved() {
        assert_eq!(
            flatten(
                r##"<header>Nav</header><p class="x">See <a href="/p/o" title="t">this</a> &amp; <a href="#top">that</a></p><aside>Share</aside><footer>Bye</footer>"##,
                Some("https://x.substack.com/p/y")
            ),
            r#"<p class="x">See <a href="https://x.substack.com/p/o">this</a> &amp; that</p>"#
        );
    }

    #[test]
    fn rendered_links_are_markdown() {
        let md = MarkdownConverter::new().convert(
            r#"<p>See <a href="/p/other">the other post</a>.</p><p><img src="/i.png" alt="Pic"></p>"#,
            Some("https://example.substack.com/p/hello"),
        );
        assert!(
            md.contains("See [the other post](https://example.substack.com/p/other)."),
            "{md}"
        );
        assert!(md.contains("[Pic](https://example.substack.com/i.png)"), "{md}");
        assert!(!md.contains("!["), "{md}");
    }
}
