use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::address::cleanup_url;

fn markdown_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\((https?://[^)]+)\)").expect("static regex"))
}

/// Snapshot of the corpus: cleaned source address -> document identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusIndex {
    entries: BTreeMap<String, String>,
}

impl CorpusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document. The address is query-stripped before it is stored.
    pub fn insert(&mut self, url: &str, document_id: impl Into<String>) {
        self.entries.insert(cleanup_url(url), document_id.into());
    }

    pub fn lookup(&self, url: &str) -> Option<&str> {
        self.entries.get(&cleanup_url(url)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewrite {
    pub text: String,
    pub internal: usize,
    pub external: usize,
}

/// Rewrite `[text](http…)` links: known documents become `[[id]]`
/// cross-references, everything else keeps its text with a query-stripped address.
pub fn rewrite_links(body: &str, index: &CorpusIndex) -> LinkRewrite {
    let mut internal = 0;
    let mut external = 0;
    let text = markdown_link()
        .replace_all(body, |caps: &Captures| {
            let url = cleanup_url(&caps[2]);
            match index.lookup(&url) {
                Some(document_id) => {
                    internal += 1;
                    format!("[[{document_id}]]")
                }
                None => {
                    external += 1;
                    format!("[{}]({})", &caps[1], url)
                }
            }
        })
        .into_owned();
    LinkRewrite {
        text,
        internal,
        external,
    }
}
