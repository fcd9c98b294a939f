use pretty_assertions::assert_eq;
use stackmark_core::{rewrite_links, CorpusIndex};

fn index() -> CorpusIndex {
    let mut index = CorpusIndex::new();
    index.insert(
        "https://example.substack.com/p/known-post?utm_source=x",
        "2024-01-02-known-post",
    );
    index
}

#[test]
fn known_links_become_cross_references() {
    let body = "See [this earlier post](https://example.substack.com/p/known-post?ref=feed).";
    let rewrite = rewrite_links(body, &index());

    assert_eq!(rewrite.text, "See [[2024-01-02-known-post]].");
    assert_eq!(rewrite.internal, 1);
    assert_eq!(rewrite.external, 0);
}

#[test]
fn unknown_links_keep_text_with_clean_address() {
    let body = "Read [the paper](https://arxiv.org/abs/1234?context=cs) now.";
    let rewrite = rewrite_links(body, &index());

    assert_eq!(rewrite.text, "Read [the paper](https://arxiv.org/abs/1234) now.");
    assert_eq!(rewrite.internal, 0);
    assert_eq!(rewrite.external, 1);
}

#[test]
fn counts_always_cover_every_scanned_link() {
    let body = "\
[a](https://example.substack.com/p/known-post)
[b](https://other.com/x)
[c](http://other.com/y?q=1) and [d](https://example.substack.com/p/known-post#section)
[not a link](/relative/path) stays as-is";
    let rewrite = rewrite_links(body, &index());

    assert_eq!(rewrite.internal + rewrite.external, 4);
    assert_eq!(rewrite.internal, 1);
    assert!(rewrite.text.contains("[not a link](/relative/path)"));
}

#[test]
fn empty_index_leaves_everything_external() {
    let body = "[x](https://example.substack.com/p/known-post)";
    let rewrite = rewrite_links(body, &CorpusIndex::new());
    assert_eq!(rewrite.text, body);
    assert_eq!(rewrite.external, 1);
}
