use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use stackmark_core::{
    cleanup_url, normalize_markdown, normalize_tags, parse_url_list, publication_from_url,
    publication_label, slugify, SENTINEL_TAG,
};

fn init_logging() {
    engine_logging::initialize_for_tests();
}

const SLUG_INPUTS: &[&str] = &[
    "hello-world",
    "  Hello World  ",
    "Why I'm Leaving (Part 2)",
    "__init__",
    "---",
    "Tabs\tand\nnewlines",
    "ÜBER Große Straße",
    "2024: A Year in Review!",
];

#[test]
fn slugs_have_no_whitespace_uppercase_or_edge_hyphens() {
    init_logging();
    for input in SLUG_INPUTS {
        let slug = slugify(input);
        assert!(!slug.chars().any(char::is_whitespace), "{slug:?}");
        assert!(!slug.chars().any(char::is_uppercase), "{slug:?}");
        assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{slug:?}");
        assert_eq!(slugify(&slug), slug, "slugify is not a fixed point for {input:?}");
    }
}

#[test]
fn slug_examples() {
    assert_eq!(slugify("Why I'm Leaving (Part 2)"), "why-im-leaving-part-2");
    assert_eq!(slugify("2024: A Year in Review!"), "2024-a-year-in-review");
    assert_eq!(slugify("---"), "");
}

#[test]
fn tags_are_lowercased_hyphenated_and_deduplicated() {
    let tags = normalize_tags(["Machine Learning", "AI", "machine   learning", " ", "ai"]);
    assert_eq!(tags, vec!["substack", "machine-learning", "ai"]);
}

#[test]
fn sentinel_tag_is_first_exactly_once() {
    let tags = normalize_tags(["news", "Substack", "SUBSTACK"]);
    assert_eq!(tags, vec!["substack", "news"]);
    assert_eq!(normalize_tags(Vec::<String>::new()), vec![SENTINEL_TAG]);
}

#[test]
fn tag_normalization_is_idempotent() {
    let samples: Vec<Vec<&str>> = vec![
        vec![],
        vec!["A B", "a-b", "C"],
        vec!["substack", "x"],
        vec!["x", "substack"],
        vec!["  Spaced   Out  ", "tab\there"],
    ];
    for sample in samples {
        let once = normalize_tags(sample);
        let twice = normalize_tags(&once);
        assert_eq!(once, twice);
        assert_eq!(once.iter().filter(|t| *t == SENTINEL_TAG).count(), 1);
        assert_eq!(once[0], SENTINEL_TAG);
    }
}

#[test]
fn cleanup_strips_query_and_is_idempotent() {
    let cases = [
        (
            "https://example.substack.com/p/hello-world?ref=feed",
            "https://example.substack.com/p/hello-world",
        ),
        ("https://a.com/p/x?utm=1&b=2#notes", "https://a.com/p/x#notes"),
        ("https://a.com", "https://a.com"),
        ("https://a.com/p/x#frag", "https://a.com/p/x#frag"),
        ("", ""),
    ];
    for (input, expected) in cases {
        let cleaned = cleanup_url(input);
        assert_eq!(cleaned, expected);
        assert_eq!(cleanup_url(&cleaned), cleaned);
    }
}

#[test]
fn publication_comes_from_first_host_label() {
    assert_eq!(
        publication_from_url("https://example.substack.com/p/hello-world"),
        "example"
    );
    assert_eq!(publication_from_url("not a url"), "substack");
}

#[test]
fn publication_label_prefers_mapping() {
    let mut mappings = BTreeMap::new();
    mappings.insert("natesnewsletter".to_string(), "Nates_Notes".to_string());
    assert_eq!(publication_label("natesnewsletter", &mappings), "Nates_Notes");
    assert_eq!(publication_label("example", &mappings), "Example");
    assert_eq!(publication_label("my news", &mappings), "My_News");
}

#[test]
fn url_list_skips_blanks_and_comments() {
    let raw = "https://a.substack.com/p/one\n\n  # later\n  https://b.substack.com/p/two  \n";
    assert_eq!(
        parse_url_list(raw),
        vec!["https://a.substack.com/p/one", "https://b.substack.com/p/two"]
    );
}

#[test]
fn normalizer_drops_transcript_artifacts() {
    let input = "Intro\n[00:12]\n01:02:03\nSpeaker 1: hello\nHOST - welcome\nguest: hi\n[00:15] Real words\n";
    assert_eq!(normalize_markdown(input), "Intro\nReal words\n");
}

#[test]
fn normalizer_tightens_headings_and_lists() {
    let input = "# Title\n\nIntro paragraph:\n\n- one\n\n- two\n\n\n\nOutro\n\n## Next\n\n\n* a\n";
    let expected = "# Title\nIntro paragraph:\n- one\n- two\n\nOutro\n\n## Next\n* a\n";
    assert_eq!(normalize_markdown(input), expected);
}

#[test]
fn normalizer_keeps_paragraph_spacing() {
    let input = "First paragraph.\n\nSecond paragraph.\n";
    assert_eq!(normalize_markdown(input), input);
}

#[test]
fn normalizer_is_idempotent() {
    let samples = [
        "# H\n\n\n- a\n\n\n- b\n\nText:\n\n\n* c\n",
        "[00:01] [00:02] Host: x\n\n\n\nbody\n   \n   \n# h\n \n- x",
        "plain",
        "",
        "- a\n\n\n\n- b\n\n\n\n",
        "Para\n\n\n\n\nPara two\n\n[1:00]\n\n## Sub\n\n\n\nTail:\n\n- end",
    ];
    for sample in samples {
        let once = normalize_markdown(sample);
        assert_eq!(normalize_markdown(&once), once, "not idempotent for {sample:?}");
    }
}
