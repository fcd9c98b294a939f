use std::fs;

use pretty_assertions::assert_eq;
use stackmark_engine::build_index;
use tempfile::TempDir;

#[test]
fn indexes_documents_with_a_url_header() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("Example")).unwrap();
    fs::create_dir_all(root.join("Other/nested")).unwrap();
    fs::write(
        root.join("Example/2024-01-01-first.md"),
        "---\ntitle: First\nurl: https://example.substack.com/p/first\n---\n\nbody\n",
    )
    .unwrap();
    fs::write(
        root.join("Other/nested/2024-02-02-second.md"),
        "---\ntitle: \"Second: more\"\nurl: \"https://other.substack.com/p/second?utm=1\"\n---\nbody\n",
    )
    .unwrap();

    let index = build_index(root);
    assert_eq!(index.len(), 2);
    assert_eq!(
        index.lookup("https://example.substack.com/p/first"),
        Some("2024-01-01-first")
    );
    assert_eq!(
        index.lookup("https://other.substack.com/p/second"),
        Some("2024-02-02-second")
    );
}

#[test]
fn headers_written_by_hand_are_indexed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(
        root.join("2023-05-05-a.md"),
        "---\nurl: https://example.substack.com/p/a # imported by hand\n---\nbody\n",
    )
    .unwrap();
    fs::write(
        root.join("2023-05-06-b.md"),
        "---\nsummary: |\n  two\n  lines\nurl: \"https://example.substack.com/p/b\"  # note\n---\n",
    )
    .unwrap();

    let index = build_index(root);
    assert_eq!(index.lookup("https://example.substack.com/p/a"), Some("2023-05-05-a"));
    assert_eq!(index.lookup("https://example.substack.com/p/b"), Some("2023-05-06-b"));
}

#[test]
fn skips_files_that_cannot_be_indexed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("no-header.md"), "# Just notes\n").unwrap();
    fs::write(root.join("no-url.md"), "---\ntitle: x\n---\n").unwrap();
    fs::write(root.join("unclosed.md"), "---\nurl: https://a.substack.com/p/a\n").unwrap();
    fs::write(
        root.join("not-markdown.txt"),
        "---\nurl: https://a.substack.com/p/b\n---\n",
    )
    .unwrap();
    fs::write(root.join("binary.md"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

    assert!(build_index(root).is_empty());
}

#[test]
fn header_beyond_the_read_window_is_ignored() {
    let temp = TempDir::new().unwrap();
    let padding = "x".repeat(5000);
    fs::write(
        temp.path().join("long.md"),
        format!("---\ntitle: {padding}\nurl: https://a.substack.com/p/late\n---\n"),
    )
    .unwrap();

    assert!(build_index(temp.path()).is_empty());
}

#[test]
fn missing_root_gives_an_empty_index() {
    let temp = TempDir::new().unwrap();
    assert!(build_index(&temp.path().join("absent")).is_empty());
}
