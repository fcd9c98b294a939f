//! Stackmark core: pure text transforms shared by the engine and the binary.
mod address;
mod corpus;
mod normalize;
mod slug;
mod tags;

pub use address::{cleanup_url, parse_url_list, publication_from_url, publication_label};
pub use corpus::{rewrite_links, CorpusIndex, LinkRewrite};
pub use normalize::{
    collapse_blank_lines_in_lists, collapse_blank_runs, normalize_markdown,
    remove_blank_after_headings, scrub_transcript_lines,
};
pub use slug::slugify;
pub use tags::{normalize_tags, SENTINEL_TAG};
