use std::fs::File;
use std::io::Read;
use std::path::Path;

use engine_logging::{engine_debug, engine_trace};
use stackmark_core::CorpusIndex;
use walkdir::WalkDir;

use crate::frontmatter::header_url;

/// Only the leading window of each document is read when indexing.
pub const HEADER_WINDOW_BYTES: u64 = 4096;

/// Snapshot of every `*.md` document under `root` that records a source `url`.
///
/// Each document is keyed by its cleaned address and identified by its file
/// stem. Unreadable, header-less or url-less files are skipped. A missing
/// root yields an empty index.
pub fn build_index(root: &Path) -> CorpusIndex {
    let mut index = CorpusIndex::new();
    if !root.is_dir() {
        return index;
    }
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("md"))
    {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let head = match read_head(path) {
            Ok(head) => head,
            Err(err) => {
                engine_debug!("Skipping unreadable {}: {}", path.display(), err);
                continue;
            }
        };
        match header_url(&head) {
            Some(url) => {
                engine_trace!("Indexed {} as {}", url, stem);
                index.insert(&url, stem);
            }
            _ => engine_debug!("Skipping {} without a source url", path.display()),
        }
    }
    index
}

fn read_head(path: &Path) -> std::io::Result<String> {
    let mut buffer = Vec::with_capacity(HEADER_WINDOW_BYTES as usize);
    File::open(path)?
        .take(HEADER_WINDOW_BYTES)
        .read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
