use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

/// Canonical metadata derived from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publication: String,
    pub published: NaiveDate,
    pub updated: Option<NaiveDate>,
    pub retrieved: DateTime<Utc>,
    /// Source address without its query component.
    pub url: String,
    pub slug: String,
    pub image: Option<String>,
    /// Normalized, sentinel tag first.
    pub tags: Vec<String>,
    pub video_url: Option<String>,
}

impl ArticleMetadata {
    /// `{published}-{slug}`, also the cross-reference identifier of the document.
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.published.format("%Y-%m-%d"), self.slug)
    }
}

/// A document ready to be written: metadata plus the link-rewritten body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub metadata: ArticleMetadata,
    pub links_internal: usize,
    pub links_external: usize,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    Linking,
    Writing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Stage {
        url: String,
        stage: Stage,
    },
    Retrying {
        url: String,
        attempt: usize,
        error: String,
    },
    Written {
        url: String,
        path: PathBuf,
    },
    Skipped {
        url: String,
        path: PathBuf,
    },
    Failed {
        url: String,
        error: String,
    },
}

/// Final result for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    Written(PathBuf),
    /// Output already existed and overwriting was not requested.
    Skipped(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.written + self.skipped + self.failed
    }
}
