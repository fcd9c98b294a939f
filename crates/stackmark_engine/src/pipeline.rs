use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info, engine_warn};
use stackmark_core::{
    cleanup_url, normalize_markdown, normalize_tags, publication_from_url, publication_label,
    rewrite_links, slugify,
};
use url::Url;

use crate::corpus::build_index;
use crate::error::{ExtractError, PipelineError};
use crate::extract::ContentExtractor;
use crate::fetch::Fetcher;
use crate::filename::{document_path, sidecar_path};
use crate::frontmatter::render_document;
use crate::persist::AtomicFileWriter;
use crate::types::{
    ArticleMetadata, ArticleRecord, BatchSummary, EngineEvent, Stage, UrlOutcome,
};

/// Source of retrieval timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_root: PathBuf,
    pub overwrite: bool,
    /// Also keep the captured markup next to each document.
    pub save_html: bool,
    /// Total tries per address, at least one.
    pub attempts: usize,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
    pub pause_between: Duration,
    pub publication_mappings: BTreeMap<String, String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            overwrite: false,
            save_html: false,
            attempts: 2,
            retry_backoff: Duration::from_millis(600),
            pause_between: Duration::from_millis(150),
            publication_mappings: BTreeMap::new(),
        }
    }
}

/// Fetch, extract, link and write, one address at a time.
pub struct Pipeline<F: Fetcher> {
    fetcher: F,
    extractor: ContentExtractor,
    writer: AtomicFileWriter,
    settings: PipelineSettings,
    clock: Clock,
    sink: Arc<dyn ProgressSink>,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(fetcher: F, settings: PipelineSettings) -> Self {
        Self {
            fetcher,
            extractor: ContentExtractor::new(),
            writer: AtomicFileWriter::new(),
            settings,
            clock: system_clock(),
            sink: Arc::new(NullProgressSink),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Processes every address in order, pausing between them. Failures are
    /// reported and tallied; they never stop the batch.
    pub async fn process_batch(&mut self, urls: &[String]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.settings.pause_between.is_zero() {
                tokio::time::sleep(self.settings.pause_between).await;
            }
            if !url.contains("substack.com") {
                engine_warn!("{} does not look like a Substack address, trying anyway", url);
            }
            match self.process_url(url).await {
                Ok(UrlOutcome::Written(_)) => summary.written += 1,
                Ok(UrlOutcome::Skipped(_)) => summary.skipped += 1,
                Err(_) => summary.failed += 1,
            }
        }
        engine_info!(
            "batch done: {} written, {} skipped, {} failed",
            summary.written,
            summary.skipped,
            summary.failed
        );
        summary
    }

    /// Runs the whole fetch-to-write sequence for one address, retrying
    /// retryable failures with a growing delay.
    pub async fn process_url(&mut self, url: &str) -> Result<UrlOutcome, PipelineError> {
        let attempts = self.settings.attempts.max(1);
        let mut attempt = 1;
        let result = loop {
            match self.run_once(url).await {
                Ok(outcome) => break Ok(outcome),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    engine_warn!("attempt {}/{} for {} failed: {}", attempt, attempts, url, err);
                    self.sink.emit(EngineEvent::Retrying {
                        url: url.to_string(),
                        attempt,
                        error: err.to_string(),
                    });
                    tokio::time::sleep(self.settings.retry_backoff * attempt as u32).await;
                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        };
        self.report(url, &result);
        result
    }

    /// Re-files an already exported Markdown file under `url`. No fetch and
    /// no retry; the document is dated today.
    pub fn process_from_markdown(
        &self,
        markdown_path: &Path,
        url: &str,
    ) -> Result<UrlOutcome, PipelineError> {
        let raw = fs::read_to_string(markdown_path)?;
        let title = raw
            .lines()
            .find_map(heading_title)
            .map(str::to_string)
            .or_else(|| {
                markdown_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let slug = Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(slugify))
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return Err(ExtractError::Unnameable.into());
        }

        let retrieved = (self.clock)();
        let metadata = ArticleMetadata {
            title,
            subtitle: String::new(),
            author: String::new(),
            publication: publication_from_url(url),
            published: retrieved.date_naive(),
            updated: None,
            retrieved,
            url: cleanup_url(url),
            slug,
            image: None,
            tags: normalize_tags(Vec::<String>::new()),
            video_url: None,
        };
        let path = self.document_path(&metadata);
        let result = if path.exists() && !self.settings.overwrite {
            Ok(UrlOutcome::Skipped(path))
        } else {
            let record = ArticleRecord {
                metadata,
                links_internal: 0,
                links_external: 0,
                body: normalize_markdown(&raw),
            };
            self.write_record(&path, &record).map(UrlOutcome::Written)
        };
        self.report(url, &result);
        result
    }

    async fn run_once(&mut self, url: &str) -> Result<UrlOutcome, PipelineError> {
        self.stage(url, Stage::Fetching);
        let html = self.fetcher.fetch_html(url).await?;

        self.stage(url, Stage::Extracting);
        let (metadata, body) = self.extractor.extract(url, &html, (self.clock)())?;
        let path = self.document_path(&metadata);
        if path.exists() && !self.settings.overwrite {
            return Ok(UrlOutcome::Skipped(path));
        }

        self.stage(url, Stage::Linking);
        let index = build_index(&self.settings.output_root);
        engine_debug!("corpus index holds {} documents", index.len());
        let rewrite = rewrite_links(&body, &index);

        self.stage(url, Stage::Writing);
        let record = ArticleRecord {
            metadata,
            links_internal: rewrite.internal,
            links_external: rewrite.external,
            body: rewrite.text,
        };
        let path = self.write_record(&path, &record)?;
        if self.settings.save_html {
            self.writer.write(&sidecar_path(&path), html.as_bytes())?;
        }
        Ok(UrlOutcome::Written(path))
    }

    fn write_record(&self, path: &Path, record: &ArticleRecord) -> Result<PathBuf, PipelineError> {
        let document = render_document(record)?;
        Ok(self.writer.write(path, document.as_bytes())?)
    }

    fn document_path(&self, metadata: &ArticleMetadata) -> PathBuf {
        let label = publication_label(&metadata.publication, &self.settings.publication_mappings);
        document_path(
            &self.settings.output_root,
            &label,
            metadata.published,
            &metadata.slug,
        )
    }

    fn stage(&self, url: &str, stage: Stage) {
        self.sink.emit(EngineEvent::Stage {
            url: url.to_string(),
            stage,
        });
    }

    fn report(&self, url: &str, result: &Result<UrlOutcome, PipelineError>) {
        let url = url.to_string();
        let event = match result {
            Ok(UrlOutcome::Written(path)) => {
                engine_info!("wrote {} -> {}", url, path.display());
                EngineEvent::Written {
                    url,
                    path: path.clone(),
                }
            }
            Ok(UrlOutcome::Skipped(path)) => {
                engine_info!("skipped {}: {} exists", url, path.display());
                EngineEvent::Skipped {
                    url,
                    path: path.clone(),
                }
            }
            Err(err) => EngineEvent::Failed {
                url,
                error: err.to_string(),
            },
        };
        self.sink.emit(event);
    }
}

/// Text of a level-one ATX heading: `#`, at least one whitespace, the title.
fn heading_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('#')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim()).filter(|title| !title.is_empty())
}
