//! Stackmark engine: browser session, page capture and the document pipeline.
mod convert;
mod corpus;
mod error;
mod extract;
mod fetch;
mod filename;
mod frontmatter;
mod harvest;
mod persist;
mod pipeline;
mod protocol;
mod session;
mod transport;
mod types;

pub use convert::MarkdownConverter;
pub use corpus::{build_index, HEADER_WINDOW_BYTES};
pub use error::{ExtractError, PipelineError, SessionError};
pub use extract::{parse_date, ContentExtractor};
pub use fetch::{BrowserFetcher, FetchSettings, Fetcher, PageFetcher};
pub use filename::{document_path, sanitize_component, sidecar_path};
pub use frontmatter::{header_url, parse_header, render_document};
pub use harvest::{archive_url_for, ArchiveHarvester, HarvestSettings};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{
    system_clock, ChannelProgressSink, Clock, NullProgressSink, Pipeline, PipelineSettings,
    ProgressSink,
};
pub use protocol::BrowserVersion;
pub use session::{discover_endpoint, ProtocolSession, SessionSettings, TargetHandle};
pub use transport::{Transport, WsTransport};
pub use types::{
    ArticleMetadata, ArticleRecord, BatchSummary, EngineEvent, Stage, UrlOutcome,
};
