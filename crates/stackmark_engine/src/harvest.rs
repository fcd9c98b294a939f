use std::collections::BTreeSet;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde_json::Value;
use stackmark_core::cleanup_url;
use tokio::time::sleep;
use url::Url;

use crate::error::SessionError;
use crate::fetch::wait_for_load;
use crate::session::{ProtocolSession, TargetHandle};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub load_timeout: Duration,
    pub max_rounds: usize,
    /// Consecutive rounds with the same link count that count as converged.
    pub stable_rounds: usize,
    pub round_interval: Duration,
    /// Substring an anchor's `href` must contain to count as a post.
    pub link_pattern: String,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(45),
            max_rounds: 60,
            stable_rounds: 3,
            round_interval: Duration::from_millis(500),
            link_pattern: "/p/".to_string(),
        }
    }
}

impl HarvestSettings {
    /// Script that scrolls to the bottom and returns matching anchor targets.
    pub fn scroll_and_collect(&self) -> String {
        let selector = format!("a[href*='{}']", self.link_pattern.replace('\'', "\\'"));
        let selector = serde_json::to_string(&selector).unwrap_or_else(|_| "\"a\"".to_string());
        format!(
            "(() => {{ window.scrollTo(0, document.body.scrollHeight); \
             return Array.from(document.querySelectorAll({selector})).map((a) => a.href); }})()"
        )
    }
}

/// Scrolls an archive page until its post links stop growing.
#[derive(Debug, Clone, Default)]
pub struct ArchiveHarvester {
    settings: HarvestSettings,
}

impl ArchiveHarvester {
    pub fn new(settings: HarvestSettings) -> Self {
        Self { settings }
    }

    /// Sorted, query-stripped post addresses found on `index_url`.
    ///
    /// A failed evaluation ends the scrolling early and returns what was
    /// collected so far. The context is always closed.
    pub async fn harvest<T: Transport>(
        &self,
        session: &mut ProtocolSession<T>,
        index_url: &str,
    ) -> Result<Vec<String>, SessionError> {
        let handle = session.open_target().await?;
        let collected = self.collect(session, &handle, index_url).await;
        if let Err(err) = session.close_target(&handle).await {
            engine_warn!("failed to close target {}: {}", handle.target_id, err);
        }
        let links = collected?;
        engine_info!("harvested {} links from {}", links.len(), index_url);
        Ok(links.into_iter().collect())
    }

    async fn collect<T: Transport>(
        &self,
        session: &mut ProtocolSession<T>,
        handle: &TargetHandle,
        index_url: &str,
    ) -> Result<BTreeSet<String>, SessionError> {
        session.navigate(handle, index_url).await?;
        wait_for_load(session, handle, self.settings.load_timeout).await;

        let script = self.settings.scroll_and_collect();
        let mut links = BTreeSet::new();
        let mut last_count = None;
        let mut stable = 0;
        for round in 1..=self.settings.max_rounds {
            let found = match session.evaluate(handle, &script).await {
                Ok(found) => found,
                Err(err) => {
                    engine_warn!("stopping archive scroll at round {}: {}", round, err);
                    break;
                }
            };
            if let Value::Array(items) = found {
                links.extend(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|href| !href.is_empty())
                        .map(cleanup_url),
                );
            }

            if last_count == Some(links.len()) {
                stable += 1;
            } else {
                last_count = Some(links.len());
                stable = 1;
            }
            engine_debug!("round {}: {} links, stable for {}", round, links.len(), stable);
            if stable >= self.settings.stable_rounds {
                break;
            }
            sleep(self.settings.round_interval).await;
        }
        Ok(links)
    }
}

/// Archive page for a publication address or a bare publication slug.
pub fn archive_url_for(input: &str) -> String {
    let input = input.trim();
    let base = match Url::parse(input) {
        Ok(parsed) if parsed.has_host() => parsed.origin().ascii_serialization(),
        _ => {
            let bare = input.trim_matches('/');
            let host = bare.split('/').next().unwrap_or(bare);
            if host.contains('.') {
                format!("https://{host}")
            } else {
                format!("https://{host}.substack.com")
            }
        }
    };
    format!("{}/archive", base.trim_end_matches('/'))
}
