//! `stackmark`: save rendered Substack posts as linked Markdown notes.
mod cli;
mod config;
mod report;

use std::fs;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info, level_for_verbosity};
use stackmark_core::parse_url_list;
use stackmark_engine::{
    archive_url_for, ArchiveHarvester, BrowserFetcher, FetchSettings, HarvestSettings, Pipeline,
    PipelineSettings, ProtocolSession, SessionSettings,
};

use crate::cli::Cli;
use crate::report::TerminalReporter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    engine_logging::initialize(level_for_verbosity(cli.verbose), cli.log_file.as_deref());

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let file_config = config::load_file_config(cli.config.as_deref());
    let home = dirs::home_dir();
    let resolved = config::resolve(cli.base_dir.as_deref(), file_config, home.as_deref());
    engine_info!("Notes root: {}", resolved.base_dir.display());

    let session_settings = SessionSettings {
        host: cli.cdp_host.clone(),
        port: cli.cdp_port,
        command_timeout: cli.page_timeout(),
    };
    let fetch_settings = FetchSettings {
        page_timeout: cli.page_timeout(),
        ..FetchSettings::default()
    };
    let pipeline_settings = PipelineSettings {
        output_root: resolved.base_dir,
        overwrite: cli.overwrite,
        save_html: cli.also_save_html,
        attempts: cli.retries.max(1),
        pause_between: cli.pause_between(),
        publication_mappings: resolved.publication_mappings,
        ..PipelineSettings::default()
    };
    let fetcher = BrowserFetcher::new(session_settings.clone(), fetch_settings);

    if let (Some(markdown), Some(url)) = (&cli.from_md, &cli.url) {
        let pipeline = Pipeline::new(fetcher, pipeline_settings)
            .with_progress(Arc::new(TerminalReporter));
        return Ok(match pipeline.process_from_markdown(markdown, url) {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        });
    }

    let urls = collect_urls(&cli)?;
    if urls.is_empty() {
        bail!("no addresses given; pass URLs, --urls-file, or --from-md with --url");
    }

    if cli.export_archive {
        return export_archive(&urls[0], &session_settings, cli.page_timeout()).await;
    }

    let mut pipeline =
        Pipeline::new(fetcher, pipeline_settings).with_progress(Arc::new(TerminalReporter));
    let summary = pipeline.process_batch(&urls).await;
    pipeline.into_fetcher().shutdown().await;

    eprintln!(
        "{} written, {} skipped, {} failed",
        summary.written, summary.skipped, summary.failed
    );
    Ok(if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn collect_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls: Vec<String> = cli
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if let Some(path) = &cli.urls_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read url file {}", path.display()))?;
        urls.extend(parse_url_list(&raw));
    }
    Ok(urls)
}

/// Prints every post address of the publication's archive to stdout.
async fn export_archive(
    input: &str,
    session_settings: &SessionSettings,
    load_timeout: Duration,
) -> Result<ExitCode> {
    let index = archive_url_for(input);
    let mut session = ProtocolSession::connect(session_settings)
        .await
        .context("cannot reach the browser")?;
    let harvester = ArchiveHarvester::new(HarvestSettings {
        load_timeout,
        ..HarvestSettings::default()
    });
    let harvested = harvester.harvest(&mut session, &index).await;
    session.disconnect().await;
    let links = harvested.with_context(|| format!("harvesting {index} failed"))?;

    let mut stdout = std::io::stdout().lock();
    for link in &links {
        writeln!(stdout, "{link}")?;
    }
    Ok(ExitCode::SUCCESS)
}
