//! Command handlers for `collect` and `sources`.
//!
//! A source that fails is reported in the summary and reflected in the exit
//! code; it never stops the other sources or the output write.

use std::collections::HashSet;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use indicatif::MultiProgress;
use tokio_util::sync::CancellationToken;

use brewdb_core::{AppConfig, CanonicalProduct, ProductKey, SourceConfig, SourceId};
use brewdb_scraper::{
    build_adapter, AdapterSettings, Aggregator, BrowserLauncher, ChromiumLauncher, ChromiumOptions,
    RetryPolicy, RunContext, RunReport, SourceAdapter, Transport,
};

use crate::progress::BarProgress;
use crate::{output, CollectArgs};

/// Print every configured source with its enabled flag and URL.
pub(crate) fn list_sources(config: &AppConfig) -> anyhow::Result<()> {
    let sources = brewdb_core::load_sources(&config.sources_path)
        .with_context(|| format!("failed to load {}", config.sources_path.display()))?;
    for s in &sources {
        let flag = if s.enabled { "enabled" } else { "disabled" };
        println!("{:<18} {flag:<8} {}", s.source, s.url);
    }
    Ok(())
}

/// Pick the sources to run. An explicit filter runs the named sources in
/// sources-file order even when they are disabled; otherwise every enabled
/// source runs.
///
/// # Errors
///
/// Returns an error if a filtered source is not in the sources file.
pub(crate) fn select_sources(
    configured: Vec<SourceConfig>,
    filter: &[SourceId],
) -> anyhow::Result<Vec<SourceConfig>> {
    if filter.is_empty() {
        return Ok(configured.into_iter().filter(|s| s.enabled).collect());
    }
    if let Some(missing) = filter
        .iter()
        .find(|id| !configured.iter().any(|s| s.source == **id))
    {
        anyhow::bail!("source '{missing}' is not configured in the sources file");
    }
    Ok(configured
        .into_iter()
        .filter(|s| filter.contains(&s.source))
        .collect())
}

fn build_transport(config: &AppConfig) -> anyhow::Result<Transport> {
    let policy = RetryPolicy::new(
        config.max_attempts,
        Duration::from_secs(config.retry_base_delay_secs),
    )
    .with_jitter(Duration::from_millis(config.retry_jitter_ms));
    Transport::new(config.request_timeout_secs, &config.user_agent, policy)
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))
}

fn build_launcher(config: &AppConfig) -> Arc<dyn BrowserLauncher> {
    Arc::new(ChromiumLauncher::new(ChromiumOptions {
        executable: config.chromium_path.clone(),
        user_agent: config.user_agent.clone(),
        navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        settle_delay: Duration::from_millis(config.page_settle_ms),
    }))
}

/// Run the selected sources, merge their products with any resumed catalog,
/// write the output file, and print a per-source summary.
///
/// Exits with status 1 when any source failed.
///
/// # Errors
///
/// Returns an error for configuration problems, an unreadable resume file,
/// or a failed output write. Source failures are not errors.
pub(crate) async fn run_collect(
    config: &AppConfig,
    args: &CollectArgs,
    bars: &MultiProgress,
) -> anyhow::Result<ExitCode> {
    let configured = brewdb_core::load_sources(&config.sources_path)
        .with_context(|| format!("failed to load {}", config.sources_path.display()))?;
    let sources = select_sources(configured, &args.sources)?;
    let output_path = args.output.as_deref().unwrap_or(config.output_path.as_path());

    if sources.is_empty() {
        println!("no enabled sources; nothing to collect");
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        let names: Vec<&str> = sources.iter().map(|s| s.source.as_str()).collect();
        println!(
            "dry-run: would collect {} sources into {}: [{}]",
            sources.len(),
            output_path.display(),
            names.join(", ")
        );
        return Ok(ExitCode::SUCCESS);
    }

    let existing = if args.resume {
        let existing = output::load_existing(output_path)?;
        tracing::info!(
            path = %output_path.display(),
            products = existing.len(),
            "resuming from previous output"
        );
        existing
    } else {
        Vec::new()
    };
    let known: HashSet<ProductKey> = existing.iter().map(CanonicalProduct::key).collect();

    let transport = build_transport(config)?;
    let launcher = build_launcher(config);
    let settings = AdapterSettings {
        max_pages: config.max_pages,
        page_size: config.page_size,
        detail_concurrency: config.detail_concurrency,
        enrich_details: true,
    };
    let adapters: Vec<Arc<dyn SourceAdapter>> = sources
        .iter()
        .map(|s| build_adapter(s, &settings, &transport, &launcher))
        .collect();

    let ids: Vec<SourceId> = sources.iter().map(|s| s.source).collect();
    let progress = Arc::new(BarProgress::new(bars, &ids));
    let cancel = CancellationToken::new();
    let ctx = RunContext {
        cancel: cancel.clone(),
        progress: progress.clone(),
        known: Arc::new(known),
    };

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; stopping sources and keeping what was collected");
            cancel.cancel();
        }
    });

    let run_timeout = args
        .timeout_secs
        .or(config.run_timeout_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    let report = Aggregator::new(adapters)
        .concurrent(config.concurrent_sources)
        .run_timeout(run_timeout)
        .run(&ctx, existing)
        .await;
    interrupt.abort();

    for summary in &report.sources {
        progress.settle(summary.source, summary.status.as_str());
    }

    output::write_products(output_path, &report.products)?;
    print_summary(&report, output_path);

    if report.any_failed() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_summary(report: &RunReport, output_path: &Path) {
    println!();
    for s in &report.sources {
        let error = s.error.as_deref().unwrap_or("");
        println!(
            "{:<18} {:<8} {:>6} products  {:>3} dropped  {:>3} pages  {:>7}ms  {error}",
            s.source.as_str(),
            s.status.as_str(),
            s.products,
            s.dropped,
            s.pages,
            s.elapsed_ms,
        );
    }
    let elapsed = report.finished_at - report.started_at;
    println!(
        "collected {} new products ({} total) in {}s; wrote {}",
        report.new_products,
        report.total(),
        elapsed.num_seconds(),
        output_path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                source: SourceId::BeerCartel,
                enabled: true,
                url: "https://beercartel.com.au/collections/beer".to_owned(),
            },
            SourceConfig {
                source: SourceId::Liquorland,
                enabled: false,
                url: "https://www.liquorland.com.au/api/products/ll/nsw/beer".to_owned(),
            },
            SourceConfig {
                source: SourceId::FirstChoiceLiquor,
                enabled: true,
                url: "https://www.firstchoiceliquor.com.au/api/products/fc/nsw/beer".to_owned(),
            },
        ]
    }

    fn ids(sources: &[SourceConfig]) -> Vec<SourceId> {
        sources.iter().map(|s| s.source).collect()
    }

    #[test]
    fn no_filter_keeps_enabled_sources_in_order() {
        let selected = select_sources(configured(), &[]).unwrap();
        assert_eq!(
            ids(&selected),
            vec![SourceId::BeerCartel, SourceId::FirstChoiceLiquor]
        );
    }

    #[test]
    fn filter_runs_disabled_source_and_keeps_file_order() {
        let selected = select_sources(
            configured(),
            &[SourceId::FirstChoiceLiquor, SourceId::Liquorland],
        )
        .unwrap();
        assert_eq!(
            ids(&selected),
            vec![SourceId::Liquorland, SourceId::FirstChoiceLiquor]
        );
    }

    #[test]
    fn filter_naming_unconfigured_source_is_an_error() {
        let only_cartel = vec![configured().remove(0)];
        let err = select_sources(only_cartel, &[SourceId::Liquorland]).unwrap_err();
        assert!(err.to_string().contains("'liquorland' is not configured"));
    }
}
