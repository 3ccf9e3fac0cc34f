//! subpartners - sub-partner click statistics for referral partners
//!
//! A CLI that lists the users referred by a partner code, counts their
//! clicks on a hosted REST data service, and renders the bonus clicks the
//! partner earns from each of them.
//!
//! Exit codes:
//!   0 - Table rendered (including the "No sub-partners yet" state)
//!   1 - Invalid arguments, configuration or output errors

mod backend;
mod cli;
mod config;
mod models;
mod report;
mod stats;

use anyhow::{Context, Result};
use backend::{MemoryStore, ReferralStore, RestStore};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{StatsQuery, SubPartnerStat, ViewSnapshot};
use stats::SubPartnersView;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("subpartners v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .subpartners.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the data service URL, API key and limit.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Fetch, render, and optionally keep refreshing.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let query = StatsQuery::new(args.partner_code(), Some(config.dashboard.limit))?;
    let store = build_store(&args, &config)?;
    info!("Using {} store", store.name());

    let view = SubPartnersView::new(store);

    let _ = view.set_query(query.clone());
    let snapshot = wait_for_view(&view, &query, args.quiet).await;
    emit(&config, &query, &snapshot)?;

    let Some(interval_secs) = config.dashboard.watch_seconds else {
        return Ok(());
    };

    info!("Refreshing every {}s, press Ctrl-C to stop", interval_secs);
    watch_loop(&view, &config, &query, interval_secs, args.quiet, ctrl_c()).await
}

/// Resolves on the first Ctrl-C.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Reload and re-render every `interval_secs` until `shutdown` resolves.
///
/// `shutdown` is raced against both the wait for the next tick and the
/// wait for a reload to finish.
async fn watch_loop<S, F>(
    view: &SubPartnersView<S>,
    config: &Config,
    query: &StatsQuery,
    interval_secs: u64,
    quiet: bool,
    shutdown: F,
) -> Result<()>
where
    S: ReferralStore + ?Sized + 'static,
    F: std::future::Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {}
        }

        let _ = view.reload();
        let snapshot = tokio::select! {
            _ = &mut shutdown => break,
            snapshot = wait_for_view(view, query, quiet) => snapshot,
        };
        emit(config, query, &snapshot)?;
    }

    info!("Stopping watch");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Pick the store: a fixture when given, the REST service otherwise.
fn build_store(args: &Args, config: &Config) -> Result<Arc<dyn ReferralStore>> {
    if let Some(ref fixture) = args.fixture {
        return Ok(Arc::new(MemoryStore::load(fixture)?));
    }

    if config.backend.api_key.is_none() {
        warn!("No API key configured; requests to {} are anonymous", config.backend.url);
    }

    Ok(Arc::new(RestStore::new(config.rest_config())?))
}

/// Show the loading spinner until the view is ready.
async fn wait_for_view<S>(view: &SubPartnersView<S>, query: &StatsQuery, quiet: bool) -> ViewSnapshot
where
    S: ReferralStore + ?Sized + 'static,
{
    let spinner = (!quiet).then(|| report::loading_spinner(query.partner_code()));
    let snapshot = view.ready().await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    snapshot
}

/// Render the snapshot in the configured format.
fn render(format: OutputFormat, query: &StatsQuery, stats: &[SubPartnerStat]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(report::generate_text_table(stats)),
        OutputFormat::Markdown => Ok(report::generate_markdown_table(stats)),
        OutputFormat::Json => report::generate_json_report(query, stats),
    }
}

/// Write the rendered output to the configured file or stdout.
fn emit(config: &Config, query: &StatsQuery, snapshot: &ViewSnapshot) -> Result<()> {
    let output = render(config.general.format, query, &snapshot.sub_partners)?;

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(
                "Wrote {} sub-partners to {} (generation {})",
                snapshot.sub_partners.len(),
                path.display(),
                snapshot.generation
            );
        }
        None => println!("{}", output),
    }

    Ok(())
}
