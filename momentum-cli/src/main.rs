//! Momentum CLI: scan a universe, view saved results, list symbols.
//!
//! Commands:
//! - `scan`: fetch price history, compute momentum, print the ranked table
//! - `show`: render a previously saved momentum CSV
//! - `universe`: print the normalized symbol list a scan would use

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use momentum_core::data::{
    collect_series, normalize_symbols, BreakerState, CachedProvider, CircuitBreaker, Clock,
    LogProgress, PriceProvider, SymbolFile, SymbolSource, SystemClock, TtlCache, Universe,
    WikipediaSp500, YahooProvider,
};
use momentum_core::export::{load_csv, save_csv};
use momentum_core::{
    complete_rows, compute_table, filter_min, sorted_symbols, LookbackPolicy, MomentumTable,
    ResolvedConfig, ScreenerConfig, SourceKind,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "momentum",
    about = "Momentum screener: rank symbols by price change over lookback windows"
)]
struct Cli {
    /// Debug-level logging when RUST_LOG is not set.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch price history for a universe and print the momentum table.
    Scan(ScanArgs),
    /// Render a saved momentum CSV.
    Show {
        /// CSV written by `scan --output`.
        csv: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print the normalized symbol list.
    Universe {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Path to a screener TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the symbol list comes from. Overrides the config file.
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Symbol list file for `--source file` or `--source toml`.
    #[arg(long)]
    universe_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Lookback policy: calendar-hours, trading-days or custom. Overrides the config file.
    #[arg(long)]
    policy: Option<LookbackPolicy>,

    /// Screen these symbols instead of the configured source (comma or space separated).
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    symbols: Vec<String>,

    #[command(flatten)]
    view: ViewArgs,

    /// Drop symbols missing any lookback value.
    #[arg(long, default_value_t = false)]
    complete: bool,

    /// Save the ranked table as CSV.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Re-run the scan every N seconds, reusing cached price series.
    #[arg(long, value_name = "N")]
    refresh_secs: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
struct ViewArgs {
    /// Lookback column to sort by. Defaults to 1W when present, else the first column.
    #[arg(long)]
    sort: Option<String>,

    /// Sort ascending instead of descending.
    #[arg(long, default_value_t = false)]
    ascending: bool,

    /// Keep rows whose lookback value exceeds PCT percent (e.g. 1M=5). Repeatable.
    #[arg(long = "min-pct", value_name = "NAME=PCT")]
    min_pct: Vec<MinPct>,

    /// Print only the first N rows.
    #[arg(long, value_name = "N")]
    top: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Wikipedia,
    Default,
    File,
    Toml,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Wikipedia => SourceKind::Wikipedia,
            SourceArg::Default => SourceKind::Default,
            SourceArg::File => SourceKind::File,
            SourceArg::Toml => SourceKind::Toml,
        }
    }
}

/// `NAME=PCT` threshold; stored as a ratio (`1M=5` → 0.05).
#[derive(Debug, Clone, PartialEq)]
struct MinPct {
    column: String,
    ratio: f64,
}

impl FromStr for MinPct {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, pct) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=PCT, got '{s}'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing lookback name in '{s}'"));
        }
        let pct: f64 = pct
            .trim()
            .trim_end_matches('%')
            .parse()
            .map_err(|_| format!("invalid percentage in '{s}'"))?;
        if !pct.is_finite() {
            return Err(format!("invalid percentage in '{s}'"));
        }
        Ok(Self {
            column: name.to_string(),
            ratio: pct / 100.0,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Show { csv, view } => run_show(&csv, &view),
        Commands::Universe { source } => run_universe(&source),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the config file (if any) and apply flag overrides.
fn load_config(source: &SourceArgs, policy: Option<LookbackPolicy>) -> Result<ScreenerConfig> {
    let mut config = match &source.config {
        Some(path) => ScreenerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScreenerConfig::default(),
    };
    if let Some(policy) = policy {
        config.policy = policy;
    }
    if let Some(kind) = source.source {
        config.universe.source = kind.into();
    }
    if let Some(path) = &source.universe_file {
        config.universe.path = Some(path.clone());
    }
    Ok(config)
}

fn symbol_source(config: &ResolvedConfig) -> Result<Box<dyn SymbolSource>> {
    let path = || {
        config
            .universe
            .path
            .as_deref()
            .context("universe source needs --universe-file or [universe] path")
    };
    let source: Box<dyn SymbolSource> = match config.universe.source {
        SourceKind::Wikipedia => Box::new(WikipediaSp500::new()?),
        SourceKind::Default => Box::new(Universe::default_us()),
        SourceKind::File => Box::new(SymbolFile::new(path()?)),
        SourceKind::Toml => {
            let path = path()?;
            Box::new(
                Universe::from_file(path)
                    .with_context(|| format!("loading universe {}", path.display()))?,
            )
        }
    };
    Ok(source)
}

fn load_symbols(explicit: &[String], config: &ResolvedConfig) -> Result<Vec<String>> {
    let symbols = if explicit.is_empty() {
        let source = symbol_source(config)?;
        let symbols = source
            .symbols()
            .with_context(|| format!("reading symbols from {}", source.name()))?;
        info!("{} symbols from {}", symbols.len(), source.name());
        symbols
    } else {
        normalize_symbols(explicit.iter().flat_map(|s| s.split_whitespace()))
    };
    if symbols.is_empty() {
        bail!("symbol list is empty");
    }
    Ok(symbols)
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let config = load_config(&args.source, args.policy)?
        .resolve()
        .context("invalid screener configuration")?;

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(Arc::clone(&circuit_breaker))?;

    let Some(refresh) = args
        .refresh_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
    else {
        let symbols = load_symbols(&args.symbols, &config)?;
        return scan_once(&provider, &circuit_breaker, &symbols, &config, &args);
    };

    let provider = refreshing_provider(provider, refresh, SystemClock);
    let symbol_cache: TtlCache<(), Vec<String>> = TtlCache::new(config.cache_ttl);
    info!(
        "refreshing every {}s (prices cached for {}s, symbol list for {}s)",
        refresh.as_secs(),
        provider.cache().ttl().as_secs(),
        config.cache_ttl.as_secs()
    );

    loop {
        match symbol_cache.get_or_try_insert_with((), || load_symbols(&args.symbols, &config)) {
            Ok(symbols) => {
                if let Err(e) = scan_once(&provider, &circuit_breaker, &symbols, &config, &args) {
                    error!("scan failed: {e:#}");
                }
            }
            Err(e) => error!("{e:#}"),
        }
        provider.cache().purge_expired();
        std::thread::sleep(refresh);
    }
}

/// Price cache for the refresh loop.
///
/// Entries outlive one refresh interval so the next cycle is served from
/// cache; a series is refetched every second cycle.
fn price_cache_ttl(refresh: Duration) -> Duration {
    refresh.saturating_mul(2)
}

fn refreshing_provider<P: PriceProvider, C: Clock>(
    inner: P,
    refresh: Duration,
    clock: C,
) -> CachedProvider<P, C> {
    CachedProvider::with_cache(inner, TtlCache::with_clock(price_cache_ttl(refresh), clock))
}

fn scan_once(
    provider: &dyn PriceProvider,
    breaker: &CircuitBreaker,
    symbols: &[String],
    config: &ResolvedConfig,
    args: &ScanArgs,
) -> Result<()> {
    println!(
        "Lookback policy: {} [{}] over {}",
        config.policy,
        config.lookbacks.names().join(", "),
        config.request
    );

    let collected = collect_series(
        provider,
        symbols,
        &config.request,
        config.pacing,
        &LogProgress,
    );
    if let BreakerState::Open { .. } = breaker.state() {
        warn!(
            "{} paused after repeated failures; requests resume in {}s",
            provider.name(),
            breaker.remaining_cooldown().as_secs()
        );
    }
    if collected.succeeded == 0 {
        bail!(
            "no price data fetched for any of {} symbols from {}",
            symbols.len(),
            provider.name()
        );
    }

    let table = compute_table(collected.series.values(), &config.lookbacks, &config.params);
    let table = if args.complete {
        complete_rows(&table)
    } else {
        table
    };
    let (table, order, sort) = apply_view(table, &args.view)?;

    println!("Updated {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    print_table(&table, &order, &sort, args.view.top);

    if !collected.all_succeeded() {
        println!();
        println!("Failed to fetch {} symbol(s):", collected.failures.len());
        for (symbol, err) in &collected.failures {
            println!("  {symbol}: {err}");
        }
    }

    if let Some(path) = &args.output {
        save_csv(&table, &order, path)
            .with_context(|| format!("saving CSV to {}", path.display()))?;
        println!("Saved {} rows to {}", order.len(), path.display());
    }

    Ok(())
}

fn run_show(csv: &Path, view: &ViewArgs) -> Result<()> {
    let table = load_csv(csv).with_context(|| format!("loading {}", csv.display()))?;
    let (table, order, sort) = apply_view(table, view)?;
    println!("{} ({} rows)", csv.display(), table.len());
    print_table(&table, &order, &sort, view.top);
    Ok(())
}

fn run_universe(source: &SourceArgs) -> Result<()> {
    let config = load_config(source, None)?
        .resolve()
        .context("invalid screener configuration")?;
    for symbol in load_symbols(&[], &config)? {
        println!("{symbol}");
    }
    Ok(())
}

/// Column a view sorts by when `--sort` is not given.
fn default_sort(table: &MomentumTable) -> Option<&str> {
    if table.has_column("1W") {
        Some("1W")
    } else {
        table.columns().first().map(String::as_str)
    }
}

fn require_column(table: &MomentumTable, column: &str) -> Result<()> {
    if !table.has_column(column) {
        bail!(
            "unknown lookback '{column}' (available: {})",
            table.columns().join(", ")
        );
    }
    Ok(())
}

/// Apply thresholds and pick the row order. Returns (filtered table, order, sort column).
fn apply_view(
    mut table: MomentumTable,
    view: &ViewArgs,
) -> Result<(MomentumTable, Vec<String>, String)> {
    let sort = match &view.sort {
        Some(column) => {
            require_column(&table, column)?;
            column.clone()
        }
        None => default_sort(&table)
            .context("table has no lookback columns")?
            .to_string(),
    };

    for min in &view.min_pct {
        require_column(&table, &min.column)?;
        table = filter_min(&table, &min.column, min.ratio);
    }

    let order = sorted_symbols(&table, &sort, view.ascending);
    Ok((table, order, sort))
}

fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "-".to_string(),
    }
}

fn format_price(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn print_table(table: &MomentumTable, order: &[String], sort: &str, top: Option<usize>) {
    if order.is_empty() {
        println!("No symbols to show.");
        return;
    }

    let shown = top.unwrap_or(order.len()).min(order.len());
    let symbol_width = order[..shown]
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(6);
    let col_width = table
        .columns()
        .iter()
        .map(|c| c.len() + 1)
        .max()
        .unwrap_or(0)
        .max(9);

    println!();
    let mut header = format!("{:<symbol_width$} {:>10}", "Ticker", "Last");
    for column in table.columns() {
        let label = if column == sort {
            format!("{column}*")
        } else {
            column.clone()
        };
        header.push_str(&format!(" {label:>col_width$}"));
    }
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for symbol in &order[..shown] {
        let Some(row) = table.get(symbol) else {
            continue;
        };
        let mut line = format!("{:<symbol_width$} {:>10}", symbol, format_price(row.latest_price));
        for column in table.columns() {
            line.push_str(&format!(" {:>col_width$}", format_pct(row.value(column))));
        }
        println!("{line}");
    }

    if shown < order.len() {
        println!("... {} more", order.len() - shown);
    }
    let missing = table.rows().filter(|r| r.value(sort).is_none()).count();
    if missing > 0 {
        info!("{missing} symbol(s) have no {sort} value and are listed last");
    }
}
