// Tue Jan 13 2026 - Alex

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use service_discovery::{
    config::DiscoveryConfig,
    introspection::{ManifestIntrospector, ModuleIntrospector},
    orchestration::{DiscoveryOrchestrator, PreloadReport},
    output::{DiscoveryReport, OutputFormat},
    utils::LoggingUtils,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Discovers service registrations from module manifests", long_about = None)]
struct Args {
    /// Manifest describing the modules and their types
    #[arg(short, long)]
    manifest: PathBuf,

    /// Discovery configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File the scan cache is loaded from and saved to
    #[arg(long)]
    cache_file: Option<PathBuf>,

    #[arg(long)]
    profile: Option<String>,

    #[arg(long)]
    test_mode: bool,

    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    no_parallel: bool,

    #[arg(long)]
    no_plugins: bool,

    /// Overall budget for the run in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Only rescan modules modified after this unix time (milliseconds)
    #[arg(long)]
    incremental_since: Option<u64>,

    /// Warm the cache before discovering
    #[arg(long)]
    preload: bool,

    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    no_progress: bool,
}

fn main() {
    let args = Args::parse();

    if !LoggingUtils::init_from_env() {
        LoggingUtils::init_logger(LoggingUtils::level_from_verbosity(args.verbose), true);
    }

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "[!]".red(), e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    let text = args.format == OutputFormat::Text;
    let config = build_config(args)?;

    if text {
        println!("{} Loading manifest: {}", "[*]".blue(), args.manifest.display());
    }
    let introspector = ManifestIntrospector::load(&args.manifest)
        .with_context(|| format!("failed to load manifest {}", args.manifest.display()))?;
    let introspector: Arc<dyn ModuleIntrospector> = Arc::new(introspector);
    let modules = introspector.enumerate_modules()?;
    if text {
        println!("{} Found {} modules", "[+]".green(), modules.len());
    }

    let orchestrator = DiscoveryOrchestrator::builder(introspector)
        .with_config(config)
        .build()
        .context("failed to set up discovery")?;

    let spinner = (text && !args.no_progress).then(create_spinner);

    let preload: Option<PreloadReport> = if args.preload {
        if let Some(pb) = &spinner {
            pb.set_message("Warming scan cache...");
        }
        Some(orchestrator.preload(&modules))
    } else {
        None
    };

    if let Some(pb) = &spinner {
        pb.set_message("Discovering services...");
    }

    let (result, incremental) = match args.incremental_since {
        Some(millis) => {
            let since = UNIX_EPOCH + Duration::from_millis(millis);
            let incremental = orchestrator.discover_incremental(&modules, since);
            (incremental.result.clone(), Some(incremental))
        }
        None => (orchestrator.discover(&modules), None),
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match orchestrator.save_cache() {
        Ok(Some(saved)) if text => println!("{} Saved {} cache entries", "[+]".green(), saved),
        Ok(_) => {}
        Err(e) => eprintln!("{} Failed to save cache: {}", "[!]".red(), e),
    }

    let mut report = DiscoveryReport::new(&result)
        .with_cache_stats(orchestrator.cache().map(|cache| cache.stats()));
    if let Some(incremental) = &incremental {
        report = report.with_incremental(incremental);
    }
    if let Some(preload) = &preload {
        report = report.with_preload(preload);
    }
    if args.verbose > 0 || !text {
        report = report.with_metrics(orchestrator.metrics().summary());
    }

    if text {
        println!();
    }
    println!("{}", report.render(args.format)?);

    Ok(result.success)
}

fn build_config(args: &Args) -> Result<DiscoveryConfig> {
    let mut config = match &args.config {
        Some(path) => DiscoveryConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DiscoveryConfig::default(),
    };

    if let Some(profile) = &args.profile {
        config = config.with_profile(profile.clone());
    }
    if args.test_mode {
        config = config.with_test_mode(true);
    }
    if args.no_cache {
        config = config.with_caching(false);
    }
    if args.no_parallel {
        config = config.with_parallel(false);
    }
    if args.no_plugins {
        config = config.with_plugins(false);
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_operation_timeout(Duration::from_millis(ms));
    }
    if let Some(path) = &args.cache_file {
        config.cache.persist_path = Some(path.clone());
    }

    config.validate()?;
    Ok(config)
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

