use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use parser_config::model::serialize_fragment;
use parser_config::subscription::{fetch_sources, FetchSettings, HttpFetcher};
use parser_config::util::{display_path, truncate_string};
use parser_config::{ConfigGateway, ConfigSnapshot, ErrorClass, ParserConfigError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Command, FetchArgs, RootArgs, ShowArgs, TouchArgs, CONFIG_ENV};

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(hint) = hint_for(&err) {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: RootArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config)?;
    let gateway = ConfigGateway::new();
    match args.command {
        Command::Show(show) => cmd_show(&gateway, &config_path, &show),
        Command::Touch(touch) => cmd_touch(&gateway, &config_path, &touch),
        Command::Normalize(_) => cmd_normalize(&gateway, &config_path),
        Command::Fetch(fetch) => cmd_fetch(&gateway, &config_path, &fetch),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("singbox-launcher").join("config.json"))
        .ok_or_else(|| anyhow!("no --config given, {CONFIG_ENV} unset, and no platform config dir"))
}

fn cmd_show(gateway: &ConfigGateway, path: &Path, args: &ShowArgs) -> Result<()> {
    let snapshot = gateway.extract(path)?;
    if args.json {
        println!("{}", serialize_fragment(&snapshot.config));
        return Ok(());
    }
    print_summary(path, &snapshot);
    Ok(())
}

fn cmd_touch(gateway: &ConfigGateway, path: &Path, args: &TouchArgs) -> Result<()> {
    let instant = match args.at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("parse --at {raw:?} as RFC3339"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let snapshot = gateway.persist_timestamp(path, instant)?;
    print_summary(path, &snapshot);
    Ok(())
}

fn cmd_normalize(gateway: &ConfigGateway, path: &Path) -> Result<()> {
    let snapshot = gateway.persist(path, None)?;
    print_summary(path, &snapshot);
    Ok(())
}

fn cmd_fetch(gateway: &ConfigGateway, path: &Path, args: &FetchArgs) -> Result<()> {
    let snapshot = gateway.extract(path)?;
    let fetcher = HttpFetcher::new(FetchSettings {
        timeout: Duration::from_secs(args.timeout_secs),
        ..FetchSettings::default()
    });
    let fetched = fetch_sources(&snapshot.config, &fetcher);
    let mut failed = 0usize;
    for entry in &fetched {
        let label = if entry.remote { "remote" } else { "inline" };
        let source = truncate_string(&entry.source, 72);
        match &entry.content {
            Ok(bytes) => {
                let lines = String::from_utf8_lossy(bytes)
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .count();
                println!("[{label}] {source}: {} bytes, {lines} entries", bytes.len());
            }
            Err(err) => {
                failed += 1;
                println!("[{label}] {source}: {err}");
            }
        }
    }
    if failed > 0 {
        return Err(anyhow!("{failed} of {} sources failed", fetched.len()));
    }
    Ok(())
}

fn print_summary(path: &Path, snapshot: &ConfigSnapshot) {
    let cwd = std::env::current_dir().ok();
    let config = &snapshot.config;
    println!("config: {}", display_path(path, cwd.as_deref()));
    if snapshot.migration.migrated() {
        println!(
            "version: {} (migrated from {})",
            config.version,
            snapshot.detected_version()
        );
    } else {
        println!("version: {}", config.version);
    }
    println!("proxy sources: {}", snapshot.proxy_source_count());
    println!("outbounds: {}", snapshot.outbound_count());
    if !config.parser.reload_interval.is_empty() {
        println!("reload: {}", config.parser.reload_interval);
    }
    let last_updated = if config.parser.last_updated.is_empty() {
        "never"
    } else {
        config.parser.last_updated.as_str()
    };
    println!("last updated: {last_updated}");
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    let err = err.downcast_ref::<ParserConfigError>()?;
    Some(match err.class() {
        ErrorClass::Repair => {
            "check that the config file exists and carries a valid /** @ParserConfig ... */ block"
        }
        ErrorClass::UpgradeApplication => {
            "the config was written by a newer release; upgrade the application"
        }
        ErrorClass::Internal => "this is a bug in pcfg; please report it",
    })
}
