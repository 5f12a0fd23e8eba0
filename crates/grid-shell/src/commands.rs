//! Subcommand implementations.

use anyhow::{anyhow, bail, Context, Result};
use grid_app_manager::{GridContext, GridContextBuilder, UpdateOutcome, UpdateSchedule};
use grid_core::config::PathsConfig;
use grid_core::platform::grid_data_dir;
use grid_core::network::DownloadProgress;
use grid_core::{
    CancellationToken, ClientPluginRegistry, GitHubReleaseSource, Platform, PlatformEnv,
    SettingValues,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn data_dir_or_default(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => Ok(grid_data_dir()?),
    }
}

fn builder(data_dir: Option<PathBuf>) -> Result<GridContextBuilder> {
    Ok(GridContext::builder(data_dir_or_default(data_dir)?))
}

fn registry(data_dir: Option<PathBuf>) -> Result<ClientPluginRegistry> {
    let mut registry = ClientPluginRegistry::with_builtin();
    let clients_dir = data_dir_or_default(data_dir)?.join(PathsConfig::CLIENTS_DIR_NAME);
    if clients_dir.is_dir() {
        registry.load_dir(&clients_dir)?;
    }
    Ok(registry)
}

fn env_for(platform: Option<&str>) -> Result<PlatformEnv> {
    let mut env = PlatformEnv::detect()?;
    if let Some(platform) = platform {
        env.platform = Platform::parse(platform)?;
    }
    Ok(env)
}

/// Parse repeated `KEY=VALUE` arguments.
pub fn parse_values(pairs: &[String]) -> Result<SettingValues> {
    let mut values = SettingValues::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got {:?}", pair))?;
        if key.is_empty() {
            bail!("empty setting key in {:?}", pair);
        }
        values.insert(key.to_string(), value.to_string());
    }
    Ok(values)
}

pub fn clients(data_dir: Option<PathBuf>) -> Result<()> {
    let registry = registry(data_dir)?;
    for descriptor in registry.list_all() {
        let settings: Vec<&str> = descriptor.settings.iter().map(|s| s.key.as_str()).collect();
        println!(
            "{:<12} {:<20} order={:<4} settings={}",
            descriptor.name,
            descriptor.display_name,
            descriptor.order,
            settings.join(",")
        );
    }
    for rejected in registry.rejected() {
        warn!("Rejected {}: {}", rejected.origin, rejected.error);
    }
    Ok(())
}

pub fn flags(
    data_dir: Option<PathBuf>,
    client: &str,
    values: &[String],
    defaults: bool,
    platform: Option<&str>,
) -> Result<()> {
    let registry = registry(data_dir)?;
    let values = parse_values(values)?;
    let flags = if defaults {
        registry.render_flags_with_defaults(client, &env_for(platform)?, &values)?
    } else {
        registry.render_flags(client, &values)?
    };
    println!("{}", serde_json::to_string_pretty(&flags.to_argv())?);
    Ok(())
}

pub fn endpoint(
    data_dir: Option<PathBuf>,
    client: &str,
    values: &[String],
    platform: Option<&str>,
) -> Result<()> {
    let registry = registry(data_dir)?;
    let env = env_for(platform)?;
    let endpoint = registry.control_endpoint(client, &env, &parse_values(values)?)?;
    let binary = registry.binary_name(client, env.platform)?;
    println!("{}", endpoint.display());
    info!("{} runs as {} on {}", client, binary, env.platform);
    Ok(())
}

pub async fn apps(data_dir: Option<PathBuf>) -> Result<()> {
    let context = builder(data_dir)?.build()?;
    let listing = context.aggregator().list_all_with_report().await;
    println!("{}", serde_json::to_string_pretty(&listing.apps)?);
    for failure in &listing.failures {
        warn!("{:?} source {} failed: {}", failure.stage, failure.origin, failure.error);
    }
    Ok(())
}

pub async fn resolve(data_dir: Option<PathBuf>, dev: bool) -> Result<()> {
    let context = builder(data_dir)?.with_dev_server(dev).build()?;
    let location = context.resolver().resolve().await;
    info!("Resolved {}", location);
    println!("{}", location.to_url());
    Ok(())
}

pub async fn update(data_dir: Option<PathBuf>, watch: bool, prereleases: bool) -> Result<()> {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<DownloadProgress>(16);
    let source = GitHubReleaseSource::new()?.with_progress(progress_tx);
    let context = builder(data_dir)?
        .with_prereleases(prereleases)
        .with_release_source(Arc::new(source))
        .build()?;
    let resolver = Arc::clone(context.resolver());

    tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            match progress.percent() {
                Some(percent) => info!("Downloaded {:.0}%", percent),
                None => info!("Downloaded {} bytes", progress.bytes_downloaded),
            }
        }
    });

    if !watch {
        let outcome = resolver
            .check_for_update(&CancellationToken::new())
            .await
            .context("update check failed")?;
        match outcome {
            UpdateOutcome::Downloaded(entry) => {
                println!("downloaded {} to {}", entry.version, entry.location.display())
            }
            UpdateOutcome::UpToDate { cached: Some(version) } => println!("up to date ({})", version),
            UpdateOutcome::UpToDate { cached: None } => println!("no releases published"),
            UpdateOutcome::AlreadyInProgress => println!("an update is already in progress"),
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let handle = resolver.spawn_update_loop(UpdateSchedule::default(), cancel.clone());
    info!("Watching for Grid UI updates, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    cancel.cancel();
    handle.await?;
    Ok(())
}
