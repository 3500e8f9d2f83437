use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use log::{LevelFilter, error, info};
use tokio_util::sync::CancellationToken;

use github_releases_exporter::{
    CachedReleaseClient, ConfigLoader, ConfigReloader, GITHUB_REST_ENDPOINT, MemoryCache,
    MetricsServer, PaginatedReleaseClient, ReleasesCollector, RestFetcher, ShutdownSignal,
    StdResult, SystemClock, YamlConfigLoader,
};

/// Command line arguments for the GitHub releases exporter
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Address to bind the server
    #[arg(short, long, default_value = "0.0.0.0:9333")]
    bind: SocketAddr,

    /// Config file listing the repositories to export
    #[arg(short, long, default_value = "releases.yml")]
    config_file: PathBuf,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, default_value = GITHUB_REST_ENDPOINT)]
    github_api_url: String,

    /// Maximum number of releases exported per repository, 0 for all of them
    #[arg(short, long, default_value_t = 0)]
    max_releases: usize,

    /// Time to live of the cached GitHub responses, in seconds
    #[arg(long, default_value_t = 900)]
    cache_ttl_secs: u64,

    /// Maximum time spent waiting for rate limits in a single request, in seconds
    #[arg(long, default_value_t = 3600)]
    max_rate_limit_wait_secs: u64,

    /// Show debug logs
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let args = Args::parse();
    init_logger(args.debug);
    info!("Starting GitHub releases exporter");

    let shutdown = CancellationToken::new();
    let clock = Arc::new(SystemClock);
    let fetcher = Arc::new(RestFetcher::try_new(
        &args.github_api_url,
        args.github_token.as_deref(),
    )?);
    let cache = Arc::new(MemoryCache::new(
        Duration::from_secs(args.cache_ttl_secs),
        clock.clone(),
    ));
    let client = Arc::new(CachedReleaseClient::new(
        Arc::new(PaginatedReleaseClient::new(
            fetcher,
            clock,
            args.max_releases,
            Duration::from_secs(args.max_rate_limit_wait_secs),
            shutdown.clone(),
        )),
        cache.clone(),
    ));

    let loader = Arc::new(YamlConfigLoader::new(&args.config_file));
    let config = loader.load().await?;
    info!(
        "Loaded {} repositories from {}",
        config.repositories.len(),
        args.config_file.display()
    );
    let collector = Arc::new(ReleasesCollector::try_new(client.clone(), config)?);

    let reloader = ConfigReloader::new(loader, collector.clone(), cache);
    let reloader_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = reloader.run_on_hangup(reloader_shutdown).await {
            error!("Config reloader stopped: {e:#}");
        }
    });

    let signal = ShutdownSignal::register()?;
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal.cancel_on_signal(signal_shutdown).await {
            error!("Failed to listen for stop signals: {e:#}");
        }
    });

    MetricsServer::new(collector, client)
        .serve(args.bind, shutdown)
        .await?;
    info!("Exporter stopped");

    Ok(())
}

fn init_logger(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}
