use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boost_bot::config::{AgentConfig, Credentials, DEFAULT_WAIT_SECS, PhraseSource};
use boost_bot::feed::HttpFeedClient;
use boost_bot::filter::DedupFilter;
use boost_bot::listener::EventListener;
use boost_bot::supervisor::{ReconnectPolicy, Supervisor};
use boost_bot::worker::{ActionQueue, ActionWorker};

/// Boosts messages that ask for new music.
#[derive(Debug, Parser)]
#[command(name = "boost-bot", version, about)]
struct Args {
    /// Path to the JSON credentials file.
    config_path: PathBuf,

    /// Path to the newline-delimited trigger phrase file.
    phrases_path: PathBuf,

    /// Minimum number of seconds between two boosts. Must be at least 1.
    #[arg(
        short = 'w',
        long = "wait_time",
        default_value_t = DEFAULT_WAIT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    wait_time: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boost_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let credentials = Credentials::load(&args.config_path).context("loading credentials")?;
    let phrase_source = PhraseSource::new(&args.phrases_path);
    let phrases = phrase_source.load().context("loading trigger phrases")?;
    let config = AgentConfig::from_env(Duration::from_secs(args.wait_time));
    let track = config.track_keywords(phrases.as_slice());

    info!(
        phrases = phrases.len(),
        wait_secs = config.wait_interval.as_secs(),
        order = %config.queue_order,
        "Starting boost bot"
    );

    let mut client = HttpFeedClient::new(credentials);
    if let Some(url) = &config.stream_url {
        client = client.with_stream_url(url);
    }
    if let Some(url) = &config.api_url {
        client = client.with_api_url(url);
    }
    let client = Arc::new(client);

    let shutdown = CancellationToken::new();
    let queue = ActionQueue::new(config.queue_order);

    let worker = ActionWorker::new(Arc::clone(&client), queue.clone(), config.wait_interval);
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let (phrase_tx, phrase_rx) = watch::channel(phrases.clone());
    let reload_handle = spawn_phrase_reload(phrase_source, phrase_tx, shutdown.clone());

    let listener = EventListener::new(DedupFilter::new(phrases), queue, config.cooldown)
        .with_phrase_updates(phrase_rx);
    let mut supervisor = Supervisor::new(
        client,
        listener,
        track,
        ReconnectPolicy::from_config(&config),
    );

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    supervisor.run(&shutdown).await;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!(error = %e, "Action worker task failed");
    }
    if let Some(handle) = reload_handle
        && let Err(e) = handle.await
    {
        error!(error = %e, "Phrase reload task failed");
    }

    info!("boost-bot shut down");
    Ok(())
}

#[cfg(unix)]
fn spawn_phrase_reload(
    source: PhraseSource,
    tx: watch::Sender<boost_bot::filter::PhraseSet>,
    shutdown: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    Some(tokio::spawn(async move {
        if let Err(e) = boost_bot::config::reload_on_hangup(source, tx, shutdown).await {
            warn!(error = %e, "Could not install SIGHUP handler, phrase reload disabled");
        }
    }))
}

#[cfg(not(unix))]
fn spawn_phrase_reload(
    _source: PhraseSource,
    _tx: watch::Sender<boost_bot::filter::PhraseSet>,
    _shutdown: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    None
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
