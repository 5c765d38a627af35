use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_radar::config::Config;
use review_radar::github::{OctocrabClient, PrFetcher};
use review_radar::notify::{NoopNotifier, Notifier, SlackNotifier};
use review_radar::scheduler::Scheduler;
use review_radar::server::{build_router, AppState};
use review_radar::store::PrStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_radar=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let client = OctocrabClient::from_token(config.github_token.clone(), config.repo.clone())?;
    let fetcher: Arc<dyn PrFetcher> = Arc::new(client);

    let notifier: Arc<dyn Notifier> = match &config.slack_webhook_url {
        Some(url) => Arc::new(SlackNotifier::new(url.clone())),
        None => {
            tracing::warn!("SLACK_WEBHOOK_URL not set; notifications are disabled");
            Arc::new(NoopNotifier)
        }
    };

    let store = PrStore::new();

    let shutdown = CancellationToken::new();
    let scheduler = Scheduler::new(
        store.clone(),
        fetcher.clone(),
        notifier.clone(),
        config.clone(),
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let app_state = AppState::new(
        store,
        fetcher,
        notifier,
        config.repo.clone(),
        config.webhook_secret.clone(),
        config.stale_threshold_hours,
    );
    let app = build_router(app_state);

    tracing::info!(repo = %config.repo, addr = %config.bind_addr, "Listening");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // The signal handler cancels the token; await the scheduler so its final
    // log lines land before exit.
    shutdown.cancel();
    let _ = scheduler_handle.await;

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(error) => {
            tracing::error!(error = %error, "Failed to install Ctrl-C handler");
            // Run until the process is killed externally.
            std::future::pending::<()>().await;
        }
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
