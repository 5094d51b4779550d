mod api;
mod middleware;
mod scheduler;
mod worker;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    scheduler::FeedScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(argus_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = argus_db::PoolConfig::from_app_config(&config);
    let pool = argus_db::connect_pool(&config.database_url, pool_config).await?;
    argus_db::run_migrations(&pool).await?;

    let fetcher = Arc::new(argus_ingest::FeedFetcher::from_config(&config)?);
    let classifier = Arc::new(argus_classify::ClassificationService::from_config(&config)?);

    let feed_scheduler = Arc::new(FeedScheduler::new(pool.clone(), fetcher));
    feed_scheduler.start().await?;
    let _cron = scheduler::build_scheduler(
        Arc::clone(&feed_scheduler),
        &config.scheduler_reconcile_cron,
    )
    .await?;

    let _workers = worker::spawn_workers(pool.clone(), classifier, &config);

    let auth = AuthState::from_env(matches!(config.env, argus_core::Environment::Development))?;
    let app = build_app(
        AppState {
            pool,
            scheduler: feed_scheduler,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "argus server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
