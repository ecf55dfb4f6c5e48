pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::services::seeding::{self, SeedSummary};
use crate::services::table_api::TableApiClient;

async fn connect_redis(settings: &Settings) -> RedisHandle {
    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without cache");
    } else {
        tracing::info!("Redis connected successfully");
    }
    redis
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = connect_redis(&settings).await;
    let state = AppState::new(settings, db_pool, redis.clone());

    if let Err(err) = core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "IntelliHire API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = connect_redis(&settings).await;
    let state = AppState::new(settings, db_pool, redis.clone());

    let result = tasks::scheduler::run(state).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

/// Generates the demo dataset and pushes it through the table API. With
/// `dry_run` nothing leaves the process; the planned row counts are printed.
pub async fn run_seed(dry_run: bool, reset: bool, verbose: bool) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_cli_tracing(verbose);

    let mut rng = StdRng::from_entropy();
    let data = seeding::generate(&mut rng, core::time::primitive_now_utc());

    if dry_run {
        tracing::info!("Dry run; no rows will be written");
        print_summary("Planned rows", &SeedSummary::planned(&data));
        return Ok(());
    }

    let settings = Settings::load()?;
    let client = TableApiClient::from_settings(&settings).context("Table API not configured")?;

    if reset {
        tracing::info!("Clearing previously seeded tables");
        seeding::reset(&client).await?;
    }

    tracing::info!("Seeding demo data");
    let summary = seeding::execute(&client, &data).await?;
    print_summary("Inserted rows", &summary);

    Ok(())
}

fn print_summary(title: &str, summary: &SeedSummary) {
    println!("{title}:");
    for (label, count) in summary.lines() {
        println!("  {label:<18} {count}");
    }
}
