use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::tasks::exam_sessions;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![
        tokio::spawn(proctoring_loop(state.clone(), shutdown_rx.clone())),
        tokio::spawn(expiry_loop(state.clone(), shutdown_rx.clone())),
    ];

    let proctoring = state.settings().proctoring();
    tracing::info!(
        tick_seconds = proctoring.tick_seconds,
        violation_probability = proctoring.violation_probability,
        expiry_sweep_seconds = proctoring.expiry_sweep_seconds,
        "Worker loops started"
    );

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn proctoring_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let seconds = state.settings().proctoring().tick_seconds.max(1);
    let mut tick = interval(Duration::from_secs(seconds));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = exam_sessions::simulate_proctoring_tick(&state).await {
                    tracing::error!(error = %format!("{err:#}"), "simulate_proctoring_tick failed");
                }
            }
        }
    }
}

async fn expiry_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let seconds = state.settings().proctoring().expiry_sweep_seconds.max(1);
    let mut tick = interval(Duration::from_secs(seconds));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = exam_sessions::submit_expired_sessions(&state).await {
                    tracing::error!(error = %format!("{err:#}"), "submit_expired_sessions failed");
                }
            }
        }
    }
}
