use anyhow::{Context, Result};
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics;
use crate::db::models::ProctoringEvent;
use crate::repositories;
use crate::repositories::proctoring_events::CreateEvent;
use crate::services::proctoring::ViolationKind;

/// Stores one violation against an in-progress session and bumps its
/// counter. Returns `None` when the session is no longer in progress.
pub(crate) async fn record(
    pool: &PgPool,
    session_id: &str,
    kind: ViolationKind,
    confidence_score: f64,
    flag_at: u32,
    now: PrimitiveDateTime,
) -> Result<Option<(ProctoringEvent, i32)>> {
    let mut tx = pool.begin().await.context("Failed to begin violation transaction")?;

    let flag_at = i32::try_from(flag_at).unwrap_or(i32::MAX);
    let Some(count) = repositories::sessions::record_violation(&mut *tx, session_id, flag_at, now)
        .await
        .context("Failed to bump violation counter")?
    else {
        return Ok(None);
    };

    let event_id = Uuid::new_v4().to_string();
    let event = repositories::proctoring_events::create(
        &mut *tx,
        CreateEvent {
            id: &event_id,
            session_id,
            event_type: kind.code,
            severity: kind.severity,
            confidence_score,
            description: kind.description,
            occurred_at: now,
        },
    )
    .await
    .context("Failed to insert proctoring event")?;

    tx.commit().await.context("Failed to commit violation")?;

    metrics::record_violation(kind.code);
    tracing::info!(
        session_id,
        violation = kind.code,
        violation_count = count,
        "Proctoring violation recorded"
    );

    Ok(Some((event, count)))
}
