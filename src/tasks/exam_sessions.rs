use std::collections::HashMap;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::TestSettings;
use crate::repositories;
use crate::services::exam_finalize::{self, FinalizeMode, FinalizeOutcome};
use crate::services::scoring::Thresholds;
use crate::services::{exam_timer, proctoring, violations};

const EXPIRED_BATCH_SIZE: i64 = 200;

/// One pass of the violation simulator over every running session. Returns
/// how many violations were recorded.
pub(crate) async fn simulate_proctoring_tick(state: &AppState) -> Result<usize> {
    let sessions = repositories::sessions::list_in_progress(state.db())
        .await
        .context("Failed to fetch in-progress sessions")?;
    if sessions.is_empty() {
        return Ok(0);
    }

    let probability = state.settings().proctoring().violation_probability;
    let now = primitive_now_utc();
    let mut settings_by_test: HashMap<String, Option<TestSettings>> = HashMap::new();
    let mut rng = StdRng::from_entropy();
    let mut recorded = 0;

    for session in sessions {
        if exam_timer::is_expired(now, session.expires_at) {
            continue;
        }

        if !settings_by_test.contains_key(&session.test_id) {
            let test = repositories::tests::find_by_id(state.db(), &session.test_id)
                .await
                .context("Failed to fetch test")?;
            settings_by_test.insert(session.test_id.clone(), test.map(|test| test.settings.0));
        }
        let Some(Some(settings)) = settings_by_test.get(&session.test_id) else {
            continue;
        };
        if !proctoring::simulator_enabled(settings) {
            continue;
        }

        let Some(kind) = proctoring::roll(&mut rng, probability) else {
            continue;
        };
        let confidence = rng.gen_range(0.5..1.0);
        let thresholds = Thresholds::for_test(state.settings(), settings);

        if violations::record(state.db(), &session.id, kind, confidence, thresholds.max_violations, now)
            .await?
            .is_some()
        {
            recorded += 1;
        }
    }

    if recorded > 0 {
        tracing::debug!(recorded, "Proctoring tick recorded violations");
    }
    Ok(recorded)
}

/// Scores and closes sessions whose deadline passed, exactly as a manual
/// submit would. Returns how many sessions this pass finalized.
pub(crate) async fn submit_expired_sessions(state: &AppState) -> Result<usize> {
    let now = primitive_now_utc();
    let sessions = repositories::sessions::list_expired(state.db(), now, EXPIRED_BATCH_SIZE)
        .await
        .context("Failed to fetch expired sessions")?;

    let mut submitted = 0;
    for session in sessions {
        match exam_finalize::finalize_session(state, &session, FinalizeMode::AutoDeadline, now)
            .await
        {
            Ok(FinalizeOutcome::Finalized(_)) => submitted += 1,
            Ok(FinalizeOutcome::AlreadyFinished(_)) => {}
            Err(err) => {
                tracing::error!(
                    session_id = %session.id,
                    error = %format!("{err:#}"),
                    "Failed to auto-submit expired session"
                );
            }
        }
    }

    if submitted > 0 {
        tracing::info!(submitted, "Auto-submitted expired sessions");
    }
    Ok(submitted)
}
