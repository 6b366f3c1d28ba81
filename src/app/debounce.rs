// ==========================================
// Site Progress - debounced stage saver
// ==========================================
// Serializes user edits per (plot, stage): an edit schedules a save
// after a quiet period, and any newer edit for the same stage aborts
// and reschedules the pending save. Mirrors the dialog's behaviour of
// clearing and re-arming a 2-second timer per stage.
//
// Saves are fire-and-forget from the caller's perspective; outcomes
// (including every failure) are pushed to the outcome channel so the
// consuming UI can show a status indicator. Atomicity of the save
// itself is the repository's job.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::api::progress_api::{ProgressApi, UpdateProgressRequest};

/// Default quiet period before a pending edit is saved
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 2_000;

/// Result of one debounced save, delivered on the outcome channel
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub plot_id: String,
    pub stage_id: String,
    pub ok: bool,
    pub message: String,
}

type StageKey = (String, String);

// ==========================================
// DebouncedStageSaver
// ==========================================
pub struct DebouncedStageSaver {
    api: Arc<ProgressApi>,
    quiet_period: Duration,
    pending: Mutex<HashMap<StageKey, JoinHandle<()>>>,
    outcomes: UnboundedSender<SaveOutcome>,
}

impl DebouncedStageSaver {
    /// Create a saver and the channel its save outcomes arrive on
    pub fn new(
        api: Arc<ProgressApi>,
        quiet_period: Duration,
    ) -> (Arc<Self>, UnboundedReceiver<SaveOutcome>) {
        let (tx, rx) = unbounded_channel();
        let saver = Arc::new(Self {
            api,
            quiet_period,
            pending: Mutex::new(HashMap::new()),
            outcomes: tx,
        });
        (saver, rx)
    }

    /// Schedule a save for after the quiet period
    ///
    /// A pending save for the same (plot, stage) is superseded: its
    /// task is aborted and the timer restarts with the new request.
    pub fn schedule(
        self: &Arc<Self>,
        request: UpdateProgressRequest,
        today: NaiveDate,
        now: NaiveDateTime,
    ) {
        let key: StageKey = (request.plot_id.clone(), request.stage_id.clone());

        let saver = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(saver.quiet_period).await;
            saver.save_now(&request, today, now);
        });

        let mut pending = self.pending_guard();
        if let Some(previous) = pending.insert(key, handle) {
            previous.abort();
        }
    }

    /// Number of saves currently waiting out their quiet period
    pub fn pending_count(&self) -> usize {
        let pending = self.pending_guard();
        pending.iter().filter(|(_, h)| !h.is_finished()).count()
    }

    /// A poisoned lock only means a holder panicked mid-update; the map
    /// itself stays usable, so recover it rather than taking the save
    /// path down with it
    fn pending_guard(&self) -> std::sync::MutexGuard<'_, HashMap<StageKey, JoinHandle<()>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("pending save map lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn save_now(&self, request: &UpdateProgressRequest, today: NaiveDate, now: NaiveDateTime) {
        let outcome = match self.api.record_progress(request, today, now) {
            Ok(progress) => SaveOutcome {
                plot_id: request.plot_id.clone(),
                stage_id: request.stage_id.clone(),
                ok: true,
                message: format!("saved at {}%", progress.completion_percentage),
            },
            Err(e) => {
                tracing::warn!(
                    plot_id = %request.plot_id,
                    stage_id = %request.stage_id,
                    error = %e,
                    "debounced save failed"
                );
                SaveOutcome {
                    plot_id: request.plot_id.clone(),
                    stage_id: request.stage_id.clone(),
                    ok: false,
                    message: e.to_string(),
                }
            }
        };
        // Receiver gone means no UI is listening; nothing left to notify
        let _ = self.outcomes.send(outcome);
    }
}
