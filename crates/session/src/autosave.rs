//! Background autosave.
//!
//! [`Autosave`] runs as a spawned task next to a session. It saves on a
//! fixed interval when the session is dirty, saves shortly after a critical
//! field loses focus (bursts within the debounce window collapse into one
//! save), and makes a final best-effort save when shut down. The loop also
//! exits on its own once the session is submitted or abandoned.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use wayfare_clients::WizardConfig;

use crate::controller::WizardSessionController;

/// Buffered blur notifications; extra ones are dropped since any pending
/// one already schedules a save.
const BLUR_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Autosave
// ---------------------------------------------------------------------------

/// Handle to a running autosave task.
pub struct Autosave {
    cancel: CancellationToken,
    blur_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Spawn the autosave loop for `controller`.
    pub fn spawn(controller: Arc<WizardSessionController>, config: &WizardConfig) -> Self {
        let cancel = controller.lifecycle().child_token();
        let (blur_tx, blur_rx) = mpsc::channel(BLUR_CHANNEL_CAPACITY);
        let period = if config.autosave_interval.is_zero() {
            let fallback = WizardConfig::default().autosave_interval;
            tracing::warn!(fallback_secs = fallback.as_secs(), "Zero autosave interval, using default");
            fallback
        } else {
            config.autosave_interval
        };
        let task = tokio::spawn(run(
            controller,
            period,
            config.critical_save_debounce,
            blur_rx,
            cancel.clone(),
        ));
        Self {
            cancel,
            blur_tx,
            task,
        }
    }

    /// A critical field lost focus; schedule a debounced save.
    pub fn critical_field_blurred(&self) {
        // Full or closed channel: a save is already pending or the loop ended.
        let _ = self.blur_tx.try_send(());
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop after a final save attempt and wait for it to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Autosave task failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

async fn run(
    controller: Arc<WizardSessionController>,
    period: Duration,
    debounce: Duration,
    mut blur_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Option<Pin<Box<Sleep>>> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                save(&controller, "shutdown").await;
                tracing::debug!("Autosave stopped");
                break;
            }
            _ = interval.tick() => {
                save(&controller, "interval").await;
            }
            Some(()) = blur_rx.recv() => {
                // Restart the window on every blur.
                pending = Some(Box::pin(tokio::time::sleep(debounce)));
            }
            _ = wait_pending(&mut pending), if pending.is_some() => {
                pending = None;
                save(&controller, "critical_field").await;
            }
        }
    }
}

async fn wait_pending(pending: &mut Option<Pin<Box<Sleep>>>) {
    match pending {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn save(controller: &WizardSessionController, trigger: &'static str) {
    match controller.save_if_dirty().await {
        Ok(Some(draft_id)) => tracing::debug!(trigger, draft_id = %draft_id, "Autosaved draft"),
        Ok(None) => {}
        // The controller has already raised a notice.
        Err(e) => tracing::warn!(trigger, error = %e, "Autosave failed"),
    }
}
