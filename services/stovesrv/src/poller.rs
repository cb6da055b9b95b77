//! Poll coordinator
//!
//! Owns the only valid stove snapshot. A background loop polls on a fixed
//! cadence (and once right after startup); user commands go through the same
//! client and then ask for an immediate refresh, which pushes the next
//! periodic poll a full interval forward instead of stacking another one.
//!
//! ```text
//!            tick / refresh request
//!   ┌──────┐ ─────────────────────▶ ┌─────────┐
//!   │ Idle │                        │ Polling │
//!   └──────┘ ◀───────────────────── └─────────┘
//!        new snapshot, or previous one + failure
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duepi_evo::{StoveClient, StoveSnapshot};
use serde::Serialize;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entities::HvacMode;
use crate::error::{Result, StoveSrvError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
}

/// Published coordinator state; readers get a cheap clone
#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub phase: PollPhase,
    /// Last good snapshot, kept across failed polls
    pub snapshot: Option<Arc<StoveSnapshot>>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Completed poll attempts, successful or not
    pub polls: u64,
}

pub struct StoveCoordinator {
    client: Arc<dyn StoveClient>,
    interval: Duration,
    poll_timeout: Option<Duration>,
    state_tx: watch::Sender<PollState>,
    refresh: Notify,
    refresh_requested: AtomicBool,
    poll_lock: Mutex<()>,
}

impl std::fmt::Debug for StoveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoveCoordinator")
            .field("interval", &self.interval)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

impl StoveCoordinator {
    pub fn new(client: Arc<dyn StoveClient>, interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(PollState::default());
        Self {
            client,
            interval,
            poll_timeout: None,
            state_tx,
            refresh: Notify::new(),
            refresh_requested: AtomicBool::new(false),
            poll_lock: Mutex::new(()),
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Option<Duration>) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PollState {
        self.state_tx.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<StoveSnapshot>> {
        self.state_tx.borrow().snapshot.clone()
    }

    /// Poll now and publish the outcome
    ///
    /// On failure the previous snapshot stays published next to the error.
    pub async fn refresh(&self) -> Result<Arc<StoveSnapshot>> {
        let _guard = self.poll_lock.lock().await;

        self.state_tx.send_modify(|state| {
            state.phase = PollPhase::Polling;
            state.last_attempt = Some(Utc::now());
        });

        let outcome = match self.poll_timeout {
            Some(limit) => match timeout(limit, self.client.get_stove_data()).await {
                Ok(result) => result.map_err(|e| format!("Error updating stove data: {}", e)),
                Err(_) => Err(format!("Poll timed out after {}s", limit.as_secs_f64())),
            },
            None => self
                .client
                .get_stove_data()
                .await
                .map_err(|e| format!("Error updating stove data: {}", e)),
        };

        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.state_tx.send_modify(|state| {
                    state.phase = PollPhase::Idle;
                    state.snapshot = Some(Arc::clone(&snapshot));
                    state.last_update_success = true;
                    state.last_error = None;
                    state.last_success = Some(snapshot.updated_at);
                    state.consecutive_failures = 0;
                    state.polls += 1;
                });
                debug!("Stove data updated: {}", snapshot.status_text);
                Ok(snapshot)
            },
            Err(msg) => {
                self.record_failure(&msg);
                Err(StoveSrvError::update_failed(msg))
            },
        }
    }

    fn record_failure(&self, msg: &str) {
        warn!("{}", msg);
        self.state_tx.send_modify(|state| {
            state.phase = PollPhase::Idle;
            state.last_update_success = false;
            state.last_error = Some(msg.to_string());
            state.consecutive_failures += 1;
            state.polls += 1;
        });
    }

    /// Ask the loop for an immediate poll; repeated requests coalesce
    pub fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::SeqCst);
        self.refresh.notify_one();
    }

    /// Run the poll loop until cancelled, then disconnect the client
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("Poll loop started, interval {:?}", self.interval);

        let mut next = Instant::now();
        if let Err(e) = self.client.connect().await {
            self.record_failure(&format!("Connection failed: {}", e));
            next += self.interval;
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.refresh.notified() => {
                    // Stale wakeup; the request was served by an earlier poll
                    if !self.refresh_requested.load(Ordering::SeqCst) {
                        continue;
                    }
                    debug!("Refresh requested");
                },
                () = sleep_until(next) => {},
            }

            // Requests made from here on need a poll of their own
            self.refresh_requested.store(false, Ordering::SeqCst);

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = self.refresh() => {},
            }
            next = Instant::now() + self.interval;
        }

        // A poll cut short by cancellation never reached its own Idle update
        self.state_tx.send_if_modified(|state| {
            std::mem::replace(&mut state.phase, PollPhase::Idle) != PollPhase::Idle
        });
        self.client.disconnect().await;
        info!("Poll loop stopped");
    }

    // ========================================================================
    // Command forwarding
    // ========================================================================

    pub async fn power_on(&self) -> Result<()> {
        self.client.power_on().await?;
        self.request_refresh();
        Ok(())
    }

    pub async fn power_off(&self) -> Result<()> {
        self.client.power_off().await?;
        self.request_refresh();
        Ok(())
    }

    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<()> {
        match mode {
            HvacMode::Heat => self.power_on().await,
            HvacMode::Off => self.power_off().await,
        }
    }

    pub async fn set_power_level(&self, level: i32) -> Result<()> {
        self.client.set_power_level(level).await?;
        self.request_refresh();
        Ok(())
    }

    pub async fn set_target_temperature(&self, temp: f64) -> Result<()> {
        self.client.set_target_temperature(temp).await?;
        self.request_refresh();
        Ok(())
    }

    pub async fn reset_error(&self) -> Result<()> {
        self.client.reset_error().await?;
        self.request_refresh();
        Ok(())
    }
}
