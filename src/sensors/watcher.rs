//! Periodic polling of a [`TemperatureSource`] with change detection.
//!
//! A [`Watcher`] owns one background task that reads the source once per
//! interval and reports on two independent channels: changed temperatures
//! and read failures. Each tick produces at most one message on exactly one
//! of them.
//!
//! Both channels are bounded. When a channel is full the task waits for the
//! consumer before polling again, so the sensor is never read faster than
//! events are drained. A consumer that only drains one channel will stall
//! the task once the other fills up; drain both (e.g. with `tokio::select!`)
//! or size the queues with [`Watcher::with_capacity`].

use super::{Temperature, TemperatureSource};
use crate::error::SensorError;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Shortest poll interval a watcher will use.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A temperature that differs from the previously emitted one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub temperature: Temperature,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    fn now(temperature: Temperature) -> Self {
        Self {
            temperature,
            observed_at: Utc::now(),
        }
    }
}

/// Builder for a polling task over a temperature source.
pub struct Watcher<S> {
    source: Arc<S>,
    interval: Duration,
    capacity: usize,
}

impl<S: TemperatureSource> Watcher<S> {
    /// Create a watcher polling `source` every `interval`.
    ///
    /// Output channels default to a capacity of one message each.
    /// Intervals shorter than [`MIN_INTERVAL`] are raised to it.
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source: Arc::new(source),
            interval: interval.max(MIN_INTERVAL),
            capacity: 1,
        }
    }

    /// Set the queue depth of each output channel (minimum 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Start polling. The first read happens one full interval from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> Watch {
        let (changes_tx, changes) = mpsc::channel(self.capacity);
        let (errors_tx, errors) = mpsc::channel(self.capacity);
        let token = CancellationToken::new();

        let task = tokio::spawn(run(
            self.source,
            self.interval,
            changes_tx,
            errors_tx,
            token.clone(),
        ));

        Watch {
            changes,
            errors,
            control: WatchControl { token, task },
        }
    }
}

/// Output of a running [`Watcher`].
pub struct Watch {
    pub changes: mpsc::Receiver<ChangeEvent>,
    pub errors: mpsc::Receiver<SensorError>,
    pub control: WatchControl,
}

/// Stop signal and join handle for a watcher task.
///
/// A stopped watcher cannot be resumed; spawn a new one instead.
pub struct WatchControl {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchControl {
    /// Ask the task to stop at the next tick boundary.
    ///
    /// A send blocked on a full channel is abandoned immediately.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.task.is_finished()
    }

    /// Wait for the task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Watcher task failed: {}", e);
        }
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

async fn run<S: TemperatureSource>(
    source: Arc<S>,
    interval: Duration,
    changes: mpsc::Sender<ChangeEvent>,
    errors: mpsc::Sender<SensorError>,
    token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Temperature> = None;

    info!("Watching temperature every {:?}", interval);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if changes.is_closed() && errors.is_closed() {
            debug!("All watch consumers dropped");
            break;
        }

        let reader = Arc::clone(&source);
        let outcome = match task::spawn_blocking(move || reader.read()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Sensor read task failed: {}", e);
                continue;
            }
        };

        let delivered = match outcome {
            Ok(temperature) if last == Some(temperature) => {
                debug!("Temperature unchanged at {}", temperature);
                true
            }
            Ok(temperature) => {
                debug!("Temperature changed to {}", temperature);
                last = Some(temperature);
                deliver(&changes, ChangeEvent::now(temperature), &token).await
            }
            Err(e) => {
                debug!("Sensor read failed: {}", e);
                deliver(&errors, e, &token).await
            }
        };

        if !delivered {
            break;
        }
    }

    info!("Stopped watching temperature");
}

/// Send `value`, giving up if the watch is cancelled first.
/// Returns false when the loop should end.
async fn deliver<T>(tx: &mpsc::Sender<T>, value: T, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        sent = tx.send(value) => {
            if sent.is_err() {
                debug!("Watch consumer dropped");
            }
            sent.is_ok()
        }
    }
}
