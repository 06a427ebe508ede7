//! # Operation Tracker
//!
//! Some API calls answer "202 Accepted" instead of a final result. The
//! tracker follows those operations to completion in the background so
//! the user can keep navigating.
//!
//! ```text
//! ArmClient ──observe()──► accept loop ──┐
//!                                        ▼
//!                         items: request URI → PollItem
//!                                        ▲
//!            every poll_interval ── poll loop ──GET poll URI──► Poller
//!                                        │
//!                                        └──► StatusEvent on the bus
//! ```
//!
//! The two loops share only the item map and the bus. Both run under one
//! [`CancellationToken`] and exit when it is cancelled.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ApiResponse};
use crate::core::bus::EventBus;
use crate::core::status::StatusEvent;

/// Provider header carrying the operation status URL.
pub const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";
/// Fallback header when the provider only sets a location to poll.
pub const LOCATION_HEADER: &str = "Location";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
/// How long an accepted operation's status message stays visible without updates.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(15 * 60);
/// Consecutive transport errors after which an operation is given up on.
pub const MAX_TRANSPORT_FAILURES: u32 = 3;

const ACCEPTED: u16 = 202;

#[derive(Debug)]
pub enum TrackerError {
    /// A 202 response carried neither polling header. The API contract is broken.
    MissingPollUrl { request_uri: String },
    /// The accept loop has shut down.
    Stopped,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::MissingPollUrl { request_uri } => write!(
                f,
                "accepted response for {request_uri} has no {ASYNC_OPERATION_HEADER} or {LOCATION_HEADER} header"
            ),
            TrackerError::Stopped => write!(f, "operation tracker is not running"),
        }
    }
}

impl std::error::Error for TrackerError {}

/// Issues the GET that checks an operation's progress.
#[async_trait]
pub trait Poller: Send + Sync {
    async fn poll(&self, uri: &str) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub operation_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// One operation under observation.
#[derive(Debug, Clone)]
pub struct PollItem {
    pub request_uri: String,
    pub poll_uri: String,
    pub title: String,
    pub retry_count: u32,
    pub transport_failures: u32,
    pub status: StatusEvent,
}

#[derive(Debug)]
struct Accepted {
    request_uri: String,
    poll_uri: String,
    title: String,
}

type Items = Arc<Mutex<HashMap<String, PollItem>>>;

fn lock_items(items: &Items) -> MutexGuard<'_, HashMap<String, PollItem>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ingestion point handed to the HTTP client.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<Accepted>,
}

impl TrackerHandle {
    /// Inspects one API response. Returns `Ok(true)` when it started (or
    /// refreshed) tracking, `Ok(false)` when the response is not an
    /// accepted operation.
    pub fn observe(&self, response: &ApiResponse) -> Result<bool, TrackerError> {
        if response.status != ACCEPTED {
            return Ok(false);
        }
        let Some(poll_uri) = response
            .header(ASYNC_OPERATION_HEADER)
            .or_else(|| response.header(LOCATION_HEADER))
        else {
            error!("202 from {} {} without a polling header", response.method, response.uri);
            return Err(TrackerError::MissingPollUrl {
                request_uri: response.uri.clone(),
            });
        };

        let accepted = Accepted {
            request_uri: response.uri.clone(),
            poll_uri: poll_uri.to_string(),
            title: operation_title(&response.method, &response.uri),
        };
        debug!("Accepted operation {} → {}", accepted.request_uri, accepted.poll_uri);
        self.tx.send(accepted).map_err(|_| TrackerError::Stopped)?;
        Ok(true)
    }
}

/// "DELETE my-group" from a method and request URI.
fn operation_title(method: &str, uri: &str) -> String {
    let path = uri.split('?').next().unwrap_or(uri);
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    format!("{method} {name}")
}

pub struct Tracker {
    handle: TrackerHandle,
    items: Items,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Tracker {
    /// Spawns the accept and poll loops. Both stop when `cancel` fires.
    pub fn start(
        bus: EventBus,
        poller: Arc<dyn Poller>,
        config: TrackerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let items: Items = Arc::default();

        let accept = tokio::spawn(accept_loop(
            rx,
            items.clone(),
            bus.clone(),
            config.operation_timeout,
            cancel.clone(),
        ));
        let poll = tokio::spawn(poll_loop(
            items.clone(),
            bus,
            poller,
            config.poll_interval,
            cancel.clone(),
        ));
        info!(
            "Operation tracker started, polling every {}s",
            config.poll_interval.as_secs_f32()
        );

        Self {
            handle: TrackerHandle { tx },
            items,
            cancel,
            tasks: vec![accept, poll],
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        self.handle.clone()
    }

    /// Snapshot of the operations still being polled.
    pub fn tracked(&self) -> Vec<PollItem> {
        lock_items(&self.items).values().cloned().collect()
    }

    /// Cancels both loops and waits for them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Tracker task ended abnormally: {}", e);
            }
        }
        info!("Operation tracker stopped");
    }
}

async fn accept_loop(
    mut rx: mpsc::UnboundedReceiver<Accepted>,
    items: Items,
    bus: EventBus,
    operation_timeout: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Accept loop cancelled");
                return;
            }
            accepted = rx.recv() => match accepted {
                Some(accepted) => register(&items, &bus, accepted, operation_timeout),
                None => {
                    debug!("All tracker handles dropped, accept loop exiting");
                    return;
                }
            }
        }
    }
}

fn register(items: &Items, bus: &EventBus, accepted: Accepted, operation_timeout: Duration) {
    let mut items = lock_items(items);
    if let Some(existing) = items.get_mut(&accepted.request_uri) {
        info!("Operation {} accepted again, re-tracking", accepted.request_uri);
        existing.poll_uri = accepted.poll_uri;
        existing.retry_count = 0;
        existing.transport_failures = 0;
        existing.status.in_progress = true;
        existing.status.message = format!("{}: accepted, waiting for completion", existing.title);
        existing.status.update(bus);
        return;
    }

    info!("Tracking operation {} via {}", accepted.request_uri, accepted.poll_uri);
    let mut status = StatusEvent::in_progress(format!(
        "{}: accepted, waiting for completion",
        accepted.title
    ))
    .with_timeout(operation_timeout)
    .toast();
    status.send(bus);
    items.insert(
        accepted.request_uri.clone(),
        PollItem {
            request_uri: accepted.request_uri,
            poll_uri: accepted.poll_uri,
            title: accepted.title,
            retry_count: 0,
            transport_failures: 0,
            status,
        },
    );
}

async fn poll_loop(
    items: Items,
    bus: EventBus,
    poller: Arc<dyn Poller>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Poll loop cancelled");
                return;
            }
            _ = ticker.tick() => sweep(&items, &bus, poller.as_ref()).await,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PollState {
    Running,
    Succeeded,
    Failed(String),
}

#[derive(Deserialize)]
struct OperationBody {
    status: Option<String>,
}

fn classify(response: &ApiResponse) -> PollState {
    if response.status == ACCEPTED {
        return PollState::Running;
    }
    if !response.is_success() {
        return PollState::Failed(format!("HTTP {}", response.status));
    }
    let status = serde_json::from_str::<OperationBody>(&response.body)
        .ok()
        .and_then(|b| b.status);
    match status.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("inprogress" | "running" | "accepted" | "creating" | "updating" | "deleting") => {
            PollState::Running
        }
        Some(failed @ ("failed" | "canceled" | "cancelled")) => PollState::Failed(failed.to_string()),
        _ => PollState::Succeeded,
    }
}

/// Polls every in-progress item once and drops the ones that finished.
async fn sweep(items: &Items, bus: &EventBus, poller: &dyn Poller) {
    let targets: Vec<(String, String)> = lock_items(items)
        .values()
        .filter(|item| item.status.in_progress)
        .map(|item| (item.request_uri.clone(), item.poll_uri.clone()))
        .collect();
    if targets.is_empty() {
        return;
    }
    debug!("Polling {} operation(s)", targets.len());

    let results = join_all(targets.into_iter().map(|(key, uri)| async move {
        let result = poller.poll(&uri).await;
        (key, uri, result)
    }))
    .await;

    let mut items = lock_items(items);
    for (key, polled_uri, result) in results {
        let Some(item) = items.get_mut(&key) else {
            continue;
        };
        if item.poll_uri != polled_uri {
            debug!("{} was re-accepted during the sweep, ignoring result for {}", key, polled_uri);
            continue;
        }
        item.retry_count += 1;
        match result {
            Ok(response) => {
                item.transport_failures = 0;
                match classify(&response) {
                    PollState::Running => {
                        item.status.message =
                            format!("{}: in progress (check {})", item.title, item.retry_count);
                        item.status.update(bus);
                    }
                    PollState::Succeeded => {
                        info!("Operation {} completed", item.request_uri);
                        item.status.message = format!("{}: completed", item.title);
                        item.status.done(bus);
                    }
                    PollState::Failed(reason) => {
                        warn!("Operation {} failed: {}", item.request_uri, reason);
                        item.status.message = format!("{}: failed ({reason})", item.title);
                        item.status.failure = true;
                        item.status.done(bus);
                    }
                }
            }
            Err(e) => {
                item.transport_failures += 1;
                warn!(
                    "Polling {} failed ({}/{}): {}",
                    item.poll_uri, item.transport_failures, MAX_TRANSPORT_FAILURES, e
                );
                if item.transport_failures >= MAX_TRANSPORT_FAILURES {
                    item.status.message = format!("{}: lost track of operation ({e})", item.title);
                    item.status.failure = true;
                    item.status.done(bus);
                }
            }
        }
    }
    items.retain(|_, item| item.status.in_progress);
}
