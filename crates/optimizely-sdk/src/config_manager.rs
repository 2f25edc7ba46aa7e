//! The polling project-config manager (§4.2, L3): a single cooperative
//! Tokio background task that refreshes the datafile on a cadence,
//! atomically publishes new snapshots, and fans out update notifications.

use std::{
    sync::{
        atomic::{
            AtomicU8,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    datafile::parse_datafile,
    project_config::ProjectConfig,
    requester::{
        DatafileTransport,
        FetchOutcome,
    },
};

/// Polling interval is clamped to a 30-second floor at construction --
/// anything shorter risks hammering the CDN across a fleet of SDK
/// instances.
const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum ConfigManagerError {
    #[error("config manager has already been stopped")]
    AlreadyStopped,
    #[error("config manager is already running")]
    AlreadyRunning,
}

/// `{Idle -> Running -> Stopped}`. `Stopped` is terminal: `start()` on an
/// already-stopped manager fails rather than silently restarting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ManagerStateInner {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Running,
    Stopped,
}

/// Fanned out to subscribers after every snapshot publication that changes
/// the revision. No notification is sent for a 304 (nothing changed) or a
/// failed parse (the previous snapshot, and its revision, survive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUpdateNotification {
    pub revision: String,
}

#[derive(Debug, Clone)]
pub struct ConfigManagerConfig {
    pub polling_interval: Duration,
    /// Bytes for the initial snapshot, when the caller already has a
    /// datafile in hand (e.g. bundled at build time) and doesn't want to
    /// block `start()` on the first network round-trip.
    pub initial_datafile: Option<Vec<u8>>,
}

impl ConfigManagerConfig {
    pub fn new(polling_interval: Duration) -> Self {
        Self {
            polling_interval: polling_interval.max(MIN_POLLING_INTERVAL),
            initial_datafile: None,
        }
    }

    pub fn with_initial_datafile(mut self, bytes: Vec<u8>) -> Self {
        self.initial_datafile = Some(bytes);
        self
    }
}

impl Default for ConfigManagerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLLING_INTERVAL)
    }
}

/// The lock-free snapshot cell + background refresh task. Readers call
/// [`PollingConfigManager::get_config`] from any thread at any time with
/// no locking; the polling task is the only writer and publishes with a
/// single `ArcSwap::store`, so readers always observe either the entire
/// old snapshot or the entire new one.
pub struct PollingConfigManager {
    snapshot: Arc<ArcSwap<ProjectConfig>>,
    state: Arc<AtomicU8>,
    cancellation: CancellationToken,
    notifications: broadcast::Sender<ConfigUpdateNotification>,
    config: ConfigManagerConfig,
    transport: Arc<dyn DatafileTransport>,
    last_etag: Arc<ArcSwap<Option<String>>>,
    task: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PollingConfigManager {
    pub fn new(transport: Arc<dyn DatafileTransport>, config: ConfigManagerConfig) -> Result<Self, optimizely_sdk_types::ConfigurationError> {
        let initial = match &config.initial_datafile {
            Some(bytes) => parse_datafile(bytes)?,
            None => ProjectConfig::empty(),
        };
        let (notifications, _) = broadcast::channel(32);
        Ok(Self {
            snapshot: Arc::new(ArcSwap::from_pointee(initial)),
            state: Arc::new(AtomicU8::new(ManagerStateInner::Idle as u8)),
            cancellation: CancellationToken::new(),
            notifications,
            config,
            transport,
            last_etag: Arc::new(ArcSwap::from_pointee(None)),
            task: tokio::sync::Mutex::new(None),
        })
    }

    pub fn get_config(&self) -> Arc<ProjectConfig> {
        self.snapshot.load_full()
    }

    pub fn state(&self) -> ManagerState {
        match self.state.load(Ordering::SeqCst) {
            x if x == ManagerStateInner::Idle as u8 => ManagerState::Idle,
            x if x == ManagerStateInner::Running as u8 => ManagerState::Running,
            _ => ManagerState::Stopped,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigUpdateNotification> {
        self.notifications.subscribe()
    }

    /// Spawns the single background polling task. Fails if the manager has
    /// already been stopped or is already running.
    pub async fn start(self: &Arc<Self>) -> Result<(), ConfigManagerError> {
        let current = self.state.load(Ordering::SeqCst);
        if current == ManagerStateInner::Stopped as u8 {
            return Err(ConfigManagerError::AlreadyStopped);
        }
        if current == ManagerStateInner::Running as u8 {
            return Err(ConfigManagerError::AlreadyRunning);
        }
        self.state.store(ManagerStateInner::Running as u8, Ordering::SeqCst);

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.poll_loop().await });
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Terminates the polling task at the next safe point (between HTTP
    /// attempts or between sleeps) and marks the manager `Stopped`, its
    /// terminal state.
    pub async fn stop(&self) {
        self.cancellation.cancel();
        self.state.store(ManagerStateInner::Stopped as u8, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn poll_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    tracing::info!("config manager poll loop cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.config.polling_interval) => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let previous_etag = self.last_etag.load_full();
        let outcome = tokio::select! {
            _ = self.cancellation.cancelled() => return,
            outcome = self.transport.get(previous_etag.as_deref()) => outcome,
        };

        match outcome {
            Ok(FetchOutcome::NotModified) => {
                tracing::debug!("datafile not modified");
            },
            Ok(FetchOutcome::Modified { bytes, etag }) => match parse_datafile(&bytes) {
                Ok(new_config) => {
                    let revision = new_config.revision.clone();
                    self.snapshot.store(Arc::new(new_config));
                    self.last_etag.store(Arc::new(etag));
                    tracing::info!(revision = %revision, "published new project configuration");
                    // A lagging subscriber is the receiver's problem, not
                    // the publisher's: `send` never blocks, and overflow
                    // is visible to slow receivers as `RecvError::Lagged`
                    // rather than silently dropped.
                    if self.notifications.send(ConfigUpdateNotification { revision }).is_err() {
                        tracing::debug!("no subscribers for config update notification");
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, "failed to parse datafile; retaining previous snapshot");
                },
            },
            Err(e) => {
                tracing::warn!(error = %e, "datafile refresh failed; retaining previous snapshot");
            },
        }
    }
}
