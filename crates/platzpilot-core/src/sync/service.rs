use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{ApiError, LibraryGateway};
use crate::config::Config;
use crate::models::{Library, LibraryCategory, LibraryData};
use crate::storage::KeyValueStore;
use crate::subscribers::{ListenerId, Subscribers};

/// Durable storage key for the serialized snapshot
const CACHE_KEY: &str = "PlatzPilot_LibraryData";

/// Durable storage key for the snapshot expiry, unix milliseconds as decimal.
/// Written together with the snapshot, never independently.
const CACHE_EXPIRY_KEY: &str = "PlatzPilot_LibraryData_Expiry";

/// Errors surfaced to callers of the synchronizer.
///
/// A fetch failure only becomes visible when no usable snapshot exists at
/// all; otherwise the last known data is served instead.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("failed to fetch library data: {0}")]
    Fetch(Arc<ApiError>),

    #[error("no library data available")]
    NoData,
}

/// Freshness information about the current snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DataMetadata {
    pub last_fetch: Option<DateTime<Utc>>,
    pub has_data: bool,
    pub is_stale: bool,
}

/// Shared outcome of an in-flight fetch: `None` until it resolves.
type FetchSlot = Option<Result<Arc<LibraryData>, SyncError>>;

struct SyncState {
    snapshot: Option<Arc<LibraryData>>,
    last_fetch: Option<DateTime<Utc>>,
    in_flight: Option<watch::Receiver<FetchSlot>>,
}

impl SyncState {
    /// Install a freshly fetched snapshot. The snapshot and its timestamp
    /// always move together.
    fn install(&mut self, snapshot: Arc<LibraryData>, fetched_at: DateTime<Utc>) {
        self.snapshot = Some(snapshot);
        self.last_fetch = Some(fetched_at);
    }
}

/// What `refresh` decided to do after inspecting the current state.
enum Plan {
    Skip(Result<Arc<LibraryData>, SyncError>),
    Join(watch::Receiver<FetchSlot>),
    Fetch(watch::Sender<FetchSlot>),
}

/// The process-wide data synchronizer.
///
/// Construct one instance at startup, call
/// [`LibraryDataService::initialize`] once, and share it by reference.
/// At most one network fetch is ever in flight; concurrent callers share
/// the pending outcome instead of issuing duplicates.
pub struct LibraryDataService {
    gateway: Arc<dyn LibraryGateway>,
    store: Arc<dyn KeyValueStore>,
    config: Config,
    state: Mutex<SyncState>,
    subscribers: Subscribers<LibraryData>,
    initialized: AtomicBool,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    /// Handle back to the owning `Arc`, for handing the service to spawned
    /// tasks. Upgrades always succeed while any caller holds the service.
    self_ref: Weak<Self>,
}

impl LibraryDataService {
    pub fn new(
        gateway: Arc<dyn LibraryGateway>,
        store: Arc<dyn KeyValueStore>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            gateway,
            store,
            config,
            state: Mutex::new(SyncState {
                snapshot: None,
                last_fetch: None,
                in_flight: None,
            }),
            subscribers: Subscribers::new(),
            initialized: AtomicBool::new(false),
            refresh_task: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// Initialize the service: hydrate from the durable cache, kick off a
    /// background fetch, and start the periodic auto-refresh.
    ///
    /// Idempotent; later calls are no-ops. Must run inside a tokio runtime.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        self.load_from_cache();

        // Fetch fresh data in the background; the freshness short-circuit
        // makes this a no-op when the cache hydration was recent enough.
        if let Some(service) = self.self_ref.upgrade() {
            tokio::spawn(async move {
                if let Err(e) = service.refresh(false).await {
                    warn!(error = %e, "Initial background fetch failed");
                }
            });
        }

        self.start_auto_refresh();
        info!("Library data service initialized");
    }

    /// Register a listener called with each full new snapshot.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&LibraryData) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// The current snapshot, fetching if none is available yet.
    ///
    /// If a fetch is already underway the caller awaits its outcome rather
    /// than starting a second one.
    pub async fn get_all_data(&self) -> Result<Arc<LibraryData>, SyncError> {
        let waiter = {
            let state = self.state.lock().unwrap();
            if let Some(snapshot) = &state.snapshot {
                return Ok(Arc::clone(snapshot));
            }
            state.in_flight.clone()
        };

        if let Some(rx) = waiter {
            return Self::await_outcome(rx).await;
        }

        // Cold path: durable cache first, then a forced fetch
        self.load_from_cache();
        let hydrated = self.state.lock().unwrap().snapshot.clone();
        if let Some(snapshot) = hydrated {
            return Ok(snapshot);
        }
        self.refresh(true).await
    }

    /// The libraries of one category; `All` flattens the whole snapshot.
    pub async fn get_libraries_by_category(
        &self,
        category: LibraryCategory,
    ) -> Result<Vec<Library>, SyncError> {
        let data = self.get_all_data().await?;
        Ok(data.libraries_for(category))
    }

    /// Per-category record counts, including the synthetic `All` total.
    pub async fn category_counts(&self) -> Result<Vec<(LibraryCategory, usize)>, SyncError> {
        let data = self.get_all_data().await?;
        Ok(crate::summaries::category_counts(&data))
    }

    /// Fetch fresh data, or reuse what is current.
    ///
    /// Without `force`, an in-flight fetch or a still-fresh snapshot
    /// short-circuits to the current snapshot. With `force`, an in-flight
    /// fetch is joined (never duplicated) and a fresh snapshot is refetched.
    /// On failure the last known snapshot is returned if one exists.
    pub async fn refresh(&self, force: bool) -> Result<Arc<LibraryData>, SyncError> {
        let plan = {
            let mut state = self.state.lock().unwrap();
            if let Some(rx) = &state.in_flight {
                if force {
                    Plan::Join(rx.clone())
                } else {
                    debug!("Data fetch already in progress, skipping");
                    Plan::Skip(state.snapshot.clone().ok_or(SyncError::NoData))
                }
            } else if !force && !self.is_stale_at(state.last_fetch, Utc::now()) {
                debug!("Using cached data (still fresh)");
                Plan::Skip(state.snapshot.clone().ok_or(SyncError::NoData))
            } else {
                let (tx, rx) = watch::channel(None);
                state.in_flight = Some(rx);
                Plan::Fetch(tx)
            }
        };

        match plan {
            Plan::Skip(outcome) => outcome,
            Plan::Join(rx) => Self::await_outcome(rx).await,
            Plan::Fetch(tx) => {
                let rx = tx.subscribe();
                // The fetch runs detached so dropping the caller cannot
                // abandon joiners mid-flight.
                match self.self_ref.upgrade() {
                    Some(service) => {
                        tokio::spawn(async move {
                            service.run_fetch(tx).await;
                        });
                    }
                    None => self.run_fetch(tx).await,
                }
                Self::await_outcome(rx).await
            }
        }
    }

    /// Freshness metadata for the current snapshot.
    pub fn metadata(&self) -> DataMetadata {
        let state = self.state.lock().unwrap();
        DataMetadata {
            last_fetch: state.last_fetch,
            has_data: state.snapshot.is_some(),
            is_stale: self.is_stale_at(state.last_fetch, Utc::now()),
        }
    }

    /// Check if the server is reachable.
    pub async fn is_server_available(&self) -> bool {
        self.gateway.check_health().await.is_ok()
    }

    /// (Re)start the periodic refresh task. It re-fetches only when the
    /// snapshot has gone stale.
    pub fn start_auto_refresh(&self) {
        let Some(service) = self.self_ref.upgrade() else {
            return;
        };
        let mut task = self.refresh_task.lock().unwrap();
        if let Some(handle) = task.take() {
            handle.abort();
        }

        let period = self.config.auto_refresh_interval();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if service.metadata().is_stale {
                    debug!("Auto-refreshing library data");
                    if let Err(e) = service.refresh(false).await {
                        warn!(error = %e, "Auto-refresh failed");
                    }
                }
            }
        }));
        debug!(period_secs = period.as_secs(), "Auto-refresh started");
    }

    pub fn stop_auto_refresh(&self) {
        if let Some(handle) = self.refresh_task.lock().unwrap().take() {
            handle.abort();
            debug!("Auto-refresh stopped");
        }
    }

    // ===== Fetch execution =====

    async fn run_fetch(&self, tx: watch::Sender<FetchSlot>) {
        let outcome = match self.gateway.fetch_libraries().await {
            Ok(response) => {
                let snapshot = Arc::new(response.data);
                let fetched_at = Utc::now();
                {
                    let mut state = self.state.lock().unwrap();
                    state.install(Arc::clone(&snapshot), fetched_at);
                    state.in_flight = None;
                }
                self.save_to_cache(&snapshot);
                self.subscribers.notify(&snapshot);
                info!(locations = snapshot.total_len(), "Fresh library data loaded");
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch fresh data from server");
                self.recover_from_failed_fetch(err)
            }
        };

        let _ = tx.send(Some(outcome));
    }

    /// After a failed fetch: serve the prior snapshot if there is one,
    /// otherwise fall back to the durable entry even when expired. Only
    /// when neither exists does the failure reach the caller.
    fn recover_from_failed_fetch(&self, err: ApiError) -> Result<Arc<LibraryData>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.in_flight = None;

        if let Some(snapshot) = &state.snapshot {
            debug!("Using cached data as fallback");
            return Ok(Arc::clone(snapshot));
        }

        if let Some((snapshot, last_fetch)) = self.read_cache_entry() {
            debug!("Using expired durable cache as fallback");
            let snapshot = Arc::new(snapshot);
            state.install(Arc::clone(&snapshot), last_fetch);
            return Ok(snapshot);
        }

        Err(SyncError::Fetch(Arc::new(err)))
    }

    async fn await_outcome(
        mut rx: watch::Receiver<FetchSlot>,
    ) -> Result<Arc<LibraryData>, SyncError> {
        loop {
            if let Some(outcome) = rx.borrow().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Fetch task vanished without resolving
                return Err(SyncError::NoData);
            }
        }
    }

    // ===== Freshness =====

    fn is_stale_at(&self, last_fetch: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_fetch {
            Some(fetched) => now - fetched > self.config.cache_duration(),
            None => true,
        }
    }

    // ===== Durable cache =====

    /// Hydrate the in-memory snapshot from the durable cache, if the entry
    /// exists and is unexpired. Does nothing when a snapshot is present.
    fn load_from_cache(&self) {
        let Some((data, last_fetch)) = self.read_cache_entry() else {
            return;
        };

        let now = Utc::now();
        if self.is_stale_at(Some(last_fetch), now) {
            debug!("Cached data expired, will fetch fresh data");
            return;
        }

        let mut state = self.state.lock().unwrap();
        if state.snapshot.is_none() {
            debug!("Loaded library data from cache");
            state.install(Arc::new(data), last_fetch);
        }
    }

    /// Read both cache keys, regardless of expiry. Returns the snapshot and
    /// the fetch time reconstructed from the stored expiry.
    fn read_cache_entry(&self) -> Option<(LibraryData, DateTime<Utc>)> {
        let blob = self.read_key(CACHE_KEY)?;
        let expiry_raw = self.read_key(CACHE_EXPIRY_KEY)?;

        let expiry_ms: i64 = match expiry_raw.trim().parse() {
            Ok(ms) => ms,
            Err(_) => {
                warn!(value = %expiry_raw, "Unreadable cache expiry, ignoring cache");
                return None;
            }
        };
        let expiry = DateTime::from_timestamp_millis(expiry_ms)?;

        let data: LibraryData = match serde_json::from_str(&blob) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Unreadable cached snapshot, ignoring cache");
                return None;
            }
        };

        Some((data, expiry - self.config.cache_duration()))
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache, treating as miss");
                None
            }
        }
    }

    /// Persist the snapshot and its expiry. Best-effort: failures are
    /// logged and the in-memory snapshot stays authoritative.
    fn save_to_cache(&self, data: &LibraryData) {
        let blob = match serde_json::to_string(data) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to serialize snapshot for caching");
                return;
            }
        };
        let expiry = Utc::now() + self.config.cache_duration();

        if let Err(e) = self.store.set(CACHE_KEY, &blob) {
            warn!(error = %e, "Failed to cache snapshot");
            return;
        }
        if let Err(e) = self
            .store
            .set(CACHE_EXPIRY_KEY, &expiry.timestamp_millis().to_string())
        {
            warn!(error = %e, "Failed to cache snapshot expiry");
        }
    }
}
