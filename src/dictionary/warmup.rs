//! Offline warmup: downloads every chapter shard into the persistent cache.
//!
//! Runs are single-flight: concurrent `warmup` calls share one in-flight
//! run and all observe its final status. A completed warmup short-circuits
//! unless forced. The run fails fast: the first shard fetch error raises a
//! cancellation flag all workers check, and the run lands in the `error`
//! phase instead of downloading the remainder.
//!
//! Cache writes are best-effort. A shard that downloads but fails to
//! persist is logged and skipped; warmup exists to improve offline
//! coverage, not to guarantee it transactionally.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::{mpsc, watch};

use super::cache::PersistentCache;
use super::error::{DictionaryError, Result};
use super::fetch::ShardFetcher;
use super::loader::{DictionaryLoader, INDEX_PATH};
use super::models::{SyncComplete, WarmupPhase, WarmupStatus};

/// Workers spawned when the caller does not say otherwise.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Hard ceiling on parallel shard downloads.
pub const MAX_CONCURRENCY: usize = 8;

/// Progress is persisted and broadcast every this many completions (and
/// always on the final one) to keep status writes off the hot path.
const PROGRESS_STRIDE: usize = 10;

/// Caller-tunable warmup parameters.
#[derive(Debug, Clone, Copy)]
pub struct WarmupOptions {
    /// Re-download everything even if a previous run already finished.
    pub force: bool,
    /// Requested worker count; `0` means [`DEFAULT_CONCURRENCY`]. Clamped
    /// to `1..=MAX_CONCURRENCY`.
    pub concurrency: usize,
}

impl Default for WarmupOptions {
    fn default() -> Self {
        Self {
            force: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl WarmupOptions {
    fn effective_concurrency(&self) -> usize {
        let requested = if self.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            self.concurrency
        };
        requested.clamp(1, MAX_CONCURRENCY)
    }
}

/// Durable storage for the warmup status, so progress survives restarts.
#[async_trait]
pub trait WarmupStatusStore: Send + Sync {
    async fn load(&self) -> Option<WarmupStatus>;
    async fn save(&self, status: &WarmupStatus) -> Result<()>;
}

/// Status persisted as a small JSON file.
pub struct FsStatusStore {
    path: std::path::PathBuf,
}

impl FsStatusStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WarmupStatusStore for FsStatusStore {
    async fn load(&self) -> Option<WarmupStatus> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(status) => Some(status),
            Err(e) => {
                log::warn!("Ignoring unreadable warmup status file: {e}");
                None
            }
        }
    }

    async fn save(&self, status: &WarmupStatus) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec(status)?).await?;
        Ok(())
    }
}

/// In-memory store for embedded use and tests.
#[derive(Default)]
pub struct MemoryStatusStore {
    status: Mutex<Option<WarmupStatus>>,
}

#[async_trait]
impl WarmupStatusStore for MemoryStatusStore {
    async fn load(&self) -> Option<WarmupStatus> {
        self.status.lock().expect("status poisoned").clone()
    }

    async fn save(&self, status: &WarmupStatus) -> Result<()> {
        *self.status.lock().expect("status poisoned") = Some(status.clone());
        Ok(())
    }
}

type SharedRun = Shared<BoxFuture<'static, WarmupStatus>>;

struct Inner<F: ShardFetcher> {
    loader: Arc<DictionaryLoader<F>>,
    cache: Arc<dyn PersistentCache>,
    store: Arc<dyn WarmupStatusStore>,
    status_tx: watch::Sender<WarmupStatus>,
    sync_tx: Option<mpsc::UnboundedSender<SyncComplete>>,
    in_flight: Mutex<Option<SharedRun>>,
}

impl<F: ShardFetcher> Inner<F> {
    /// Persist and broadcast one status snapshot. Store failures are
    /// logged, not propagated; losing a progress write must not abort the
    /// run.
    async fn publish(&self, status: &WarmupStatus) {
        if let Err(e) = self.store.save(status).await {
            log::warn!("Failed to persist warmup status: {e}");
        }
        let _ = self.status_tx.send(status.clone());
    }
}

/// Shard pre-downloader with persisted, observable progress.
pub struct WarmupService<F: ShardFetcher + 'static> {
    inner: Arc<Inner<F>>,
}

impl<F: ShardFetcher + 'static> Clone for WarmupService<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ShardFetcher + 'static> WarmupService<F> {
    pub fn new(
        loader: Arc<DictionaryLoader<F>>,
        cache: Arc<dyn PersistentCache>,
        store: Arc<dyn WarmupStatusStore>,
    ) -> Self {
        let (status_tx, _) = watch::channel(WarmupStatus::default());
        Self {
            inner: Arc::new(Inner {
                loader,
                cache,
                store,
                status_tx,
                sync_tx: None,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Attach a channel that receives one [`SyncComplete`] per successful
    /// run. Must be called before the first warmup.
    pub fn with_sync_channel(mut self, sync_tx: mpsc::UnboundedSender<SyncComplete>) -> Self {
        let inner = Arc::get_mut(&mut self.inner)
            .expect("with_sync_channel called after the service was shared");
        inner.sync_tx = Some(sync_tx);
        self
    }

    /// Run (or join) a warmup. Returns the run's final status; this method
    /// never errors, failures surface as the `error` phase.
    pub async fn warmup(&self, options: WarmupOptions) -> WarmupStatus {
        let existing = self.inner.in_flight.lock().expect("warmup poisoned").clone();
        if let Some(run) = existing {
            return run.await;
        }

        if !options.force {
            if let Some(status) = self.inner.store.load().await {
                if status.phase == WarmupPhase::Done {
                    return status;
                }
            }
        }

        let inner = Arc::clone(&self.inner);
        let run: SharedRun = async move {
            let status = match run_warmup(&inner, options).await {
                Ok(status) => status,
                Err(e) => {
                    log::error!("Dictionary warmup failed: {e}");
                    let status = WarmupStatus::failed(e.to_string());
                    inner.publish(&status).await;
                    status
                }
            };
            inner
                .in_flight
                .lock()
                .expect("warmup poisoned")
                .take();
            status
        }
        .boxed()
        .shared();

        // A second caller may have installed a run while we checked the
        // stored status; join theirs instead of racing two runs.
        let run = {
            let mut slot = self.inner.in_flight.lock().expect("warmup poisoned");
            match slot.clone() {
                Some(existing) => existing,
                None => {
                    *slot = Some(run.clone());
                    run
                }
            }
        };
        run.await
    }

    /// Last persisted status, idle if none was ever written.
    pub async fn status(&self) -> WarmupStatus {
        self.inner.store.load().await.unwrap_or_default()
    }

    /// Live status updates; the receiver starts at the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<WarmupStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Whether a warmup has completed, meaning every shard was offered to
    /// the persistent cache.
    pub async fn is_offline_ready(&self) -> bool {
        self.status().await.phase == WarmupPhase::Done
    }
}

async fn run_warmup<F: ShardFetcher>(
    inner: &Arc<Inner<F>>,
    options: WarmupOptions,
) -> Result<WarmupStatus> {
    let concurrency = options.effective_concurrency();
    let index = inner.loader.load_index().await;

    // Cache the index first so an interrupted run still leaves the
    // manifest available offline.
    match serde_json::to_vec(index.as_ref()) {
        Ok(bytes) => {
            if let Err(e) = inner.cache.put(INDEX_PATH, &bytes).await {
                log::warn!("Failed to cache dictionary index: {e}");
            }
        }
        Err(e) => log::warn!("Failed to serialize dictionary index for caching: {e}"),
    }

    let paths: Vec<String> = index
        .chapters
        .values()
        .map(|meta| meta.path.clone())
        .filter(|path| !path.is_empty())
        .collect();
    let total = paths.len();

    log::info!(
        "Warming up {total} dictionary shards (version {}, {concurrency} workers)",
        index.version
    );
    inner
        .publish(&WarmupStatus::progress(WarmupPhase::Running, 0, total))
        .await;

    let cursor = AtomicUsize::new(0);
    let completed = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    // Progress publishes from different workers must not interleave: a
    // snapshot for an older completion count landing after a newer one
    // would make the persisted percentage regress. The gate serializes
    // publishes and drops any snapshot that is no longer the newest.
    let progress_gate = tokio::sync::Mutex::new(0usize);

    let workers = (0..concurrency).map(|_| {
        let fetcher = inner.loader.fetcher();
        let paths = &paths;
        let cursor = &cursor;
        let completed = &completed;
        let cancelled = &cancelled;
        let progress_gate = &progress_gate;
        async move {
            loop {
                if cancelled.load(Ordering::SeqCst) {
                    return Ok(());
                }
                let i = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(path) = paths.get(i) else {
                    return Ok(());
                };

                let bytes = match fetcher.fetch_bytes(path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        cancelled.store(true, Ordering::SeqCst);
                        return Err(DictionaryError::fetch(
                            path,
                            format!("warmup aborted: {e}"),
                        ));
                    }
                };
                if let Err(e) = inner.cache.put(path, &bytes).await {
                    log::warn!("Failed to cache shard {path}: {e}");
                }

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % PROGRESS_STRIDE == 0 || done == total {
                    let mut newest = progress_gate.lock().await;
                    if done > *newest {
                        *newest = done;
                        inner
                            .publish(&WarmupStatus::progress(WarmupPhase::Running, done, total))
                            .await;
                    }
                }
            }
        }
    });
    futures::future::try_join_all(workers).await?;

    let status = WarmupStatus::progress(WarmupPhase::Done, total, total);
    inner.publish(&status).await;

    if let Some(sync_tx) = &inner.sync_tx {
        let complete = SyncComplete {
            version: index.version.clone(),
            total_chapters: total,
            total_entries: index.total_entries,
            completed_at: status.updated_at,
        };
        if sync_tx.send(complete).is_err() {
            log::warn!("Sync-complete receiver dropped, skipping notification");
        }
    }

    log::info!("Dictionary warmup complete: {total} shards cached");
    Ok(status)
}
