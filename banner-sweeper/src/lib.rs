//! Background sweeper that periodically, and on demand, physically removes
//! logically deleted banners.

use banner_core::store::Store;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::Instrument;

/// The sweep period when none is given to [`Sweeper::new`].
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5 * 60 * 60);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Stopped,
    Running,
}

/// Returned when an operation needs the sweeper to be running and it isn't.
#[derive(Debug, thiserror::Error)]
#[error("sweeper is not running")]
pub struct NotRunning;

struct Inner {
    state: State,
    trigger: Option<mpsc::UnboundedSender<oneshot::Sender<()>>>,
    task: Option<JoinHandle<()>>,
}

/// Drives `Store::clean_deleted_banner` on a fixed period, plus a one-shot
/// trigger mailbox so tests (and operators) can force an immediate sweep
/// without waiting out the period.
pub struct Sweeper {
    store: Arc<dyn Store>,
    period: Duration,
    inner: Mutex<Inner>,
}

impl Sweeper {
    /// Builds a sweeper with the default five-hour period. It does not run
    /// until [`Sweeper::start`] is called.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_period(store, DEFAULT_PERIOD)
    }

    /// Builds a sweeper with an explicit period, primarily for tests that
    /// want a short interval rather than driving everything through
    /// [`Sweeper::drain_now`].
    pub fn with_period(store: Arc<dyn Store>, period: Duration) -> Self {
        Self {
            store,
            period,
            inner: Mutex::new(Inner {
                state: State::Stopped,
                trigger: None,
                task: None,
            }),
        }
    }

    /// Starts the background task. A no-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut inner = self.inner.lock().unwrap();

        if inner.state == State::Running {
            return;
        }

        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<oneshot::Sender<()>>();
        let sweeper = self.clone();

        let task = tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(sweeper.period);
                interval.tick().await; // the first tick fires immediately; consume it so sweeps start one full period out

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            sweep_once(&sweeper.store).await;
                        }
                        received = trigger_rx.recv() => {
                            match received {
                                Some(done) => {
                                    sweep_once(&sweeper.store).await;
                                    let _ = done.send(());
                                }
                                None => break,
                            }
                        }
                    }
                }
            }
            .in_current_span(),
        );

        inner.trigger = Some(trigger_tx);
        inner.task = Some(task);
        inner.state = State::Running;
    }

    /// Stops the background task. A no-op if already stopped.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap();

        inner.trigger.take();

        if let Some(task) = inner.task.take() {
            task.abort();
        }

        inner.state = State::Stopped;
    }

    /// Triggers an immediate sweep and waits for it to complete. Fails with
    /// [`NotRunning`] if the sweeper has not been started.
    pub async fn drain_now(&self) -> Result<(), NotRunning> {
        let trigger = {
            let inner = self.inner.lock().unwrap();
            inner.trigger.clone().ok_or(NotRunning)?
        };

        let (done_tx, done_rx) = oneshot::channel();
        trigger.send(done_tx).map_err(|_| NotRunning)?;
        done_rx.await.map_err(|_| NotRunning)
    }

    /// Enqueues a one-shot sweep without waiting for it to run. The enqueue
    /// succeeding does not imply the sweep has run, or will run, before this
    /// call returns — callers that need that guarantee should use
    /// [`Sweeper::drain_now`] instead. Fails with [`NotRunning`] if the
    /// sweeper has not been started.
    pub fn trigger(&self) -> Result<(), NotRunning> {
        let trigger = {
            let inner = self.inner.lock().unwrap();
            inner.trigger.clone().ok_or(NotRunning)?
        };

        let (done_tx, _done_rx) = oneshot::channel();
        trigger.send(done_tx).map_err(|_| NotRunning)
    }

    /// Returns `true` while the background task is running.
    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().state == State::Running
    }
}

async fn sweep_once(store: &Arc<dyn Store>) {
    match store.clean_deleted_banner().await {
        Ok(()) => tracing::debug!("swept logically deleted banners"),
        Err(error) => tracing::error!(error = %error, "deferred deletion sweep failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banner_core::{mem::MemStore, BannerFilter, Content, FeatureId, Patch, TagId};

    fn content() -> Content {
        Content::new(serde_json::json!({})).unwrap()
    }

    #[tokio::test]
    async fn drain_now_without_start_reports_not_running() {
        let sweeper = Arc::new(Sweeper::new(Arc::new(MemStore::default())));
        assert!(sweeper.drain_now().await.is_err());
    }

    #[tokio::test]
    async fn drain_now_physically_removes_logically_deleted_banners() {
        let store = Arc::new(MemStore::default());
        let sweeper = Arc::new(Sweeper::with_period(store.clone(), Duration::from_secs(3600)));
        sweeper.start();

        let id = store
            .create_banner(FeatureId(1), vec![TagId(2)], content(), true)
            .await
            .unwrap();

        let mut filter = BannerFilter::all();
        filter.feature_id = Patch::Set(FeatureId(1));
        store.delete_filtered_banner(filter).await.unwrap();

        sweeper.drain_now().await.unwrap();

        let result = store.delete_banner(id).await;
        assert!(matches!(result, Err(banner_core::StoreError::NotFound)));

        sweeper.shutdown();
    }

    #[tokio::test]
    async fn trigger_without_waiting_still_runs_the_sweep() {
        let store = Arc::new(MemStore::default());
        let sweeper = Arc::new(Sweeper::with_period(store.clone(), Duration::from_secs(3600)));
        sweeper.start();

        let id = store
            .create_banner(FeatureId(1), vec![TagId(2)], content(), true)
            .await
            .unwrap();

        let mut filter = BannerFilter::all();
        filter.feature_id = Patch::Set(FeatureId(1));
        store.delete_filtered_banner(filter).await.unwrap();

        sweeper.trigger().unwrap();
        sweeper.drain_now().await.unwrap(); // serializes behind the first trigger, giving it time to finish

        let result = store.delete_banner(id).await;
        assert!(matches!(result, Err(banner_core::StoreError::NotFound)));

        sweeper.shutdown();
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let sweeper = Arc::new(Sweeper::new(Arc::new(MemStore::default())));
        sweeper.start();
        sweeper.start();
        assert!(sweeper.is_running());
        sweeper.shutdown();
        assert!(!sweeper.is_running());
    }
}
