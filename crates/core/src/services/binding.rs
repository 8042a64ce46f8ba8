//! Resource bindings: loading/error/not-found state around a fetch.
//!
//! A [`Resource`] holds the state a view renders. Each load takes a new
//! generation number; a result is applied only if its generation is still
//! the latest and the resource has not been cancelled, so a slow response
//! can never overwrite a newer one.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{trace, warn};

use crate::error::DataResult;

/// Options accepted by every binding.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Do not run the fetch at all.
    pub skip: bool,
    /// Refetch on this interval while the view shows the first page.
    pub refresh_interval: Option<Duration>,
}

/// State exposed to the view.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub loading: bool,
    pub data: Option<T>,
    /// Display message of the last failure.
    pub error: Option<String>,
    /// The last fetch succeeded but matched nothing.
    pub not_found: bool,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            data: None,
            error: None,
            not_found: false,
        }
    }
}

/// Observable, generation-guarded fetch state.
pub struct Resource<T> {
    state: watch::Sender<ResourceState<T>>,
    generation: AtomicU64,
    cancelled: AtomicBool,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            state,
            generation: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }
}

impl<T> Resource<T> {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop accepting results. In-flight loads are discarded when they land.
    ///
    /// The flag is flipped under the state lock, so once this returns no
    /// `apply` can still be writing.
    pub fn cancel(&self) {
        self.state.send_if_modified(|_| {
            self.cancelled.store(true, Ordering::SeqCst);
            false
        });
    }

    /// Start a load and return its generation.
    pub fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_if_modified(|state| {
            if self.is_cancelled() {
                return false;
            }
            state.loading = true;
            true
        });
        generation
    }
}

impl<T: Clone> Resource<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ResourceState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every applied change.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.state.subscribe()
    }

    /// Apply the result of load `generation`.
    ///
    /// Returns `false` when the result is stale or the resource was
    /// cancelled; the state is left untouched in that case.
    pub fn apply(&self, generation: u64, result: DataResult<Option<T>>) -> bool {
        self.state.send_if_modified(|state| {
            if self.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
                trace!(generation, "Discarding stale result");
                return false;
            }

            state.loading = false;
            match result {
                Ok(Some(data)) => {
                    state.data = Some(data);
                    state.error = None;
                    state.not_found = false;
                }
                Ok(None) => {
                    state.data = None;
                    state.error = None;
                    state.not_found = true;
                }
                Err(e) => {
                    warn!(error = %e, "Fetch failed");
                    state.error = Some(e.to_string());
                    state.not_found = false;
                }
            }
            true
        })
    }

    /// Run one load through the generation guard.
    pub async fn load<F, Fut>(&self, fetch: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DataResult<Option<T>>>,
    {
        let generation = self.begin();
        let result = fetch().await;
        self.apply(generation, result)
    }
}

/// A resource together with its background fetch task.
///
/// Dropping the binding cancels it.
pub struct Binding<T> {
    resource: Arc<Resource<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Binding<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start fetching according to `options`.
    ///
    /// Polling only happens on the first page; other pages load once.
    pub fn spawn<F, Fut>(options: FetchOptions, first_page: bool, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DataResult<Option<T>>> + Send + 'static,
    {
        let resource = Resource::new();
        if options.skip {
            return Self {
                resource,
                task: None,
            };
        }

        let task_resource = Arc::clone(&resource);
        let period = options.refresh_interval.filter(|_| first_page);
        let task = tokio::spawn(async move {
            let Some(period) = period else {
                task_resource.load(&fetch).await;
                return;
            };

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if task_resource.is_cancelled() {
                    break;
                }
                task_resource.load(&fetch).await;
            }
        });

        Self {
            resource,
            task: Some(task),
        }
    }

    pub fn resource(&self) -> &Arc<Resource<T>> {
        &self.resource
    }

    pub fn state(&self) -> ResourceState<T> {
        self.resource.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.resource.subscribe()
    }

    /// Stop polling and ignore any in-flight result.
    pub fn cancel(&mut self) {
        self.resource.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        self.resource.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
