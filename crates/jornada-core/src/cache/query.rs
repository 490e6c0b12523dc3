//! Per-consumer query handle over the shared `QueryCache`.

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::watch;

use super::store::{QueryCache, DEFAULT_TTL_MINUTES};
use super::QueryError;
use crate::api::ApiError;

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Disabled queries never fetch on `load` (e.g. no signed-in user yet)
    pub enabled: bool,
    pub ttl: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }
}

impl QueryOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// What a view renders: the latest data, whether a fetch is pending, and
/// the last error. `data` survives errors so a failed refresh doesn't
/// blank the screen.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<QueryError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// A keyed query bound to one fetch function.
///
/// State changes are published on a watch channel so a view can
/// `subscribe()` and re-render when loading starts or data arrives.
pub struct Query<T> {
    key: String,
    cache: QueryCache,
    fetcher: Fetcher<T>,
    options: QueryOptions,
    state: watch::Sender<QueryState<T>>,
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(cache: QueryCache, key: impl Into<String>, fetcher: F, options: QueryOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());
        let (state, _) = watch::channel(QueryState::default());
        Self {
            key: key.into(),
            cache,
            fetcher,
            options,
            state,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.borrow().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<QueryError> {
        self.state.borrow().error.clone()
    }

    /// Populate from the cache or the backend. No-op while disabled.
    pub async fn load(&self) -> QueryState<T> {
        if self.options.enabled {
            self.run(false).await;
        }
        self.state()
    }

    /// Invalidate this query's key and fetch again, whatever its freshness.
    pub async fn refetch(&self) -> QueryState<T> {
        self.run(true).await;
        self.state()
    }

    async fn run(&self, force: bool) {
        if !force {
            if let Some(value) = self.cache.get::<T>(&self.key, self.options.ttl) {
                self.state.send_modify(|state| state.data = Some(value));
                return;
            }
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let fetcher = Arc::clone(&self.fetcher);
        let result = if force {
            self.cache.refetch(&self.key, move || fetcher()).await
        } else {
            self.cache
                .fetch(&self.key, self.options.ttl, move || fetcher())
                .await
        };

        self.state.send_modify(|state| {
            state.loading = false;
            match result {
                Ok(value) => state.data = Some(value),
                Err(e) => state.error = Some(e),
            }
        });
    }
}
