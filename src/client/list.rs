//! List page controller
//!
//! Owns the filter state of one list, issues fetches and publishes the
//! resulting [`ListState`] on a watch channel. Every reload bumps a
//! generation and aborts the previous fetch; a response is applied only if
//! its generation is still current, so late responses never overwrite
//! newer ones.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use super::debounce::Debouncer;
use super::{ApiClient, ClientError};
use crate::query::{ListEnvelope, ListQuery, Pagination};

/// Where a controller gets its pages from
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    type Item: Send + Sync + 'static;

    async fn fetch(&self, query: &ListQuery) -> Result<ListEnvelope<Self::Item>, ClientError>;
}

/// A list endpoint of the API
pub struct ResourceList<T> {
    client: ApiClient,
    path: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> ResourceList<T> {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T> ListSource for ResourceList<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch(&self, query: &ListQuery) -> Result<ListEnvelope<T>, ClientError> {
        self.client.list(&self.path, query).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    /// Message of the last failed fetch
    pub error: Option<String>,
    pub loading: bool,
    /// Generation of the latest reload
    pub generation: u64,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::default(),
            error: None,
            loading: false,
            generation: 0,
        }
    }
}

struct Inner<S: ListSource> {
    source: S,
    query: Mutex<ListQuery>,
    inflight: Mutex<Option<AbortHandle>>,
    state: watch::Sender<ListState<S::Item>>,
}

impl<S: ListSource> Inner<S> {
    fn query(&self) -> std::sync::MutexGuard<'_, ListQuery> {
        self.query.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reload(self: &Arc<Self>) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.loading = true;
            s.error = None;
            generation = s.generation;
        });

        let query = self.query().clone();
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = inner.source.fetch(&query).await;
            inner.apply(generation, result);
        });

        let previous = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
        generation
    }

    fn apply(&self, generation: u64, result: Result<ListEnvelope<S::Item>, ClientError>) {
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                tracing::debug!("Dropping stale list response {} < {}", generation, s.generation);
                return false;
            }
            match result {
                Ok(envelope) => {
                    s.items = envelope.data;
                    s.pagination = envelope.pagination;
                    s.error = None;
                }
                Err(e) => {
                    tracing::warn!("List fetch failed: {}", e);
                    s.error = Some(e.user_message());
                }
            }
            s.loading = false;
            true
        });
    }
}

/// Filter, paging and fetch state of one list page
pub struct ListController<S: ListSource> {
    inner: Arc<Inner<S>>,
    search: Debouncer,
}

impl<S: ListSource> ListController<S> {
    pub fn new(source: S, query: ListQuery) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                query: Mutex::new(query),
                inflight: Mutex::new(None),
                state,
            }),
            search: Debouncer::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<S::Item>> {
        self.inner.state.subscribe()
    }

    pub fn query(&self) -> ListQuery {
        self.inner.query().clone()
    }

    /// Query string of the current filters
    pub fn query_string(&self) -> String {
        self.inner.query().to_query_string()
    }

    /// Fetch with the current filters; returns the new generation
    pub fn reload(&self) -> u64 {
        self.inner.reload()
    }

    fn update(&self, reset_page: bool, f: impl FnOnce(&mut ListQuery)) -> u64 {
        {
            let mut query = self.inner.query();
            f(&mut query);
            if reset_page {
                query.page = 1;
            }
        }
        self.reload()
    }

    pub fn set_page(&self, page: u64) -> u64 {
        self.update(false, |q| q.page = page.max(1))
    }

    pub fn set_limit(&self, limit: u64) -> u64 {
        self.update(true, |q| q.limit = limit)
    }

    pub fn set_search_field(&self, field: Option<String>) -> u64 {
        self.update(true, |q| q.search_field = field)
    }

    /// Exact day filter, `YYYY-MM-DD`
    pub fn set_tanggal(&self, tanggal: Option<String>) -> u64 {
        self.update(true, |q| q.tanggal = tanggal)
    }

    /// Month filter, `YYYY-MM`
    pub fn set_bulan(&self, bulan: Option<String>) -> u64 {
        self.update(true, |q| q.bulan = bulan)
    }

    pub fn clear_filters(&self) -> u64 {
        self.search.cancel();
        self.update(true, |q| {
            q.search = None;
            q.search_field = None;
            q.tanggal = None;
            q.bulan = None;
        })
    }

    /// Raw keystrokes. Applied once typing pauses; a changed term goes
    /// back to the first page.
    pub fn set_search_input(&self, text: impl Into<String>) {
        let text = text.into();
        let term = Some(text.trim().to_string()).filter(|t| !t.is_empty());
        let inner = Arc::clone(&self.inner);
        self.search.call(async move {
            {
                let mut query = inner.query();
                if query.search == term {
                    return;
                }
                query.search = term;
                query.page = 1;
            }
            inner.reload();
        });
    }
}

impl<S: ListSource> Drop for ListController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .inner
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
