//! Cursor pagination over `next`-linked JSON pages.
//!
//! [`PageIterator`] is an explicit state machine: each [`PageIterator::next`]
//! call either reports [`Page::Done`] or fetches exactly one page through its
//! queue. Pages of one iterator are fetched strictly one after another; many
//! iterators may share a queue and interleave.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::{FetchError, JsonClient};
use crate::queue::{Queue, QueueError};

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Absolute URL of the next page. Absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub pagelen: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Result of a single [`PageIterator::next`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Page<T> {
    Done,
    Item(Paginated<T>),
}

/// Mutable iterator state handed to interceptors.
#[derive(Debug, Clone)]
pub struct PageState<T> {
    /// URL of the next page to fetch. Clearing it ends the sequence.
    pub next_url: Option<String>,
    /// The most recently fetched page.
    pub current: Option<Paginated<T>>,
}

/// Hook run before every fetch decision.
pub type Interceptor<T> = Box<dyn FnMut(&mut PageState<T>) + Send>;

#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct PageIterator<T> {
    queue: Queue,
    client: JsonClient,
    state: PageState<T>,
    interceptor: Option<Interceptor<T>>,
}

impl<T> PageIterator<T>
where
    T: DeserializeOwned + Clone + Send,
{
    pub fn new(queue: Queue, client: JsonClient, url: impl Into<String>) -> Self {
        Self {
            queue,
            client,
            state: PageState {
                next_url: Some(url.into()),
                current: None,
            },
            interceptor: None,
        }
    }

    pub fn with_interceptor<F>(mut self, interceptor: F) -> Self
    where
        F: FnMut(&mut PageState<T>) + Send + 'static,
    {
        self.interceptor = Some(Box::new(interceptor));
        self
    }

    pub fn state(&self) -> &PageState<T> {
        &self.state
    }

    pub fn queue_name(&self) -> &str {
        self.queue.name()
    }

    /// Fetch the next page, or report that the sequence is exhausted.
    ///
    /// A failed fetch also ends the sequence: the cursor is consumed before
    /// the request is submitted.
    pub async fn next(&mut self) -> Result<Page<T>, PageError> {
        if let Some(interceptor) = self.interceptor.as_mut() {
            interceptor(&mut self.state);
        }

        let Some(url) = self.state.next_url.take() else {
            return Ok(Page::Done);
        };

        tracing::debug!(queue = %self.queue.name(), url = %url, "Queueing page fetch");
        let page: Paginated<T> = self
            .queue
            .add(self.client.get_json::<Paginated<T>>(&url))
            .await??;

        self.state.next_url = page.next.clone();
        self.state.current = Some(page.clone());
        Ok(Page::Item(page))
    }

    /// Drain every remaining page into one vector of values.
    pub async fn collect_values(mut self) -> Result<Vec<T>, PageError> {
        let mut values = Vec::new();
        while let Page::Item(page) = self.next().await? {
            values.extend(page.values);
        }
        Ok(values)
    }
}
