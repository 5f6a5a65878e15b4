//! Reactive coordination for one list screen.
//!
//! A session is a single task that owns the query controller, the fetcher and
//! the render model. The view sends [`ListIntent`]s and observes
//! [`ListSnapshot`]s through a `watch` channel; every query change triggers a
//! fresh request, free-text search only after the input has gone idle.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info};

use crate::{
    error::{FetchError, SessionClosed},
    fetcher::{DataFetcher, FetchOutcome, ListSource},
    query::{ListQueryController, Query, QueryChange},
    render::{ListRow, PaginationView, RenderModel, RowFilter},
};

const INTENT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListIntent {
    SetSearchTerm(String),
    SetSort(String),
    SetPage(u32),
    NextPage,
    PreviousPage,
    Select(String),
    ClearSelection,
    Refresh,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub search_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListSnapshot<T: ListRow> {
    pub query: Query,
    pub total_pages: u32,
    pub model: RenderModel<T>,
}

impl<T: ListRow> ListSnapshot<T> {
    pub fn pagination(&self) -> PaginationView {
        self.model.pagination()
    }

    /// True once the newest request has been answered, successfully or not.
    pub fn is_settled(&self) -> bool {
        !self.model.is_loading() && (self.model.page().is_some() || self.model.error().is_some())
    }
}

pub struct ListSession<T: ListRow> {
    intents: mpsc::Sender<ListIntent>,
    snapshots: watch::Receiver<ListSnapshot<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T: ListRow> ListSession<T> {
    /// Spawns the session task and issues the initial fetch.
    pub fn start(
        source: Arc<dyn ListSource<T>>,
        initial_query: Query,
        filters: Vec<RowFilter<T>>,
        options: SessionOptions,
    ) -> Self {
        let controller = ListQueryController::new(initial_query);
        let model = RenderModel::new(filters);
        let (snapshots_tx, snapshots) = watch::channel(ListSnapshot {
            query: controller.query().clone(),
            total_pages: controller.total_pages(),
            model: model.clone(),
        });
        let (fetcher, outcomes) = DataFetcher::new(source);
        let (intents, intents_rx) = mpsc::channel(INTENT_QUEUE_DEPTH);

        let worker = SessionWorker {
            controller,
            model,
            fetcher,
            search_debounce: options.search_debounce,
            search_deadline: None,
            issued_query: None,
            shown_query: None,
            snapshots: snapshots_tx,
        };
        let task = tokio::spawn(worker.run(intents_rx, outcomes));
        info!("list session started");

        Self {
            intents,
            snapshots,
            task: Some(task),
        }
    }

    pub async fn send(&self, intent: ListIntent) -> Result<(), SessionClosed> {
        self.intents.send(intent).await.map_err(|_| SessionClosed)
    }

    pub async fn set_search_term(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(ListIntent::SetSearchTerm(text.into())).await
    }

    pub async fn set_sort(&self, key: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(ListIntent::SetSort(key.into())).await
    }

    pub async fn set_page(&self, page: u32) -> Result<(), SessionClosed> {
        self.send(ListIntent::SetPage(page)).await
    }

    pub async fn select(&self, id: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(ListIntent::Select(id.into())).await
    }

    pub async fn clear_selection(&self) -> Result<(), SessionClosed> {
        self.send(ListIntent::ClearSelection).await
    }

    pub async fn refresh(&self) -> Result<(), SessionClosed> {
        self.send(ListIntent::Refresh).await
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.snapshots.borrow().clone()
    }

    /// Tears the session down; an in-flight request is aborted and its
    /// result is never applied.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("list session shut down");
    }
}

impl<T: ListRow> Drop for ListSession<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SessionWorker<T: ListRow> {
    controller: ListQueryController,
    model: RenderModel<T>,
    fetcher: DataFetcher<T>,
    search_debounce: Duration,
    search_deadline: Option<Instant>,
    /// Query of the newest request.
    issued_query: Option<Query>,
    /// Query that produced the page on screen.
    shown_query: Option<Query>,
    snapshots: watch::Sender<ListSnapshot<T>>,
}

impl<T: ListRow> SessionWorker<T> {
    async fn run(
        mut self,
        mut intents: mpsc::Receiver<ListIntent>,
        mut outcomes: mpsc::UnboundedReceiver<FetchOutcome<T>>,
    ) {
        self.fetch_now();

        loop {
            let deadline = self.search_deadline;
            let debounce = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => break,
                },
                Some(outcome) = outcomes.recv() => self.handle_outcome(outcome),
                _ = debounce => {
                    self.search_deadline = None;
                    self.fetch_now();
                }
            }
        }

        self.fetcher.cancel();
        info!("list session closed");
    }

    fn handle_intent(&mut self, intent: ListIntent) {
        debug!(?intent, "list intent");
        let change = match intent {
            ListIntent::SetSearchTerm(text) => self.controller.set_search_term(text),
            ListIntent::SetSort(key) => self.controller.set_sort(&key),
            ListIntent::SetPage(page) => self.controller.set_page(page),
            ListIntent::NextPage => self.controller.next_page(),
            ListIntent::PreviousPage => self.controller.previous_page(),
            ListIntent::Refresh => QueryChange::Structural,
            ListIntent::Select(id) => {
                if !self.model.select(&id) {
                    debug!(id = %id, "ignoring selection of a row that is not rendered");
                }
                QueryChange::Unchanged
            }
            ListIntent::ClearSelection => {
                self.model.clear_selection();
                QueryChange::Unchanged
            }
        };

        match change {
            QueryChange::Search => {
                // Whatever is in flight answers a term that is no longer current.
                self.fetcher.cancel();
                self.model.begin_fetch();
                self.search_deadline = Some(Instant::now() + self.search_debounce);
                self.publish();
            }
            QueryChange::Structural => {
                self.search_deadline = None;
                self.fetch_now();
            }
            QueryChange::Unchanged => self.publish(),
        }
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome<T>) {
        match self.fetcher.accept(outcome) {
            Ok(page) => {
                if self.controller.apply_total_pages(page.total_pages).is_changed() {
                    debug!(
                        total_pages = page.total_pages,
                        "page fell outside the new bound; refetching first page"
                    );
                    self.fetch_now();
                    return;
                }
                if self.model.apply_page(page) {
                    debug!("selected row disappeared; selection cleared");
                }
                self.shown_query = self.issued_query.clone();
            }
            Err(FetchError::Stale { .. }) => return,
            Err(err) => {
                // A new search keeps page 1; only navigation within the shown
                // result set falls back to the shown page.
                let current = self.controller.query().to_params().search_term;
                let same_search = self
                    .shown_query
                    .as_ref()
                    .is_some_and(|shown| shown.to_params().search_term == current);
                if let Some(page) = self.model.page().filter(|_| same_search) {
                    self.controller.restore_page(page.current_page);
                }
                self.model.apply_failure(err);
            }
        }
        self.publish();
    }

    fn fetch_now(&mut self) {
        self.model.begin_fetch();
        let query = self.controller.query().clone();
        self.issued_query = Some(query.clone());
        self.fetcher.issue(query);
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(ListSnapshot {
            query: self.controller.query().clone(),
            total_pages: self.controller.total_pages(),
            model: self.model.clone(),
        });
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
