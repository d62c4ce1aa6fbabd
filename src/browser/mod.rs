//! The product browser session.
//!
//! One [`BrowserHandle`] corresponds to one mounted listing view. The session
//! behind it is a single task that owns the filter store, debouncer, pager and
//! facet state; the handle only sends commands and observes
//! [`BrowserSnapshot`]s. Nothing is shared between sessions.
//!
//! Flow: filter edit → debounce quiet period → page-1 query → items replaced;
//! load-more → next page → unseen items appended.

pub mod criteria;
pub mod debounce;
pub mod pager;

pub use criteria::{FilterCriteria, FilterEdit, FilterStore};
pub use debounce::Debouncer;
pub use pager::{Completion, PageRequest, Pager, PagerState};

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::backend::CatalogBackend;
use crate::config;
use crate::error::{CatalogError, Result};
use crate::facets::FacetLoader;
use crate::models::{Category, Product};
use crate::queries::{CategoryQuery, ProductQuery};

// ---------------------------------------------------------------------------
// Options and published state
// ---------------------------------------------------------------------------

/// Tunables of a browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub page_size: usize,
    pub debounce: Duration,
    pub brand_cap: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            page_size: config::DEFAULT_PAGE_SIZE,
            debounce: config::DEFAULT_DEBOUNCE,
            brand_cap: config::BRAND_FACET_CAP,
        }
    }
}

/// Data loaded once per session.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(v) => Some(v),
            _ => None,
        }
    }
}

/// What the listing should present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseStatus {
    /// First page in flight.
    Loading,
    /// Items to show (possibly while a further page loads or after it failed).
    Results,
    /// The query succeeded with zero matches; offer to clear filters.
    Empty,
    /// The first page failed; offer a retry.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSnapshot {
    /// Criteria as currently edited.
    pub criteria: FilterCriteria,
    /// Criteria the items belong to.
    pub applied: Option<FilterCriteria>,
    pub items: Vec<Product>,
    pub current_page: u32,
    pub state: PagerState,
    pub has_more: bool,
    pub brands: Loadable<Vec<String>>,
    pub categories: Loadable<Vec<Category>>,
    /// Page requests issued so far in this session.
    pub queries_issued: u64,
}

impl BrowserSnapshot {
    pub fn status(&self) -> BrowseStatus {
        match &self.state {
            PagerState::Idle | PagerState::Loading { page: 1 } => BrowseStatus::Loading,
            PagerState::Error { page: 1, message } => BrowseStatus::Failed {
                message: message.clone(),
            },
            PagerState::Loaded if self.items.is_empty() => BrowseStatus::Empty,
            _ => BrowseStatus::Results,
        }
    }

    /// `true` once the latest page request has finished, either way.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, PagerState::Loaded | PagerState::Error { .. })
    }
}

// ---------------------------------------------------------------------------
// BrowserHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCommand {
    SetSearchTerm(String),
    SetCategory(Option<String>),
    SetBrand(Option<String>),
    ClearFilters,
    LoadMore,
    Retry,
}

/// Front end of a running browser session.
///
/// Dropping the handle ends the session.
pub struct BrowserHandle {
    commands: mpsc::UnboundedSender<BrowserCommand>,
    snapshots: watch::Receiver<BrowserSnapshot>,
    task: JoinHandle<()>,
}

impl BrowserHandle {
    /// Start a session on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn CatalogBackend>, options: BrowserOptions) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let session = Session::new(backend, options);
        let (tx, snapshots) = watch::channel(session.snapshot());
        let task = tokio::spawn(session.run(rx, tx));
        Self {
            commands,
            snapshots,
            task,
        }
    }

    pub fn send(&self, command: BrowserCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CatalogError::InvalidArgument("browser session has ended".into()))
    }

    pub fn set_search_term(&self, term: impl Into<String>) -> Result<()> {
        self.send(BrowserCommand::SetSearchTerm(term.into()))
    }

    pub fn set_category(&self, category_id: Option<String>) -> Result<()> {
        self.send(BrowserCommand::SetCategory(category_id))
    }

    pub fn set_brand(&self, brand: Option<String>) -> Result<()> {
        self.send(BrowserCommand::SetBrand(brand))
    }

    pub fn clear_filters(&self) -> Result<()> {
        self.send(BrowserCommand::ClearFilters)
    }

    pub fn load_more(&self) -> Result<()> {
        self.send(BrowserCommand::LoadMore)
    }

    pub fn retry(&self) -> Result<()> {
        self.send(BrowserCommand::Retry)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> BrowserSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<BrowserSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published state satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&BrowserSnapshot) -> bool,
    ) -> Result<BrowserSnapshot> {
        let snapshot = self
            .snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| CatalogError::InvalidArgument("browser session has ended".into()))?;
        Ok(snapshot.clone())
    }

    /// End the session and wait for its task to finish.
    pub async fn close(self) {
        drop(self.commands);
        let _ = self.task.await;
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

enum Outcome {
    Page(PageRequest, Result<Vec<Product>>),
    Brands(Result<Vec<String>>),
    Categories(Result<Vec<Category>>),
}

struct Session {
    backend: Arc<dyn CatalogBackend>,
    options: BrowserOptions,
    filters: FilterStore,
    debouncer: Debouncer,
    pager: Pager,
    brands: Loadable<Vec<String>>,
    categories: Loadable<Vec<Category>>,
    in_flight: FuturesUnordered<BoxFuture<'static, Outcome>>,
    queries_issued: u64,
}

impl Session {
    fn new(backend: Arc<dyn CatalogBackend>, options: BrowserOptions) -> Self {
        Self {
            debouncer: Debouncer::new(options.debounce),
            pager: Pager::new(options.page_size),
            backend,
            options,
            filters: FilterStore::new(),
            brands: Loadable::Pending,
            categories: Loadable::Pending,
            in_flight: FuturesUnordered::new(),
            queries_issued: 0,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<BrowserCommand>,
        snapshots: watch::Sender<BrowserSnapshot>,
    ) {
        self.mount();
        snapshots.send_replace(self.snapshot());

        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = quiet_period_end(deadline), if deadline.is_some() => self.on_quiet(),
                Some(outcome) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.on_outcome(outcome)
                }
            }
            snapshots.send_replace(self.snapshot());
        }
        debug!("browser session ended");
    }

    /// First page for empty criteria, plus the one-off facet and category loads.
    fn mount(&mut self) {
        match self.pager.reset(self.filters.criteria().clone()) {
            Ok(request) => self.dispatch(request),
            Err(e) => warn!(error = %e, "could not build initial page query"),
        }

        let backend = self.backend.clone();
        let cap = self.options.brand_cap;
        self.in_flight.push(Box::pin(async move {
            Outcome::Brands(FacetLoader::new(backend.as_ref()).brands(cap).await)
        }));

        let backend = self.backend.clone();
        self.in_flight.push(Box::pin(async move {
            Outcome::Categories(CategoryQuery::new(backend.as_ref()).list().await)
        }));
    }

    fn handle(&mut self, command: BrowserCommand) {
        let edit = match command {
            BrowserCommand::SetSearchTerm(term) => self.filters.set_search_term(term),
            BrowserCommand::SetCategory(id) => self.filters.set_category(id),
            BrowserCommand::SetBrand(brand) => self.filters.set_brand(brand),
            BrowserCommand::ClearFilters => self.filters.clear(),
            BrowserCommand::LoadMore => {
                if let Some(request) = self.pager.load_more() {
                    self.dispatch(request);
                }
                return;
            }
            BrowserCommand::Retry => {
                if let Some(request) = self.pager.retry() {
                    self.dispatch(request);
                }
                return;
            }
        };
        self.debouncer.schedule(edit, Instant::now());
    }

    fn on_quiet(&mut self) {
        let Some(revision) = self.debouncer.fire(Instant::now()) else {
            return;
        };
        let criteria = self.filters.criteria().clone();
        if self.pager.is_current(&criteria) {
            debug!(revision, "criteria unchanged, no query issued");
            return;
        }
        match self.pager.reset(criteria) {
            Ok(request) => self.dispatch(request),
            Err(e) => warn!(revision, error = %e, "could not build page query"),
        }
    }

    fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Page(request, result) => {
                self.pager.complete(&request, result);
            }
            Outcome::Brands(result) => self.brands = settle("brand facet", result),
            Outcome::Categories(result) => self.categories = settle("categories", result),
        }
    }

    fn dispatch(&mut self, request: PageRequest) {
        self.queries_issued += 1;
        debug!(
            generation = request.generation,
            page = request.page,
            search = %request.criteria.search_term,
            "issuing page query"
        );
        let backend = self.backend.clone();
        self.in_flight.push(Box::pin(async move {
            let result = ProductQuery::new(backend.as_ref()).run(&request.plan).await;
            Outcome::Page(request, result)
        }));
    }

    fn snapshot(&self) -> BrowserSnapshot {
        BrowserSnapshot {
            criteria: self.filters.criteria().clone(),
            applied: self.pager.criteria().cloned(),
            items: self.pager.items().to_vec(),
            current_page: self.pager.current_page(),
            state: self.pager.state().clone(),
            has_more: self.pager.has_more(),
            brands: self.brands.clone(),
            categories: self.categories.clone(),
            queries_issued: self.queries_issued,
        }
    }
}

fn settle<T>(what: &str, result: Result<T>) -> Loadable<T> {
    match result {
        Ok(value) => Loadable::Ready(value),
        Err(e) => {
            warn!(error = %e, "failed to load {}", what);
            Loadable::Failed(e.to_string())
        }
    }
}

async fn quiet_period_end(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
