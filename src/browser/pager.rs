//! Page retrieval and accumulation for the product listing.
//!
//! [`Pager`] is a plain state machine: it hands out [`PageRequest`]s and is
//! told how each one ended via [`Pager::complete`]. It never performs I/O,
//! which keeps ordering rules testable without a runtime.
//!
//! Every request carries a generation number. Issuing a new request (filter
//! change, load-more or retry) makes every older generation stale, and a
//! completion for a stale generation is dropped on arrival. The accumulated
//! items therefore always belong to the most recent criteria, never to a mix
//! of two filter generations.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::browser::criteria::FilterCriteria;
use crate::error::Result;
use crate::models::Product;
use crate::query::{self, QueryPlan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerState {
    /// Nothing requested yet.
    Idle,
    /// A request for `page` is in flight.
    Loading { page: u32 },
    /// The last request succeeded.
    Loaded,
    /// The request for `page` failed; [`Pager::retry`] re-issues it.
    Error { page: u32, message: String },
}

/// A page query handed out by the pager, to be executed by the caller and
/// reported back through [`Pager::complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub generation: u64,
    pub page: u32,
    pub criteria: FilterCriteria,
    pub plan: QueryPlan,
}

/// What [`Pager::complete`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Rows were merged; `added` counts products not seen before.
    Applied { added: usize },
    /// The request failed and the pager moved to [`PagerState::Error`].
    Failed,
    /// The response belonged to a superseded request and was ignored.
    Discarded,
}

#[derive(Debug)]
pub struct Pager {
    page_size: usize,
    criteria: Option<FilterCriteria>,
    items: Vec<Product>,
    seen: HashSet<String>,
    current_page: u32,
    last_page_len: Option<usize>,
    state: PagerState,
    generation: u64,
}

impl Pager {
    /// Create an idle pager. A zero page size is raised to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            criteria: None,
            items: Vec::new(),
            seen: HashSet::new(),
            current_page: 0,
            last_page_len: None,
            state: PagerState::Idle,
            generation: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn state(&self) -> &PagerState {
        &self.state
    }

    /// Accumulated products, first-seen order, unique by id.
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    /// Last successfully loaded page, `0` before the first one lands.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Criteria the accumulated items (or the in-flight request) belong to.
    pub fn criteria(&self) -> Option<&FilterCriteria> {
        self.criteria.as_ref()
    }

    /// Latest generation handed out.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether another page is believed to exist.
    ///
    /// A page shorter than the page size marks the end of the data. A full
    /// page only suggests more: when the total is an exact multiple of the
    /// page size the final load-more comes back empty.
    pub fn has_more(&self) -> bool {
        self.last_page_len == Some(self.page_size)
    }

    /// `true` when `criteria` is already loaded or being loaded, so a new
    /// page-1 query would fetch the same rows again.
    pub fn is_current(&self, criteria: &FilterCriteria) -> bool {
        self.criteria.as_ref() == Some(criteria)
            && matches!(self.state, PagerState::Loaded | PagerState::Loading { .. })
    }

    /// Start over for `criteria`: clear the items and request page 1.
    ///
    /// Valid from any state; an in-flight request becomes stale.
    pub fn reset(&mut self, criteria: FilterCriteria) -> Result<PageRequest> {
        let plan = query::product_page(&criteria, 1, self.page_size)?;
        self.items.clear();
        self.seen.clear();
        self.current_page = 0;
        self.last_page_len = None;
        self.criteria = Some(criteria);
        Ok(self.issue(1, plan))
    }

    /// Request the page after the current one.
    ///
    /// Returns `None` unless the pager is [`Loaded`](PagerState::Loaded) and
    /// [`has_more`](Self::has_more) holds; at most one request is in flight.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.state != PagerState::Loaded || !self.has_more() {
            return None;
        }
        self.request_page(self.current_page + 1)
    }

    /// Re-issue the page whose request failed. No-op outside
    /// [`Error`](PagerState::Error).
    pub fn retry(&mut self) -> Option<PageRequest> {
        let page = match self.state {
            PagerState::Error { page, .. } => page,
            _ => return None,
        };
        if page == 1 {
            let criteria = self.criteria.clone()?;
            return self.reset(criteria).ok();
        }
        self.request_page(page)
    }

    /// Apply the outcome of `request`.
    pub fn complete(&mut self, request: &PageRequest, result: Result<Vec<Product>>) -> Completion {
        let awaited = matches!(self.state, PagerState::Loading { page } if page == request.page);
        if request.generation != self.generation || !awaited {
            debug!(
                generation = request.generation,
                latest = self.generation,
                page = request.page,
                "discarding stale page response"
            );
            return Completion::Discarded;
        }

        match result {
            Ok(rows) => {
                let received = rows.len();
                let mut added = 0;
                for product in rows {
                    if !product.is_active {
                        continue;
                    }
                    if self.seen.insert(product.id.clone()) {
                        self.items.push(product);
                        added += 1;
                    }
                }
                self.current_page = request.page;
                self.last_page_len = Some(received);
                self.state = PagerState::Loaded;
                debug!(page = request.page, received, added, total = self.items.len(), "page applied");
                Completion::Applied { added }
            }
            Err(e) => {
                warn!(page = request.page, error = %e, "product page request failed");
                if request.page == 1 {
                    self.items.clear();
                    self.seen.clear();
                    self.current_page = 0;
                    self.last_page_len = None;
                }
                self.state = PagerState::Error {
                    page: request.page,
                    message: e.to_string(),
                };
                Completion::Failed
            }
        }
    }

    fn request_page(&mut self, page: u32) -> Option<PageRequest> {
        let criteria = self.criteria.as_ref()?;
        let plan = query::product_page(criteria, page, self.page_size).ok()?;
        Some(self.issue(page, plan))
    }

    fn issue(&mut self, page: u32, plan: QueryPlan) -> PageRequest {
        self.generation += 1;
        self.state = PagerState::Loading { page };
        PageRequest {
            generation: self.generation,
            page,
            criteria: self.criteria.clone().unwrap_or_default(),
            plan,
        }
    }
}
