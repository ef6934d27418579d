//! Sans-IO collection controller.
//!
//! Keeps an append-only cache of every edge fetched for the current variables
//! and slices it into fixed-size pages. Going forward past the cache produces
//! a [`FetchTicket`] for the caller to execute; going back never fetches.
//! Each variable change starts a new generation, and responses tagged with an
//! older generation are rejected.

use warden_core::ports::{Connection, Edge, MAX_PAGE_SIZE, PageInfo};

use crate::error::{ClientError, ControllerError};
use crate::fetcher::PageArgs;

/// Client-side paging configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Number of records shown per page.
    pub records_per_page: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            records_per_page: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page for the current variables; replaces the cache.
    Initial,
    /// Next records after the cache's end cursor; appended to the cache.
    More,
}

/// A request the caller must execute and hand back to
/// [`CollectionController::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub kind: FetchKind,
    pub args: PageArgs,
}

/// Outcome of [`CollectionController::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// The next page was already cached and is now current.
    Advanced,
    /// More records are needed; the page advances once the ticket completes.
    Fetch(FetchTicket),
    /// Already on the last page.
    AtEnd,
}

#[derive(Debug)]
pub struct CollectionController<N> {
    records_per_page: usize,
    current_page: usize,
    generation: u64,
    edges: Vec<Edge<N>>,
    page_info: PageInfo,
    total_count: u64,
    loaded: bool,
    in_flight: Option<FetchKind>,
    error: Option<ControllerError>,
}

impl<N> CollectionController<N> {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            records_per_page: clamp_page_size(config.records_per_page),
            current_page: 1,
            generation: 0,
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
            loaded: false,
            in_flight: None,
            error: None,
        }
    }

    /// Ticket for the first page, unless it is loaded or already loading.
    pub fn begin_load(&mut self) -> Option<FetchTicket> {
        if self.loaded || self.in_flight.is_some() {
            return None;
        }
        self.in_flight = Some(FetchKind::Initial);
        Some(FetchTicket {
            generation: self.generation,
            kind: FetchKind::Initial,
            args: PageArgs::forward(self.records_per_page as i32, None),
        })
    }

    /// Move to the next page, fetching more records if the cache runs out.
    pub fn next(&mut self) -> Result<NextStep, ControllerError> {
        if self.in_flight.is_some() {
            return Err(ControllerError::FetchInProgress);
        }
        if !self.loaded {
            return Ok(self.begin_load().map_or(NextStep::AtEnd, NextStep::Fetch));
        }

        let cached = self.edges.len();
        let shown = self.current_page * self.records_per_page;
        let wanted = shown + self.records_per_page;
        let server_has_next = self.page_info.has_next_page;

        if cached > shown && (cached >= wanted || !server_has_next) {
            self.current_page += 1;
            return Ok(NextStep::Advanced);
        }

        if !server_has_next {
            return Ok(NextStep::AtEnd);
        }

        let first = (wanted - cached).clamp(1, MAX_PAGE_SIZE);
        self.in_flight = Some(FetchKind::More);
        Ok(NextStep::Fetch(FetchTicket {
            generation: self.generation,
            kind: FetchKind::More,
            args: PageArgs::forward(
                first as i32,
                self.page_info.end_cursor.as_ref().map(|c| c.value.clone()),
            ),
        }))
    }

    /// Move to the previous page. Purely local; floored at page 1.
    pub fn previous(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset_to_first_page(&mut self) {
        self.current_page = 1;
    }

    /// Discard the cache for new variables and return the first-page ticket.
    pub fn set_variables(&mut self) -> FetchTicket {
        self.generation += 1;
        self.edges.clear();
        self.page_info = PageInfo::default();
        self.total_count = 0;
        self.loaded = false;
        self.error = None;
        self.current_page = 1;
        self.in_flight = Some(FetchKind::Initial);

        FetchTicket {
            generation: self.generation,
            kind: FetchKind::Initial,
            args: PageArgs::forward(self.records_per_page as i32, None),
        }
    }

    /// Re-slice the cache with a new page size. Never fetches.
    pub fn set_records_per_page(&mut self, records_per_page: usize) {
        self.records_per_page = clamp_page_size(records_per_page);
        self.current_page = self.current_page.min(self.total_cached_pages().max(1));
    }

    /// Apply the result of `ticket_generation`'s fetch.
    ///
    /// Results from an older generation are dropped without touching state.
    pub fn complete(
        &mut self,
        ticket_generation: u64,
        result: Result<Connection<N>, ClientError>,
    ) -> Result<(), ControllerError> {
        if ticket_generation != self.generation {
            return Err(ControllerError::StaleGeneration);
        }
        let Some(kind) = self.in_flight.take() else {
            return Err(ControllerError::StaleGeneration);
        };

        let connection = match result {
            Ok(connection) => connection,
            Err(err) => {
                let err = ControllerError::from(err);
                self.error = Some(err.clone());
                return Err(err);
            }
        };

        self.error = None;
        self.total_count = connection.total_count;
        self.page_info = connection.page_info;

        match kind {
            FetchKind::Initial => {
                self.edges = connection.edges;
                self.current_page = 1;
                self.loaded = true;
            }
            FetchKind::More => {
                if !connection.edges.is_empty() {
                    self.edges.extend(connection.edges);
                    self.current_page += 1;
                }
            }
        }

        Ok(())
    }

    /// Edges of the current page.
    pub fn page_edges(&self) -> &[Edge<N>] {
        let start = (self.current_page - 1) * self.records_per_page;
        let end = (start + self.records_per_page).min(self.edges.len());
        self.edges.get(start..end).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.page_edges().iter().map(|edge| &edge.node)
    }

    pub fn total_cached_pages(&self) -> usize {
        self.edges.len().div_ceil(self.records_per_page)
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// True while cached pages remain ahead or the server reports more.
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_cached_pages() || self.page_info.has_next_page
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn records_per_page(&self) -> usize {
        self.records_per_page
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight == Some(FetchKind::Initial)
    }

    pub fn is_loading_more(&self) -> bool {
        self.in_flight == Some(FetchKind::More)
    }

    pub fn error(&self) -> Option<&ControllerError> {
        self.error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn clamp_page_size(records_per_page: usize) -> usize {
    records_per_page.clamp(1, MAX_PAGE_SIZE)
}
