//! Async driver running a [`CollectionController`] against a [`PageFetcher`].

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::controller::{CollectionController, ControllerConfig, FetchTicket, NextStep};
use crate::error::ControllerError;
use crate::fetcher::{PageFetcher, Variables};

/// Point-in-time view of a paginated collection.
#[derive(Debug, Clone)]
pub struct PageSnapshot<N> {
    pub nodes: Vec<N>,
    pub current_page: usize,
    pub records_per_page: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub total_count: u64,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub error: Option<ControllerError>,
}

struct CollectionState<N> {
    controller: CollectionController<N>,
    variables: Variables,
}

/// A paginated collection backed by a remote connection.
///
/// The state lock is never held while a request is in flight, so `previous`,
/// `snapshot` and variable changes stay responsive during a fetch.
pub struct PaginatedCollection<F: PageFetcher> {
    fetcher: F,
    state: Mutex<CollectionState<F::Node>>,
}

impl<F: PageFetcher> PaginatedCollection<F> {
    pub fn new(fetcher: F, variables: Variables, config: ControllerConfig) -> Self {
        Self {
            fetcher,
            state: Mutex::new(CollectionState {
                controller: CollectionController::new(&config),
                variables,
            }),
        }
    }

    /// Fetch the first page if it is not loaded yet.
    pub async fn load(&self) -> Result<(), ControllerError> {
        let request = {
            let mut state = self.state.lock().await;
            match state.controller.begin_load() {
                Some(ticket) => (ticket, state.variables.clone()),
                None => return Ok(()),
            }
        };
        self.run(request).await
    }

    /// Advance one page. Returns whether the current page changed.
    pub async fn next(&self) -> Result<bool, ControllerError> {
        let (request, page_before) = {
            let mut state = self.state.lock().await;
            let page_before = state.controller.current_page();
            match state.controller.next()? {
                NextStep::Advanced => return Ok(true),
                NextStep::AtEnd => return Ok(false),
                NextStep::Fetch(ticket) => ((ticket, state.variables.clone()), page_before),
            }
        };

        self.run(request).await?;
        Ok(self.state.lock().await.controller.current_page() > page_before)
    }

    /// Go back one page. Never fetches.
    pub async fn previous(&self) -> bool {
        self.state.lock().await.controller.previous()
    }

    pub async fn reset_to_first_page(&self) {
        self.state.lock().await.controller.reset_to_first_page();
    }

    /// Replace the query variables and load their first page.
    ///
    /// Any response still in flight for the old variables is discarded.
    pub async fn set_variables(&self, variables: Variables) -> Result<(), ControllerError> {
        let request = {
            let mut state = self.state.lock().await;
            state.variables = variables;
            let ticket = state.controller.set_variables();
            (ticket, state.variables.clone())
        };
        self.run(request).await
    }

    pub async fn set_records_per_page(&self, records_per_page: usize) {
        self.state
            .lock()
            .await
            .controller
            .set_records_per_page(records_per_page);
    }

    pub async fn snapshot(&self) -> PageSnapshot<F::Node> {
        let state = self.state.lock().await;
        let controller = &state.controller;
        PageSnapshot {
            nodes: controller.nodes().cloned().collect(),
            current_page: controller.current_page(),
            records_per_page: controller.records_per_page(),
            has_next_page: controller.has_next_page(),
            has_previous_page: controller.has_previous_page(),
            total_count: controller.total_count(),
            is_loading: controller.is_loading(),
            is_loading_more: controller.is_loading_more(),
            error: controller.error().cloned(),
        }
    }

    /// Nodes of the current page.
    pub async fn nodes(&self) -> Vec<F::Node> {
        self.state.lock().await.controller.nodes().cloned().collect()
    }

    async fn run(&self, (ticket, variables): (FetchTicket, Variables)) -> Result<(), ControllerError> {
        debug!(
            generation = ticket.generation,
            kind = ?ticket.kind,
            first = ?ticket.args.first,
            "Fetching page"
        );

        let result = self.fetcher.fetch(&variables, &ticket.args).await;

        let mut state = self.state.lock().await;
        let outcome = state.controller.complete(ticket.generation, result);
        match &outcome {
            Err(ControllerError::StaleGeneration) => {
                debug!(generation = ticket.generation, "Discarded stale page")
            }
            Err(e) => warn!(error = %e, "Page fetch failed"),
            Ok(()) => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use warden_core::ports::{Connection, Cursor, Edge, PageInfo};

    use crate::error::ClientError;
    use crate::fetcher::PageArgs;

    /// Serves `count` numbered records, optionally holding fetch-more
    /// requests until released.
    #[derive(Clone, Default)]
    struct FakeFetcher {
        calls: Arc<StdMutex<Vec<PageArgs>>>,
        hold_more: Arc<AtomicBool>,
        release: Arc<Notify>,
        fail: Arc<AtomicBool>,
    }

    impl FakeFetcher {
        fn calls(&self) -> Vec<PageArgs> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        type Node = String;

        async fn fetch(
            &self,
            variables: &Variables,
            page: &PageArgs,
        ) -> Result<Connection<String>, ClientError> {
            self.calls.lock().unwrap().push(page.clone());
            if page.after.is_some() && self.hold_more.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::HttpError("HTTP error: status 503".into()));
            }

            let prefix = variables.get("prefix").and_then(|v| v.as_str()).unwrap_or("r");
            let total = variables.get("count").and_then(|v| v.as_u64()).unwrap_or(25) as usize;
            let start = page
                .after
                .as_deref()
                .and_then(|c| c.parse::<usize>().ok())
                .map_or(0, |i| i + 1);
            let end = (start + page.first.unwrap_or(10) as usize).min(total);

            let edges: Vec<Edge<String>> = (start..end)
                .map(|i| Edge {
                    node: format!("{prefix}{}", i + 1),
                    cursor: Cursor::new(i.to_string()),
                })
                .collect();
            Ok(Connection {
                page_info: PageInfo {
                    has_next_page: end < total,
                    has_previous_page: start > 0,
                    start_cursor: edges.first().map(|e| e.cursor.clone()),
                    end_cursor: edges.last().map(|e| e.cursor.clone()),
                },
                edges,
                total_count: total as u64,
            })
        }
    }

    fn variables(prefix: &str, count: u64) -> Variables {
        let mut vars = Variables::new();
        vars.insert("prefix".into(), json!(prefix));
        vars.insert("count".into(), json!(count));
        vars
    }

    fn names(prefix: &str, from: usize, to: usize) -> Vec<String> {
        (from..=to).map(|i| format!("{prefix}{i}")).collect()
    }

    fn collection(fetcher: &FakeFetcher, count: u64) -> PaginatedCollection<FakeFetcher> {
        PaginatedCollection::new(
            fetcher.clone(),
            variables("r", count),
            ControllerConfig {
                records_per_page: 10,
            },
        )
    }

    // Test critique: parcours complet 10, 10, 5 avec exactement 3 requêtes
    #[tokio::test]
    async fn test_walk_forward_then_back() {
        let fetcher = FakeFetcher::default();
        let collection = collection(&fetcher, 25);

        collection.load().await.unwrap();
        assert_eq!(collection.nodes().await, names("r", 1, 10));

        assert!(collection.next().await.unwrap());
        assert_eq!(collection.nodes().await, names("r", 11, 20));

        assert!(collection.next().await.unwrap());
        let last = collection.snapshot().await;
        assert_eq!(last.nodes, names("r", 21, 25));
        assert!(!last.has_next_page);
        assert!(last.has_previous_page);
        assert_eq!(last.total_count, 25);

        assert!(!collection.next().await.unwrap());

        assert!(collection.previous().await);
        assert!(collection.previous().await);
        assert!(!collection.previous().await);
        assert!(collection.next().await.unwrap());
        assert_eq!(collection.nodes().await, names("r", 11, 20));

        assert_eq!(
            fetcher.calls(),
            vec![
                PageArgs::forward(10, None),
                PageArgs::forward(10, Some("9".into())),
                PageArgs::forward(10, Some("19".into())),
            ]
        );
    }

    // Test critique: pas de requête en double pendant un chargement
    #[tokio::test]
    async fn test_next_during_fetch_more_is_rejected() {
        let fetcher = FakeFetcher::default();
        let collection = collection(&fetcher, 25);
        collection.load().await.unwrap();
        fetcher.hold_more.store(true, Ordering::SeqCst);

        let (first, second) = futures::join!(collection.next(), async {
            while !collection.snapshot().await.is_loading_more {
                tokio::task::yield_now().await;
            }
            let rejected = collection.next().await;
            let went_back = collection.previous().await;
            fetcher.release.notify_one();
            (rejected, went_back)
        });

        assert!(first.unwrap());
        assert!(matches!(second.0, Err(ControllerError::FetchInProgress)));
        assert!(!second.1);
        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(collection.nodes().await, names("r", 11, 20));
    }

    // Test critique: les nouvelles variables repartent d'une page 1 fraîche
    #[tokio::test]
    async fn test_variable_change_mid_fetch_discards_old_page() {
        let fetcher = FakeFetcher::default();
        let collection = collection(&fetcher, 25);
        collection.load().await.unwrap();
        fetcher.hold_more.store(true, Ordering::SeqCst);

        let (stale, fresh) = futures::join!(collection.next(), async {
            while !collection.snapshot().await.is_loading_more {
                tokio::task::yield_now().await;
            }
            let fresh = collection.set_variables(variables("s", 3)).await;
            fetcher.release.notify_one();
            fresh
        });

        assert!(matches!(stale, Err(ControllerError::StaleGeneration)));
        fresh.unwrap();

        let snapshot = collection.snapshot().await;
        assert_eq!(snapshot.nodes, names("s", 1, 3));
        assert_eq!(snapshot.current_page, 1);
        assert_eq!(snapshot.total_count, 3);
        assert!(!snapshot.has_next_page);
        assert!(!snapshot.is_loading_more);
    }

    #[tokio::test]
    async fn test_variable_change_after_navigation_restarts_at_page_one() {
        let fetcher = FakeFetcher::default();
        let collection = collection(&fetcher, 25);
        collection.load().await.unwrap();
        collection.next().await.unwrap();

        collection.set_variables(variables("s", 12)).await.unwrap();
        assert_eq!(collection.nodes().await, names("s", 1, 10));
        assert!(!collection.snapshot().await.has_previous_page);
        assert_eq!(fetcher.calls().last(), Some(&PageArgs::forward(10, None)));
    }

    #[tokio::test]
    async fn test_failed_fetch_more_can_be_retried() {
        let fetcher = FakeFetcher::default();
        let collection = collection(&fetcher, 25);
        collection.load().await.unwrap();

        fetcher.fail.store(true, Ordering::SeqCst);
        assert!(matches!(collection.next().await, Err(ControllerError::Fetch(_))));
        let snapshot = collection.snapshot().await;
        assert!(snapshot.error.is_some());
        assert!(!snapshot.is_loading_more);
        assert_eq!(snapshot.nodes, names("r", 1, 10));

        fetcher.fail.store(false, Ordering::SeqCst);
        assert!(collection.next().await.unwrap());
        assert!(collection.snapshot().await.error.is_none());
    }

    #[tokio::test]
    async fn test_page_size_change_does_not_fetch() {
        let fetcher = FakeFetcher::default();
        let collection = collection(&fetcher, 25);
        collection.load().await.unwrap();

        collection.set_records_per_page(5).await;
        assert_eq!(collection.nodes().await, names("r", 1, 5));
        assert!(collection.next().await.unwrap());
        assert_eq!(collection.nodes().await, names("r", 6, 10));
        assert_eq!(fetcher.calls().len(), 1);
    }
}
