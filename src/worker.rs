// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{find_route_cancellable, AStarError, Error, Graph, Route, SearchOptions};

/// Everything needed to carry out a single route search in a [SearchWorker].
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Read-only snapshot of the road network.
    pub graph: Arc<Graph>,

    /// Id of the start node.
    pub start: i64,

    /// Id of the end node.
    pub end: i64,

    pub options: SearchOptions,
}

/// Runs a single A* search on a dedicated thread.
///
/// The worker posts exactly one response: the [Route] or an [Error].
/// A search can be cancelled at any time with [SearchWorker::cancel] (or by dropping
/// the worker); a cancelled search never delivers any, even partial, result.
#[derive(Debug)]
pub struct SearchWorker {
    thread_handle: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,

    /// Channel with the outcome; `None` once the outcome was taken.
    response: Option<mpsc::Receiver<Result<Route, Error>>>,
}

impl SearchWorker {
    /// Starts a new search on a background thread.
    pub fn spawn(request: SearchRequest) -> Result<Self, Error> {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_clone = cancel.clone();
        let (tx, rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("astar-search".to_string())
            .spawn(move || run(request, &cancel_clone, tx))
            .map_err(|e| Error::SearchFailed(format!("failed to spawn search worker: {e}")))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            cancel,
            response: Some(rx),
        })
    }

    /// Blocks until the search finishes, returning its outcome.
    ///
    /// Fails with [Error::SearchFailed] if the outcome was already taken
    /// by [SearchWorker::try_result].
    pub fn wait(mut self) -> Result<Route, Error> {
        match self.response.take() {
            Some(rx) => rx.recv().unwrap_or_else(|_| Err(worker_gone())),
            None => Err(Error::SearchFailed("search result already taken".to_string())),
        }
    }

    /// Returns the outcome of the search if it has already finished,
    /// without blocking.
    ///
    /// The outcome is returned only once; subsequent calls return `None`.
    pub fn try_result(&mut self) -> Option<Result<Route, Error>> {
        let response = match self.response.as_ref()?.try_recv() {
            Ok(response) => response,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(worker_gone()),
        };

        self.response = None;
        Some(response)
    }

    /// Checks if the search thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Aborts the search and waits for the thread to stop.
    pub fn cancel(self) {
        // Drop does the rest
        log::debug!("cancelling route search");
    }

    fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("search worker thread panicked: {e:?}");
            }
        }
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_gone() -> Error {
    Error::SearchFailed("search worker terminated without a response".to_string())
}

/// Body of the worker thread: runs the search and posts its outcome,
/// unless cancelled.
fn run(request: SearchRequest, cancel: &AtomicBool, tx: mpsc::Sender<Result<Route, Error>>) {
    log::debug!(
        "searching for a route {} -> {} by {}",
        request.start,
        request.end,
        request.options.mode,
    );

    let response = match find_route_cancellable(
        &request.graph,
        request.start,
        request.end,
        &request.options,
        cancel,
    ) {
        Ok(route) => {
            log::debug!(
                "found route with {} nodes after exploring {} edges",
                route.path.len(),
                route.trace.len(),
            );
            Ok(route)
        }
        Err(AStarError::Cancelled) => {
            log::debug!("route search cancelled");
            return;
        }
        Err(AStarError::NoRoute(explored)) => {
            log::info!(
                "no route {} -> {} after exploring {} edges",
                request.start,
                request.end,
                explored.len(),
            );
            Err(Error::PathNotFound { explored })
        }
        Err(e) => Err(Error::SearchFailed(e.to_string())),
    };

    // The receiver is gone if the caller has lost interest
    _ = tx.send(response);
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::{CostMode, Edge, EdgeCost, Node};

    /// Builds a `size` × `size` grid of bidirectional 10 m/s streets, spaced 0.001° apart
    /// (edge lengths are a bit over the crow-flies distance).
    /// Node ids are `row * size + col`; an extra, unreachable node `-1` is added far away.
    fn grid_graph(size: i64) -> Graph {
        let mut g = Graph::default();
        for row in 0..size {
            for col in 0..size {
                g.set_node(Node {
                    id: row * size + col,
                    lat: row as f64 * 0.001,
                    lon: col as f64 * 0.001,
                });
            }
        }
        g.set_node(Node {
            id: -1,
            lat: 1.0,
            lon: 1.0,
        });

        for row in 0..size {
            for col in 0..size {
                let id = row * size + col;
                let mut connect = |other: i64| {
                    let cost = EdgeCost {
                        time: 12.0,
                        distance: 120.0,
                    };
                    g.set_edge(id, Edge { to: other, cost });
                    g.set_edge(other, Edge { to: id, cost });
                };
                if col + 1 < size {
                    connect(id + 1);
                }
                if row + 1 < size {
                    connect(id + size);
                }
            }
        }
        g
    }

    fn request(g: Arc<Graph>, start: i64, end: i64) -> SearchRequest {
        SearchRequest {
            graph: g,
            start,
            end,
            options: SearchOptions::new(CostMode::Distance, 10.0),
        }
    }

    #[test]
    fn route_found() {
        let g = Arc::new(grid_graph(5));
        let route = SearchWorker::spawn(request(g, 0, 24)).unwrap().wait().unwrap();

        assert_eq!(route.path.first().map(|n| n.id), Some(0));
        assert_eq!(route.path.last().map(|n| n.id), Some(24));
        assert_eq!(route.path.len(), 9);
        assert!((route.cost.distance - 8.0 * 120.0).abs() < 1e-6);
    }

    #[test]
    fn path_not_found_carries_trace() {
        let g = Arc::new(grid_graph(3));
        let err = SearchWorker::spawn(request(g, 0, -1)).unwrap().wait().unwrap_err();

        match err {
            Error::PathNotFound { explored } => assert_eq!(explored.len(), 8),
            other => panic!("expected PathNotFound, got {other:?}"),
        }
    }

    #[test]
    fn invalid_reference() {
        let g = Arc::new(grid_graph(3));
        let err = SearchWorker::spawn(request(g, 0, 1000)).unwrap().wait().unwrap_err();
        assert!(matches!(err, Error::SearchFailed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn try_result() {
        let g = Arc::new(grid_graph(3));
        let mut worker = SearchWorker::spawn(request(g, 0, 8)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let result = loop {
            if let Some(result) = worker.try_result() {
                break result;
            }
            assert!(Instant::now() < deadline, "search did not finish in time");
            thread::sleep(Duration::from_millis(5));
        };

        assert_eq!(result.unwrap().path.len(), 5);

        // The outcome is delivered only once
        assert!(worker.try_result().is_none());
        assert!(worker.try_result().is_none());
        assert!(matches!(worker.wait(), Err(Error::SearchFailed(_))));
    }

    #[test]
    fn cancel() {
        let g = Arc::new(grid_graph(300));
        let worker = SearchWorker::spawn(request(g.clone(), 0, -1)).unwrap();
        assert!(worker.is_running());

        let started = Instant::now();
        worker.cancel();
        assert!(started.elapsed() < Duration::from_secs(10));

        // The worker thread has finished and released its graph snapshot
        assert_eq!(Arc::strong_count(&g), 1);
    }

    #[test]
    fn concurrent_searches_on_shared_graph() {
        let g = Arc::new(grid_graph(20));
        let a = SearchWorker::spawn(request(g.clone(), 0, 399)).unwrap();
        let b = SearchWorker::spawn(request(g.clone(), 19, 380)).unwrap();
        let c = SearchWorker::spawn(request(g.clone(), 0, -1)).unwrap();

        let a = a.wait().unwrap();
        let b = b.wait().unwrap();
        let c = c.wait().unwrap_err();

        assert_eq!(a.path.first().map(|n| n.id), Some(0));
        assert_eq!(a.path.last().map(|n| n.id), Some(399));
        assert!((a.cost.distance - 38.0 * 120.0).abs() < 1e-6);

        assert_eq!(b.path.first().map(|n| n.id), Some(19));
        assert_eq!(b.path.last().map(|n| n.id), Some(380));
        assert!((b.cost.distance - 38.0 * 120.0).abs() < 1e-6);

        assert!(matches!(c, Error::PathNotFound { .. }));
        assert_eq!(Arc::strong_count(&g), 1);
    }

    #[test]
    fn cancelled_search_posts_nothing() {
        let g = Arc::new(grid_graph(3));
        let (tx, rx) = mpsc::channel();
        let cancel = AtomicBool::new(true);

        run(request(g, 0, 8), &cancel, tx);
        assert_eq!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected));
    }
}
