//! Background crawl worker
//!
//! One worker task runs per session. Each iteration pops a title, fetches
//! it, commits the page and its links to the shared graph under a single
//! write lock, feeds the frontier and checks the stop conditions. Between
//! iterations the worker sleeps the courtesy delay and parks at the pause
//! gate while the session is paused.

use crate::config::CrawlSettings;
use crate::crawler::events::{CrawlEvent, EventBus};
use crate::crawler::frontier::Frontier;
use crate::crawler::stop::{self, StopReason};
use crate::graph::{read_graph, write_graph, GraphError, SharedGraph};
use crate::state::{CrawlStatus, ElapsedClock};
use crate::wiki::{PageFetcher, PageRecord};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Command the controller sends to its worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Run,
    Pause,
    Stop,
}

/// Locks the session status, recovering from a poisoned lock
pub(crate) fn lock_status(status: &Mutex<CrawlStatus>) -> MutexGuard<'_, CrawlStatus> {
    status.lock().unwrap_or_else(|e| e.into_inner())
}

/// Result of committing one fetched page
struct Commit {
    /// Links not visited yet, in page order
    unvisited: Vec<String>,
    vertex_count: usize,
    edge_count: usize,
    reason: Option<StopReason>,
}

pub(crate) struct Worker {
    pub(crate) fetcher: Arc<dyn PageFetcher>,
    pub(crate) graph: SharedGraph,
    pub(crate) status: Arc<Mutex<CrawlStatus>>,
    pub(crate) clock: Arc<ElapsedClock>,
    pub(crate) events: EventBus,
    pub(crate) control: watch::Receiver<Control>,
    pub(crate) frontier: Frontier,
    pub(crate) settings: CrawlSettings,
}

impl Worker {
    /// Runs the crawl to completion and records how it ended
    pub(crate) async fn run(mut self) {
        let mut guard = FailureGuard {
            status: Arc::clone(&self.status),
            events: self.events.clone(),
            armed: true,
        };

        let outcome = self.crawl().await;
        guard.armed = false;

        match outcome {
            Some(reason) if !self.stop_requested() => self.finish(reason),
            _ => tracing::debug!("Crawl worker stopped on request"),
        }
    }

    async fn crawl(&mut self) -> Option<StopReason> {
        let delay = self.settings.delay();

        loop {
            if self.stop_requested() {
                return None;
            }

            let title = match self.next_title() {
                Some(title) => title,
                None => return Some(StopReason::Exhausted),
            };

            let started = Instant::now();

            let record = match self
                .fetcher
                .fetch(&self.settings.language, &title, self.settings.load_details)
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping '{}': {}", title, e);
                    self.clock.add(started.elapsed());
                    continue;
                }
            };

            let commit = match self.commit(&title, &record, started.elapsed()) {
                Ok(Some(commit)) => commit,
                Ok(None) => {
                    tracing::debug!(
                        "Skipping '{}': page {} is already in the graph",
                        title,
                        record.page_id
                    );
                    self.clock.add(started.elapsed());
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping '{}': {}", title, e);
                    self.clock.add(started.elapsed());
                    continue;
                }
            };

            let new_links = commit.unvisited.len();
            self.frontier.push(commit.unvisited);

            tracing::debug!(
                "Visited '{}' ({} links, {} new, {} queued)",
                record.title,
                record.links.len(),
                new_links,
                self.frontier.len()
            );

            let finish = match commit.reason {
                Some(reason) => Some(reason),
                None if self.frontier.is_empty() => Some(StopReason::Exhausted),
                None => None,
            };

            if finish.is_none() {
                self.courtesy_delay(delay).await;
            }

            let total = self.clock.add(started.elapsed());
            self.events.publish(CrawlEvent::ElapsedTimeChanged(total));

            if finish.is_none() {
                self.wait_while_paused().await;
            }

            self.events.publish(CrawlEvent::VerticesAdded {
                vertex_count: commit.vertex_count,
                edge_count: commit.edge_count,
            });

            if finish.is_some() {
                return finish;
            }
        }
    }

    /// Pops titles until one that has not been visited yet turns up
    fn next_title(&mut self) -> Option<String> {
        let graph = read_graph(&self.graph);
        while let Some(title) = self.frontier.pop() {
            if graph.is_visited(&title) {
                tracing::trace!("Pruning visited title '{}'", title);
                continue;
            }
            return Some(title);
        }
        None
    }

    /// Applies a fetched page to the graph
    ///
    /// Returns `Ok(None)` when the page id is already indexed.
    fn commit(
        &self,
        title: &str,
        record: &PageRecord,
        spent: Duration,
    ) -> Result<Option<Commit>, GraphError> {
        let mut graph = write_graph(&self.graph);

        if graph.contains_page_id(record.page_id) {
            return Ok(None);
        }

        let source = graph.ensure_vertex(title);
        graph.mark_visited(source, record)?;

        let mut unvisited = Vec::new();
        for link in &record.links {
            let target = graph.ensure_vertex(link);
            graph.add_edge(source, target);
            if !graph.is_visited(link) {
                unvisited.push(link.clone());
            }
        }

        let elapsed = self.clock.get() + spent;
        let reason = stop::triggered(&graph, elapsed, &self.settings.stop);

        Ok(Some(Commit {
            unvisited,
            vertex_count: graph.vertex_count(),
            edge_count: graph.edge_count(),
            reason,
        }))
    }

    /// Sleeps between requests; a stop request cuts the sleep short
    async fn courtesy_delay(&mut self, delay: Duration) {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_for_control(&mut self.control, |c| *c == Control::Stop) => {}
        }
    }

    /// Parks the worker while the session is paused
    async fn wait_while_paused(&mut self) {
        if *self.control.borrow() == Control::Pause {
            tracing::debug!("Crawl worker parked at pause gate");
        }
        wait_for_control(&mut self.control, |c| *c != Control::Pause).await;
    }

    /// True once stop was requested or the controller went away
    fn stop_requested(&self) -> bool {
        self.control.has_changed().is_err() || *self.control.borrow() == Control::Stop
    }

    fn finish(&self, reason: StopReason) {
        let changed = {
            let mut status = lock_status(&self.status);
            if status.is_active() {
                *status = CrawlStatus::Done;
                true
            } else {
                false
            }
        };

        if changed {
            tracing::info!("Crawl done: {}", reason);
            self.events
                .publish(CrawlEvent::StatusChanged(CrawlStatus::Done));
            self.events.publish(CrawlEvent::CrawlDone { reason });
        }
    }
}

/// Waits until the control value satisfies `f` or the controller is gone
async fn wait_for_control(
    control: &mut watch::Receiver<Control>,
    f: impl FnMut(&Control) -> bool,
) {
    let _ = control.wait_for(f).await.map(|_| ());
}

/// Moves an active session to `Failed` if the worker exits without
/// finishing normally
struct FailureGuard {
    status: Arc<Mutex<CrawlStatus>>,
    events: EventBus,
    armed: bool,
}

impl Drop for FailureGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let failed = {
            let mut status = lock_status(&self.status);
            if status.is_active() {
                *status = CrawlStatus::Failed;
                true
            } else {
                false
            }
        };

        if failed {
            tracing::error!("Crawl worker exited abnormally");
            self.events
                .publish(CrawlEvent::StatusChanged(CrawlStatus::Failed));
        }
    }
}
