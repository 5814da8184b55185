//! Crawl controller - session lifecycle and state machine
//!
//! The controller owns the session status and the control channel of its
//! worker. Transitions:
//! - `start`: stopped / done / failed -> running (no-op while active)
//! - `pause`: running -> paused
//! - `resume`: paused -> running
//! - `stop`: any state but stopped -> stopped, after the worker has exited
//!
//! The worker moves the session to done (or failed) on its own.

use crate::config::{validate_settings, CrawlSettings};
use crate::crawler::events::{CrawlEvent, EventBus};
use crate::crawler::frontier::Frontier;
use crate::crawler::worker::{lock_status, Control, Worker};
use crate::graph::{shared_graph, write_graph, CrawlGraph, SharedGraph};
use crate::state::{CrawlStatus, ElapsedClock};
use crate::wiki::PageFetcher;
use crate::{CrawlError, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Facts about the most recently started session
#[derive(Debug, Clone)]
pub struct CrawlSession {
    pub started_at: DateTime<Utc>,

    /// Seed title, resolved to a random page if none was configured
    pub start_title: String,

    pub settings: CrawlSettings,
}

/// Drives crawl sessions over a page fetcher
pub struct CrawlController {
    fetcher: Arc<dyn PageFetcher>,
    graph: SharedGraph,
    status: Arc<Mutex<CrawlStatus>>,
    clock: Arc<ElapsedClock>,
    events: EventBus,
    control: watch::Sender<Control>,
    worker: Option<JoinHandle<()>>,
    session: Option<CrawlSession>,
}

impl CrawlController {
    /// Creates an idle controller
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        let (control, _) = watch::channel(Control::Stop);
        Self {
            fetcher,
            graph: shared_graph(false),
            status: Arc::new(Mutex::new(CrawlStatus::Stopped)),
            clock: Arc::new(ElapsedClock::new()),
            events: EventBus::new(),
            control,
            worker: None,
            session: None,
        }
    }

    /// Starts a fresh crawl session
    ///
    /// Validates the settings, resets the graph and the active-time clock,
    /// seeds the graph with the start title and spawns the worker. Starting
    /// while a session is running or paused does nothing.
    ///
    /// # Errors
    ///
    /// * `CrawlError::Config` - The settings are invalid
    /// * `CrawlError::Fetch` - No start title was set and picking a random one failed
    pub async fn start(&mut self, settings: CrawlSettings) -> Result<()> {
        let current = self.status();
        if !current.can_start() {
            tracing::debug!("Ignoring start while {}", current);
            return Ok(());
        }

        validate_settings(&settings)?;

        if let Some(previous) = self.worker.take() {
            if let Err(e) = previous.await {
                tracing::warn!("Previous crawl worker ended abnormally: {}", e);
            }
        }

        let start_title = match &settings.start_title {
            Some(title) => title.trim().to_string(),
            None => {
                let title = self.fetcher.random_title(&settings.language).await?;
                tracing::info!("Picked random start page '{}'", title);
                title
            }
        };

        {
            let mut graph = write_graph(&self.graph);
            *graph = CrawlGraph::new(settings.load_details);
            graph.ensure_vertex(&start_title);
        }
        self.clock.reset();

        let mut frontier = Frontier::new(settings.search_algo);
        frontier.push([start_title.clone()]);

        let (control, receiver) = watch::channel(Control::Run);
        self.control = control;

        self.set_status(CrawlStatus::Running);

        let worker = Worker {
            fetcher: Arc::clone(&self.fetcher),
            graph: Arc::clone(&self.graph),
            status: Arc::clone(&self.status),
            clock: Arc::clone(&self.clock),
            events: self.events.clone(),
            control: receiver,
            frontier,
            settings: settings.clone(),
        };
        self.worker = Some(tokio::spawn(worker.run()));

        tracing::info!(
            "Started {} crawl of {}.wikipedia from '{}'",
            settings.search_algo,
            settings.language,
            start_title
        );

        self.session = Some(CrawlSession {
            started_at: Utc::now(),
            start_title,
            settings,
        });

        Ok(())
    }

    /// Closes the pause gate; the worker parks after its current page
    pub fn pause(&self) -> Result<()> {
        self.transition(CrawlStatus::Paused, "pause", Control::Pause, |s| {
            s.can_pause()
        })?;
        tracing::info!("Crawl paused");
        Ok(())
    }

    /// Opens the pause gate again
    pub fn resume(&self) -> Result<()> {
        self.transition(CrawlStatus::Running, "resume", Control::Run, |s| {
            s.can_resume()
        })?;
        tracing::info!("Crawl resumed");
        Ok(())
    }

    /// Requests termination and waits for the worker to exit
    ///
    /// A fetch already in flight completes and is committed first. The
    /// session ends as `Stopped` even when the worker panicked; the panic is
    /// then reported as `CrawlError::Worker`.
    pub async fn stop(&mut self) -> Result<()> {
        let from = self.status();
        if !from.can_stop() {
            return Err(CrawlError::InvalidTransition {
                from,
                action: "stop",
            });
        }

        self.control.send_replace(Control::Stop);

        let joined = match self.worker.take() {
            Some(worker) => worker.await,
            None => Ok(()),
        };

        self.set_status(CrawlStatus::Stopped);
        tracing::info!("Crawl stopped");

        joined.map_err(|e| CrawlError::Worker(e.to_string()))
    }

    /// Waits until the current session is no longer active
    ///
    /// Returns immediately if no session is running or paused.
    pub async fn wait(&self) -> CrawlStatus {
        let mut events = self.subscribe();
        loop {
            let status = self.status();
            if !status.is_active() {
                return status;
            }
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return self.status(),
            }
        }
    }

    pub fn status(&self) -> CrawlStatus {
        *lock_status(&self.status)
    }

    /// Active crawl time of the current session, paused time excluded
    pub fn elapsed(&self) -> Duration {
        self.clock.get()
    }

    /// Handle to the shared graph; it stays valid across sessions
    pub fn graph(&self) -> SharedGraph {
        Arc::clone(&self.graph)
    }

    pub fn session(&self) -> Option<&CrawlSession> {
        self.session.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.events.subscribe()
    }

    fn transition(
        &self,
        next: CrawlStatus,
        action: &'static str,
        command: Control,
        allowed: impl Fn(&CrawlStatus) -> bool,
    ) -> Result<()> {
        {
            let mut status = lock_status(&self.status);
            if !allowed(&*status) {
                return Err(CrawlError::InvalidTransition {
                    from: *status,
                    action,
                });
            }
            self.control.send_replace(command);
            *status = next;
        }
        self.events.publish(CrawlEvent::StatusChanged(next));
        Ok(())
    }

    fn set_status(&self, next: CrawlStatus) {
        *lock_status(&self.status) = next;
        self.events.publish(CrawlEvent::StatusChanged(next));
    }
}

impl Drop for CrawlController {
    fn drop(&mut self) {
        self.control.send_replace(Control::Stop);
    }
}
