//! Integration tests for the crawl controller
//!
//! These tests drive full crawl sessions against an in-memory wiki so the
//! traversal orders, stop conditions and the pause/resume/stop lifecycle can
//! be checked end-to-end without network access.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use wikiweave::config::{CrawlSettings, SearchAlgo, StopConditions};
use wikiweave::graph::read_graph;
use wikiweave::{
    CrawlController, CrawlError, CrawlEvent, CrawlStatus, FetchError, PageFetcher, PageRecord,
    StopReason,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// In-memory wiki keyed by requested title
#[derive(Default)]
struct MapFetcher {
    pages: HashMap<String, PageRecord>,
    panic_on: Option<String>,
    random: String,
    latency: Duration,
    log: Mutex<Vec<String>>,
}

impl MapFetcher {
    fn new() -> Self {
        Self {
            random: "A".to_string(),
            ..Default::default()
        }
    }

    fn page(mut self, page_id: u64, title: &str, links: &[&str]) -> Self {
        let links = links.iter().map(|s| s.to_string()).collect();
        self.pages
            .insert(title.to_string(), PageRecord::new(page_id, title, links));
        self
    }

    /// Requests for `alias` resolve to the page stored under `target`
    fn alias(mut self, alias: &str, target: &str) -> Self {
        let record = self.pages[target].clone();
        self.pages.insert(alias.to_string(), record);
        self
    }

    fn with_record(mut self, record: PageRecord) -> Self {
        self.pages.insert(record.title.clone(), record);
        self
    }

    fn panic_on(mut self, title: &str) -> Self {
        self.panic_on = Some(title.to_string());
        self
    }

    fn random(mut self, title: &str) -> Self {
        self.random = title.to_string();
        self
    }

    fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(
        &self,
        _language: &str,
        title: &str,
        _load_details: bool,
    ) -> Result<PageRecord, FetchError> {
        self.log.lock().unwrap().push(title.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.panic_on.as_deref() == Some(title) {
            panic!("fetcher blew up on '{}'", title);
        }

        self.pages
            .get(title)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                title: title.to_string(),
            })
    }

    async fn random_title(&self, _language: &str) -> Result<String, FetchError> {
        Ok(self.random.clone())
    }
}

/// A -> B, C; B -> D, E; C -> F
fn tree() -> MapFetcher {
    MapFetcher::new()
        .page(1, "A", &["B", "C"])
        .page(2, "B", &["D", "E"])
        .page(3, "C", &["F"])
        .page(4, "D", &[])
        .page(5, "E", &[])
        .page(6, "F", &[])
}

/// P0 -> P1 -> ... -> Pn
fn chain(n: usize) -> MapFetcher {
    let mut fetcher = MapFetcher::new();
    for i in 0..=n {
        let next = format!("P{}", i + 1);
        let links: Vec<&str> = if i < n { vec![next.as_str()] } else { vec![] };
        fetcher = fetcher.page(i as u64 + 1, &format!("P{}", i), &links);
    }
    fetcher
}

fn settings(start: &str) -> CrawlSettings {
    CrawlSettings {
        delay_seconds: 0.0,
        start_title: Some(start.to_string()),
        load_details: false,
        ..Default::default()
    }
}

fn with_stop(start: &str, stop: StopConditions) -> CrawlSettings {
    CrawlSettings {
        stop,
        ..settings(start)
    }
}

async fn run_to_end(controller: &mut CrawlController, settings: CrawlSettings) -> CrawlStatus {
    controller.start(settings).await.unwrap();
    timeout(TEST_TIMEOUT, controller.wait())
        .await
        .expect("crawl did not finish in time")
}

async fn next_event(events: &mut broadcast::Receiver<CrawlEvent>) -> CrawlEvent {
    timeout(TEST_TIMEOUT, events.recv())
        .await
        .expect("no event in time")
        .expect("event channel closed")
}

async fn done_reason(events: &mut broadcast::Receiver<CrawlEvent>) -> StopReason {
    loop {
        if let CrawlEvent::CrawlDone { reason } = next_event(events).await {
            return reason;
        }
    }
}

/// A -> B, C; B -> (none); C -> A
fn cycle() -> MapFetcher {
    MapFetcher::new()
        .page(1, "A", &["B", "C"])
        .page(2, "B", &[])
        .page(3, "C", &["A"])
}

#[tokio::test]
async fn test_cycle_terminates_with_three_vertices() {
    let fetcher = Arc::new(cycle());
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let status = run_to_end(&mut controller, settings("A")).await;

    assert_eq!(status, CrawlStatus::Done);
    assert_eq!(done_reason(&mut events).await, StopReason::Exhausted);
    assert_eq!(fetcher.fetched(), vec!["A", "B", "C"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    assert_eq!(graph.vertex_count(), 3);
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.visited_count(), 3);

    let a = graph.find("A").unwrap();
    let c = graph.find("C").unwrap();
    assert!(graph.edges().any(|edge| edge == (c, a)));
}

#[tokio::test]
async fn test_cycle_after_two_visits() {
    let fetcher = Arc::new(cycle());
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let stop = StopConditions {
        max_page: Some(2),
        ..Default::default()
    };
    run_to_end(&mut controller, with_stop("A", stop)).await;

    assert_eq!(done_reason(&mut events).await, StopReason::MaxPages(2));
    assert_eq!(fetcher.fetched(), vec!["A", "B"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    assert_eq!(graph.vertex_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(!graph.is_visited("C"));
}

#[tokio::test]
async fn test_reach_page_fires_on_discovery() {
    let fetcher = Arc::new(cycle());
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let stop = StopConditions {
        reach_page: Some("B".to_string()),
        ..Default::default()
    };
    let status = run_to_end(&mut controller, with_stop("A", stop)).await;

    assert_eq!(status, CrawlStatus::Done);
    assert_eq!(
        done_reason(&mut events).await,
        StopReason::ReachedPage("B".to_string())
    );
    // "B" is only discovered, never fetched
    assert_eq!(fetcher.fetched(), vec!["A"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    assert!(!graph.is_visited("B"));
    assert!(graph.contains_title("B"));
    assert_eq!(graph.vertex_count(), 3);
}

#[tokio::test]
async fn test_max_page_one_stops_after_seed() {
    let fetcher = Arc::new(tree());
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let stop = StopConditions {
        max_page: Some(1),
        ..Default::default()
    };
    run_to_end(&mut controller, with_stop("A", stop)).await;

    assert_eq!(done_reason(&mut events).await, StopReason::MaxPages(1));
    assert_eq!(fetcher.fetched(), vec!["A"]);
    assert_eq!(read_graph(&controller.graph()).visited_count(), 1);
}

#[tokio::test]
async fn test_max_depth_stops_below_limit() {
    let fetcher = Arc::new(chain(10));
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let stop = StopConditions {
        max_depth: Some(2),
        ..Default::default()
    };
    run_to_end(&mut controller, with_stop("P0", stop)).await;

    assert_eq!(done_reason(&mut events).await, StopReason::MaxDepth(2));
    assert_eq!(fetcher.fetched(), vec!["P0", "P1", "P2"]);
}

#[tokio::test]
async fn test_time_limit_stops_crawl() {
    let fetcher = Arc::new(chain(1000).latency(Duration::from_millis(20)));
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let stop = StopConditions {
        time_limit_seconds: Some(0.1),
        ..Default::default()
    };
    run_to_end(&mut controller, with_stop("P0", stop)).await;

    assert_eq!(
        done_reason(&mut events).await,
        StopReason::TimeLimit(Duration::from_millis(100))
    );
    assert!(controller.elapsed() > Duration::from_millis(100));
    assert!(fetcher.fetched().len() < 1000);
}

#[tokio::test]
async fn test_bfs_visits_by_depth() {
    let fetcher = Arc::new(tree());
    let mut controller = CrawlController::new(fetcher.clone());

    run_to_end(&mut controller, settings("A")).await;

    assert_eq!(fetcher.fetched(), vec!["A", "B", "C", "D", "E", "F"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    let depths: Vec<usize> = fetcher
        .fetched()
        .iter()
        .map(|title| graph.depth_of(graph.find(title).unwrap()).unwrap())
        .collect();
    assert!(depths.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_dfs_follows_latest_page_first() {
    let fetcher = Arc::new(tree());
    let mut controller = CrawlController::new(fetcher.clone());

    let dfs = CrawlSettings {
        search_algo: SearchAlgo::Dfs,
        ..settings("A")
    };
    run_to_end(&mut controller, dfs).await;

    assert_eq!(fetcher.fetched(), vec!["A", "B", "D", "E", "C", "F"]);
}

#[tokio::test]
async fn test_random_visits_everything_once() {
    let fetcher = Arc::new(tree());
    let mut controller = CrawlController::new(fetcher.clone());

    let random = CrawlSettings {
        search_algo: SearchAlgo::Random,
        ..settings("A")
    };
    let status = run_to_end(&mut controller, random).await;

    assert_eq!(status, CrawlStatus::Done);
    let fetched = fetcher.fetched();
    assert_eq!(fetched[0], "A");
    let unique: HashSet<&String> = fetched.iter().collect();
    assert_eq!(unique.len(), 6);
    assert_eq!(fetched.len(), 6);
}

#[tokio::test]
async fn test_fetch_failures_are_skipped() {
    let fetcher = Arc::new(
        MapFetcher::new()
            .page(1, "A", &["Missing", "C"])
            .page(3, "C", &[]),
    );
    let mut controller = CrawlController::new(fetcher.clone());

    let status = run_to_end(&mut controller, settings("A")).await;

    assert_eq!(status, CrawlStatus::Done);
    assert_eq!(fetcher.fetched(), vec!["A", "Missing", "C"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    assert!(graph.is_visited("C"));
    assert!(!graph.is_visited("Missing"));
    assert_eq!(graph.vertex_count(), 3);
}

#[tokio::test]
async fn test_duplicate_page_id_is_discarded() {
    // "Alias" resolves to the page already visited as "A"
    let fetcher = Arc::new(
        MapFetcher::new()
            .page(1, "A", &["Alias", "B"])
            .page(2, "B", &[])
            .alias("Alias", "A"),
    );
    let mut controller = CrawlController::new(fetcher.clone());

    run_to_end(&mut controller, settings("A")).await;

    assert_eq!(fetcher.fetched(), vec!["A", "Alias", "B"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    assert_eq!(graph.visited_count(), 2);
    assert!(!graph.is_visited("Alias"));

    let page_ids: Vec<u64> = graph.vertices().filter_map(|(_, v)| v.page_id).collect();
    let unique: HashSet<&u64> = page_ids.iter().collect();
    assert_eq!(unique.len(), page_ids.len());
}

#[tokio::test]
async fn test_redirected_start_adopts_canonical_title() {
    let fetcher = Arc::new(
        MapFetcher::new()
            .page(1, "Graph theory", &["Vertex"])
            .page(2, "Vertex", &["Graph theory"])
            .alias("Graph", "Graph theory"),
    );
    let mut controller = CrawlController::new(fetcher.clone());

    run_to_end(&mut controller, settings("Graph")).await;

    // The link back to "Graph theory" resolves to the seed vertex
    assert_eq!(fetcher.fetched(), vec!["Graph", "Vertex"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    let root = graph.root().unwrap();
    assert_eq!(graph.vertex(root).unwrap().title, "Graph theory");
    assert_eq!(graph.find("Graph"), Some(root));
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.in_degree(root), 1);
}

#[tokio::test]
async fn test_redirect_onto_discovered_title_is_not_refetched() {
    let fetcher = Arc::new(
        MapFetcher::new()
            .page(1, "A", &["Graph", "Graph theory"])
            .page(2, "Graph theory", &[])
            .alias("Graph", "Graph theory"),
    );
    let mut controller = CrawlController::new(fetcher.clone());

    let status = run_to_end(&mut controller, settings("A")).await;

    assert_eq!(status, CrawlStatus::Done);
    assert_eq!(fetcher.fetched(), vec!["A", "Graph"]);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    let titles: Vec<&str> = graph.vertices().map(|(_, v)| v.title.as_str()).collect();
    let unique: HashSet<&str> = titles.iter().copied().collect();
    assert_eq!(unique.len(), titles.len(), "duplicate titles: {:?}", titles);
    assert_eq!(graph.visited_count(), 2);
    assert!(graph.is_visited("Graph theory"));
}

#[tokio::test]
async fn test_visited_links_all_have_vertices() {
    let fetcher = Arc::new(tree());
    let mut controller = CrawlController::new(fetcher.clone());

    run_to_end(&mut controller, settings("A")).await;

    let graph = controller.graph();
    let graph = read_graph(&graph);
    for (id, vertex) in graph.vertices().filter(|(_, v)| v.visited) {
        assert_eq!(graph.out_degree(id), vertex.links.len());
        for link in &vertex.links {
            assert!(graph.contains_title(link), "no vertex for '{}'", link);
        }
    }
}

#[tokio::test]
async fn test_details_are_recorded() {
    let record = PageRecord {
        summary: Some("A page about graphs".to_string()),
        categories: Some(vec!["Graphs".to_string(), "Mathematics".to_string()]),
        references: Some(vec!["https://example.org".to_string()]),
        images: Some(vec![]),
        ..PageRecord::new(1, "A", vec![])
    };
    let fetcher = Arc::new(MapFetcher::new().with_record(record));
    let mut controller = CrawlController::new(fetcher);

    let detailed = CrawlSettings {
        load_details: true,
        ..settings("A")
    };
    run_to_end(&mut controller, detailed).await;

    let graph = controller.graph();
    let graph = read_graph(&graph);
    let details = graph
        .vertex(graph.root().unwrap())
        .unwrap()
        .details
        .clone()
        .unwrap();
    assert_eq!(details.word_count, 4);
    assert_eq!(details.category_count, 2);
    assert_eq!(details.reference_count, 1);
    assert_eq!(graph.categories().len(), 2);
}

#[tokio::test]
async fn test_events_are_published() {
    let fetcher = Arc::new(MapFetcher::new().page(1, "A", &[]));
    let mut controller = CrawlController::new(fetcher);
    let mut events = controller.subscribe();

    run_to_end(&mut controller, settings("A")).await;

    assert_eq!(
        next_event(&mut events).await,
        CrawlEvent::StatusChanged(CrawlStatus::Running)
    );
    assert!(matches!(
        next_event(&mut events).await,
        CrawlEvent::ElapsedTimeChanged(_)
    ));
    assert_eq!(
        next_event(&mut events).await,
        CrawlEvent::VerticesAdded {
            vertex_count: 1,
            edge_count: 0
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        CrawlEvent::StatusChanged(CrawlStatus::Done)
    );
    assert_eq!(
        next_event(&mut events).await,
        CrawlEvent::CrawlDone {
            reason: StopReason::Exhausted
        }
    );
}

#[tokio::test]
async fn test_random_start_title() {
    let fetcher = Arc::new(tree().random("C"));
    let mut controller = CrawlController::new(fetcher.clone());

    let mut random_start = settings("A");
    random_start.start_title = None;
    run_to_end(&mut controller, random_start).await;

    assert_eq!(controller.session().unwrap().start_title, "C");
    assert_eq!(fetcher.fetched(), vec!["C", "F"]);
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let mut controller = CrawlController::new(Arc::new(tree()));

    let mut bad = settings("A");
    bad.delay_seconds = -1.0;
    assert!(matches!(
        controller.start(bad).await,
        Err(CrawlError::Config(_))
    ));

    let bad = with_stop(
        "A",
        StopConditions {
            max_page: Some(0),
            ..Default::default()
        },
    );
    assert!(matches!(
        controller.start(bad).await,
        Err(CrawlError::Config(_))
    ));

    assert_eq!(controller.status(), CrawlStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_blocks_progress_until_resume() {
    let fetcher = Arc::new(chain(40).latency(Duration::from_millis(5)));
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    let mut slow = settings("P0");
    slow.delay_seconds = 0.02;
    controller.start(slow).await.unwrap();

    // Let at least one page land
    loop {
        if let CrawlEvent::VerticesAdded { .. } = next_event(&mut events).await {
            break;
        }
    }

    controller.pause().unwrap();
    assert_eq!(controller.status(), CrawlStatus::Paused);

    // One in-flight page may still complete
    tokio::time::sleep(Duration::from_millis(150)).await;
    let fetched = fetcher.fetched().len();
    let elapsed = controller.elapsed();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fetcher.fetched().len(), fetched);
    assert_eq!(controller.elapsed(), elapsed);
    assert!(fetched < 41);

    {
        let graph = controller.graph();
        let graph = read_graph(&graph);
        for (_, vertex) in graph.vertices().filter(|(_, v)| v.visited) {
            for link in &vertex.links {
                assert!(graph.contains_title(link));
            }
        }
    }

    controller.resume().unwrap();
    let status = timeout(TEST_TIMEOUT, controller.wait()).await.unwrap();

    assert_eq!(status, CrawlStatus::Done);
    assert_eq!(fetcher.fetched().len(), 41);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_then_start_uses_fresh_graph() {
    let fetcher = Arc::new(
        chain(1000)
            .latency(Duration::from_millis(5))
            .page(5000, "X", &["Y"])
            .page(5001, "Y", &[]),
    );
    let mut controller = CrawlController::new(fetcher.clone());
    let mut events = controller.subscribe();

    controller.start(settings("P0")).await.unwrap();
    loop {
        if let CrawlEvent::VerticesAdded { .. } = next_event(&mut events).await {
            break;
        }
    }

    timeout(TEST_TIMEOUT, controller.stop())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(controller.status(), CrawlStatus::Stopped);

    let status = run_to_end(&mut controller, settings("X")).await;
    assert_eq!(status, CrawlStatus::Done);

    let graph = controller.graph();
    let graph = read_graph(&graph);
    let titles: HashSet<&str> = graph.vertices().map(|(_, v)| v.title.as_str()).collect();
    assert_eq!(titles, HashSet::from(["X", "Y"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_while_paused() {
    let fetcher = Arc::new(chain(1000).latency(Duration::from_millis(5)));
    let mut controller = CrawlController::new(fetcher.clone());

    controller.start(settings("P0")).await.unwrap();
    controller.pause().unwrap();

    timeout(TEST_TIMEOUT, controller.stop())
        .await
        .expect("stop hung on a paused worker")
        .unwrap();

    assert_eq!(controller.status(), CrawlStatus::Stopped);
    assert!(fetcher.fetched().len() < 1000);
}

#[tokio::test]
async fn test_stop_interrupts_delay() {
    let fetcher = Arc::new(chain(5));
    let mut controller = CrawlController::new(fetcher.clone());

    let mut slow = settings("P0");
    slow.delay_seconds = 60.0;
    controller.start(slow).await.unwrap();

    // Once the first fetch is logged the worker is sleeping its delay
    while fetcher.fetched().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    timeout(Duration::from_secs(5), controller.stop())
        .await
        .expect("stop waited for the full delay")
        .unwrap();

    assert_eq!(fetcher.fetched(), vec!["P0"]);
}

#[tokio::test]
async fn test_worker_panic_moves_to_failed() {
    let fetcher = Arc::new(
        MapFetcher::new()
            .page(1, "A", &["B"])
            .page(2, "B", &[])
            .panic_on("B"),
    );
    let mut controller = CrawlController::new(fetcher);

    let status = run_to_end(&mut controller, settings("A")).await;
    assert_eq!(status, CrawlStatus::Failed);

    let stopped = timeout(TEST_TIMEOUT, controller.stop())
        .await
        .expect("stop hung after worker panic");
    assert!(matches!(stopped, Err(CrawlError::Worker(_))));
    assert_eq!(controller.status(), CrawlStatus::Stopped);

    // The controller is usable again
    assert!(matches!(
        controller.pause(),
        Err(CrawlError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_illegal_transitions() {
    let fetcher = Arc::new(chain(1000).latency(Duration::from_millis(50)));
    let mut controller = CrawlController::new(fetcher);

    controller.start(settings("P0")).await.unwrap();

    assert!(matches!(
        controller.resume(),
        Err(CrawlError::InvalidTransition {
            from: CrawlStatus::Running,
            action: "resume"
        })
    ));

    // Starting again while active is ignored
    controller.start(settings("P500")).await.unwrap();
    assert_eq!(controller.session().unwrap().start_title, "P0");

    controller.pause().unwrap();
    assert!(matches!(
        controller.pause(),
        Err(CrawlError::InvalidTransition {
            from: CrawlStatus::Paused,
            action: "pause"
        })
    ));

    controller.stop().await.unwrap();
    assert!(matches!(
        controller.stop().await,
        Err(CrawlError::InvalidTransition {
            from: CrawlStatus::Stopped,
            action: "stop"
        })
    ));
}

#[tokio::test]
async fn test_done_allows_restart() {
    let fetcher = Arc::new(tree());
    let mut controller = CrawlController::new(fetcher.clone());

    assert_eq!(
        run_to_end(&mut controller, settings("C")).await,
        CrawlStatus::Done
    );
    assert!(controller.pause().is_err());

    assert_eq!(
        run_to_end(&mut controller, settings("B")).await,
        CrawlStatus::Done
    );
    assert_eq!(fetcher.fetched(), vec!["C", "F", "B", "D", "E"]);
    assert_eq!(read_graph(&controller.graph()).vertex_count(), 3);
}
