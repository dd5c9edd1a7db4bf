//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator is the only owner of the frontier, the politeness state
//! and the result accumulator. Fetches run as tokio tasks; each task parses
//! the page it fetched and reports back over a channel. Nothing shared is
//! mutated outside the coordinator.

use super::fetcher::{build_http_client, FetchReport, Fetcher};
use super::frontier::{Enqueued, Frontier, UrlNode};
use super::parser::{parse_html, DiscoveredLink};
use super::retry::RetryPolicy;
use super::scheduler::Scheduler;
use crate::config::{Config, SiteEntry};
use crate::record::{BrokenLinkRecord, VisitResult};
use crate::status::{classify, ExclusionReason, FetchOutcome, LinkStatus};
use crate::url::SiteScope;
use crate::{LinkwatchError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use url::Host;

/// Completed URLs between progress log lines
const MILESTONE_INTERVAL: usize = 100;

/// Longest wait when only a completion or the deadline can unblock the loop
const IDLE_CEILING: Duration = Duration::from_secs(1);

/// Bound on resolving the seed host before the crawl starts
const SEED_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Message sent by a fetch task when it finishes
#[derive(Debug)]
struct Completion {
    node: UrlNode,
    report: FetchReport,
    links: Vec<DiscoveredLink>,
    checked_at: DateTime<Utc>,
}

/// Check result for one URL; referrer data is attached when the crawl ends
#[derive(Debug)]
struct Checked {
    status: LinkStatus,
    attempts: u32,
    redirect_chain: Vec<String>,
    checked_at: DateTime<Utc>,
}

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub region: String,
    /// One result per checked URL, sorted by URL
    pub results: Vec<VisitResult>,
    /// Links were left untracked because of the URL bound
    pub truncated: bool,
    /// The deadline stopped dispatching before the queue was empty
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CrawlOutcome {
    /// Broken-link rows for this crawl's region
    pub fn broken_records(&self) -> Vec<BrokenLinkRecord> {
        self.results
            .iter()
            .filter_map(|result| result.to_broken_record(&self.region))
            .collect()
    }

    /// Returns true if the crawl stopped before covering the whole site
    pub fn is_partial(&self) -> bool {
        self.truncated || self.cancelled
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    region: String,
    frontier: Frontier,
    scheduler: Scheduler,
    fetcher: Arc<Fetcher>,
    checked: HashMap<String, Checked>,
    max_workers: usize,
    max_urls: Option<usize>,
    deadline_after: Option<Duration>,
    deadline: Option<Instant>,
    in_flight: usize,
    cancelled: bool,
    truncation_logged: bool,
    last_milestone: usize,
    started: Instant,
}

impl Coordinator {
    /// Creates a coordinator for one configured site
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(LinkwatchError)` - The seed is malformed or the client failed to build
    pub fn new(config: &Config, site: &SiteEntry) -> Result<Self> {
        let scope = SiteScope::from_site(site)?;
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        let fetcher = Fetcher::new(
            client,
            scope.clone(),
            RetryPolicy::from_config(&config.retry),
            &config.crawler,
        );

        Ok(Self {
            region: scope.region().to_string(),
            frontier: Frontier::new(
                scope,
                config.crawler.max_urls,
                config.crawler.max_path_length,
            ),
            scheduler: Scheduler::new(config.crawler.clone()),
            fetcher: Arc::new(fetcher),
            checked: HashMap::new(),
            max_workers: config.crawler.max_concurrent_requests.max(1) as usize,
            max_urls: config.crawler.max_urls,
            deadline_after: config.crawler.deadline(),
            deadline: None,
            in_flight: 0,
            cancelled: false,
            truncation_logged: false,
            last_milestone: 0,
            started: Instant::now(),
        })
    }

    /// Runs the crawl to completion
    ///
    /// The loop:
    /// 1. Dispatches every queued URL that politeness allows
    /// 2. Waits for a fetch to complete or a host to become ready
    /// 3. Records the result and enqueues the links the page contained
    ///
    /// It ends when the queue is empty and nothing is in flight, or when the
    /// deadline passes and the in-flight fetches have drained.
    pub async fn run(mut self) -> Result<CrawlOutcome> {
        self.check_seed().await?;

        self.started = Instant::now();
        self.deadline = self.deadline_after.map(|after| self.started + after);

        tracing::info!(
            "Starting crawl of {} from {}",
            self.region,
            self.frontier.scope().seed()
        );

        let (tx, mut rx) = mpsc::channel::<Completion>(self.max_workers);

        loop {
            if !self.cancelled && self.deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::info!(
                    "Deadline reached for {}: {} URLs left unvisited, waiting for {} in flight",
                    self.region,
                    self.frontier.queue_len(),
                    self.in_flight
                );
                self.cancelled = true;
            }

            if !self.cancelled {
                self.dispatch_ready(&tx);
            }

            if self.in_flight == 0 && (self.cancelled || self.frontier.is_exhausted()) {
                break;
            }

            let wait = self.idle_wait();
            tokio::select! {
                Some(completion) = rx.recv() => self.handle_completion(completion),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Ok(self.finish())
    }

    /// Fails if the seed host cannot be resolved at all
    async fn check_seed(&self) -> Result<()> {
        let seed = self.frontier.scope().seed();
        let seed_error = |reason: String| LinkwatchError::SeedUnreachable {
            url: seed.to_string(),
            reason,
        };

        let domain = match seed.host() {
            Some(Host::Domain(domain)) => domain,
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => return Ok(()),
            None => return Err(seed_error("seed has no host".to_string())),
        };
        let port = seed.port_or_known_default().unwrap_or(80);

        let lookup = tokio::time::timeout(
            SEED_LOOKUP_TIMEOUT,
            tokio::net::lookup_host((domain, port)),
        )
        .await;

        match lookup {
            Ok(Ok(mut addrs)) => match addrs.next() {
                Some(_) => Ok(()),
                None => Err(seed_error(format!("{} resolved to no addresses", domain))),
            },
            Ok(Err(e)) => Err(seed_error(format!("DNS lookup for {} failed: {}", domain, e))),
            Err(_) => Err(seed_error(format!("DNS lookup for {} timed out", domain))),
        }
    }

    /// Dispatches queued URLs until nothing more is allowed to start
    fn dispatch_ready(&mut self, tx: &mpsc::Sender<Completion>) {
        loop {
            let now = Instant::now();
            let permit = self.scheduler.try_acquire_worker();
            let scheduler = &self.scheduler;
            let has_worker = permit.is_some();

            let Some(node) = self
                .frontier
                .dequeue_ready(|host| has_worker && scheduler.can_dispatch(host, now))
            else {
                break;
            };

            if let Some(reason) = node.skip.clone() {
                self.record_unfetched(node, reason);
                continue;
            }

            if let Some(permit) = permit {
                self.spawn_fetch(node, permit, tx, now);
            }
        }
    }

    fn spawn_fetch(
        &mut self,
        node: UrlNode,
        permit: OwnedSemaphorePermit,
        tx: &mpsc::Sender<Completion>,
        now: Instant,
    ) {
        self.scheduler.record_dispatch(&node.host, now);
        self.in_flight += 1;

        let fetcher = Arc::clone(&self.fetcher);
        let tx = tx.clone();

        tokio::spawn(async move {
            tracing::debug!("Fetching {}", node.fetch_url);
            let report = fetcher.fetch(&node.fetch_url, true).await;
            drop(permit);

            let links = match &report.outcome {
                FetchOutcome::Response(response) => match response.body.as_deref() {
                    Some(body) => {
                        let base = url::Url::parse(&response.final_url)
                            .unwrap_or_else(|_| node.fetch_url.clone());
                        parse_html(body, &base).links
                    }
                    None => Vec::new(),
                },
                _ => Vec::new(),
            };

            let identity = node.identity.clone();
            let completion = Completion {
                node,
                report,
                links,
                checked_at: Utc::now(),
            };
            if tx.send(completion).await.is_err() {
                tracing::debug!("Coordinator gone before result for {} arrived", identity);
            }
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            node,
            report,
            links,
            checked_at,
        } = completion;

        self.in_flight = self.in_flight.saturating_sub(1);
        self.scheduler.record_completion(&node.host);

        let status = classify(&report.outcome);
        if report.attempts > 1 {
            tracing::debug!(
                "{} finished after {} attempts: {}",
                node.fetch_url,
                report.attempts,
                status
            );
        }
        if status.is_broken() {
            tracing::info!("Broken link {} ({}) at {}", node.fetch_url, status, node.path);
        }

        let redirect_chain = match report.outcome {
            FetchOutcome::Response(response) => response.redirect_chain,
            _ => Vec::new(),
        };

        for link in &links {
            if self.frontier.enqueue(&link.url, &node.identity, link.visible) == Enqueued::Dropped
                && !self.truncation_logged
            {
                tracing::info!(
                    "Reached max URLs limit ({}), no further links will be tracked",
                    self.max_urls.unwrap_or_default()
                );
                self.truncation_logged = true;
            }
        }

        self.checked.insert(
            node.identity,
            Checked {
                status,
                attempts: report.attempts,
                redirect_chain,
                checked_at,
            },
        );
        self.log_milestone();
    }

    /// Records a link that is classified without being requested
    fn record_unfetched(&mut self, node: UrlNode, reason: ExclusionReason) {
        let status = classify(&FetchOutcome::Skipped(reason));
        tracing::trace!("Recording {} without fetching: {}", node.fetch_url, status);

        self.checked.insert(
            node.identity,
            Checked {
                status,
                attempts: 0,
                redirect_chain: Vec::new(),
                checked_at: Utc::now(),
            },
        );
        self.log_milestone();
    }

    fn log_milestone(&mut self) {
        let completed = self.checked.len();
        if completed % MILESTONE_INTERVAL == 0 && completed > self.last_milestone {
            self.last_milestone = completed;
            tracing::info!(
                "Processed {} links in {:.2} seconds, {} queued, {} in flight",
                completed,
                self.started.elapsed().as_secs_f64(),
                self.frontier.queue_len(),
                self.in_flight
            );
        }
    }

    fn idle_wait(&self) -> Duration {
        let now = Instant::now();
        let mut wait = if self.cancelled
            || self.frontier.is_exhausted()
            || self.in_flight >= self.max_workers
        {
            IDLE_CEILING
        } else {
            self.scheduler
                .time_until_ready(self.frontier.pending_hosts(), now)
        };

        if let Some(deadline) = self.deadline.filter(|_| !self.cancelled) {
            wait = wait.min(deadline.saturating_duration_since(now));
        }

        wait.max(Duration::from_millis(1))
    }

    /// Joins check results with what the frontier knows about each URL
    fn finish(self) -> CrawlOutcome {
        let Self {
            region,
            frontier,
            scheduler,
            checked,
            cancelled,
            started,
            ..
        } = self;

        let truncated = frontier.is_truncated();
        let tracked = frontier.into_tracked();
        let unvisited = tracked.len().saturating_sub(checked.len());

        let mut results: Vec<VisitResult> = checked
            .into_iter()
            .filter_map(|(identity, checked)| {
                let entry = tracked.get(&identity)?;
                Some(VisitResult {
                    url: identity,
                    fetch_url: entry.node.fetch_url.to_string(),
                    status: checked.status,
                    is_internal: entry.node.is_internal(),
                    is_visible_link: entry.visible,
                    referring_pages: entry.referrers.clone(),
                    path: entry.node.path.clone(),
                    depth: entry.node.depth,
                    attempts: checked.attempts,
                    redirect_chain: checked.redirect_chain,
                    checked_at: checked.checked_at,
                })
            })
            .collect();
        results.sort_by(|a, b| a.url.cmp(&b.url));

        let elapsed = started.elapsed();
        let broken = results.iter().filter(|r| r.status.is_broken()).count();
        tracing::info!(
            "Crawl of {} completed: {} URLs checked ({} broken) across {} hosts in {:?}",
            region,
            results.len(),
            broken,
            scheduler.hosts_contacted(),
            elapsed
        );
        if truncated || cancelled {
            tracing::info!(
                "Crawl of {} was partial: {} tracked URLs not visited",
                region,
                unvisited
            );
        }

        CrawlOutcome {
            region,
            results,
            truncated,
            cancelled,
            elapsed,
        }
    }
}

/// Crawls one configured site
///
/// # Example
///
/// ```no_run
/// use linkwatch::config::load_config;
/// use linkwatch::crawler::crawl_site;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let outcome = crawl_site(&config, &config.sites[0]).await?;
/// println!("{} broken links", outcome.broken_records().len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl_site(config: &Config, site: &SiteEntry) -> Result<CrawlOutcome> {
    Coordinator::new(config, site)?.run().await
}
