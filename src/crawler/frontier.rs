//! Frontier and visited tracker
//!
//! Owns the FIFO work queue and the set of every URL already enqueued or
//! visited. Identity is the normalized URL: a link seen again only adds a
//! referrer to the existing entry and is never queued twice.

use crate::record::extend_path;
use crate::status::ExclusionReason;
use crate::url::{host_key, normalize_parsed, LinkScope, SiteScope};
use std::collections::{BTreeSet, HashMap, VecDeque};
use url::Url;

/// A URL waiting in (or taken from) the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlNode {
    /// Normalized identity
    pub identity: String,
    /// URL to request: the discovered URL without its fragment
    pub fetch_url: Url,
    /// Politeness key (`host[:port]`), empty for non-HTTP links
    pub host: String,
    /// Hops from the seed
    pub depth: u32,
    /// Display path from the seed
    pub path: String,
    /// Set when the link is recorded without being fetched
    pub skip: Option<ExclusionReason>,
}

impl UrlNode {
    /// Returns true if the URL is requested rather than only recorded
    pub fn needs_fetch(&self) -> bool {
        self.skip.is_none()
    }

    /// Inside the crawl boundary, whether or not it is fetched
    pub fn is_internal(&self) -> bool {
        !matches!(
            self.skip,
            Some(ExclusionReason::External) | Some(ExclusionReason::Scheme(_))
        )
    }
}

/// Everything known about one tracked URL
#[derive(Debug, Clone)]
pub struct TrackedUrl {
    pub node: UrlNode,
    pub referrers: BTreeSet<String>,
    /// Visible from at least one referrer
    pub visible: bool,
}

/// What `enqueue` did with a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// New identity, added to the queue
    Queued,
    /// Already tracked; the referrer was merged in
    Merged,
    /// New identity, but the tracking bound is reached
    Dropped,
}

/// Queue entry: insertion sequence number and identity
type Slot = (u64, String);

/// Breadth-first frontier for one site
///
/// Queued URLs that need fetching wait in one lane per politeness key; the
/// rest wait in a single unfetched lane. Every entry carries a sequence
/// number, so taking the smallest ready lane head keeps global FIFO order
/// while a blocked host costs one comparison instead of a scan of its
/// whole backlog.
#[derive(Debug)]
pub struct Frontier {
    scope: SiteScope,
    lanes: HashMap<String, VecDeque<Slot>>,
    unfetched: VecDeque<Slot>,
    next_seq: u64,
    queued: usize,
    tracked: HashMap<String, TrackedUrl>,
    max_tracked: Option<usize>,
    max_path_length: usize,
    truncated: bool,
}

impl Frontier {
    /// Creates a frontier holding only the site's seed
    ///
    /// A tracking bound of zero leaves the frontier empty and truncated.
    pub fn new(scope: SiteScope, max_tracked: Option<usize>, max_path_length: usize) -> Self {
        let mut frontier = Self {
            scope,
            lanes: HashMap::new(),
            unfetched: VecDeque::new(),
            next_seq: 0,
            queued: 0,
            tracked: HashMap::new(),
            max_tracked,
            max_path_length,
            truncated: false,
        };

        if frontier.at_bound() {
            frontier.truncated = true;
            return frontier;
        }

        let seed = frontier.scope.seed().clone();
        let node = frontier.node_for(&seed, 0, seed.to_string());
        frontier.insert(node, None, true);
        frontier
    }

    pub fn scope(&self) -> &SiteScope {
        &self.scope
    }

    /// Adds a link discovered on `referrer`
    ///
    /// `referrer` must be the identity of a tracked URL; depth and display
    /// path are derived from it.
    pub fn enqueue(&mut self, url: &Url, referrer: &str, visible: bool) -> Enqueued {
        let identity = identity_for(url);

        if let Some(existing) = self.tracked.get_mut(&identity) {
            existing.referrers.insert(referrer.to_string());
            existing.visible |= visible;
            return Enqueued::Merged;
        }

        if self.at_bound() {
            self.truncated = true;
            return Enqueued::Dropped;
        }

        let (depth, path) = match self.tracked.get(referrer) {
            Some(parent) => (
                parent.node.depth + 1,
                extend_path(&parent.node.path, url.as_str(), self.max_path_length),
            ),
            None => (1, url.to_string()),
        };

        let node = self.node_for(url, depth, path);
        self.insert(node, Some(referrer), visible);
        Enqueued::Queued
    }

    /// Pops the oldest queued URL
    pub fn dequeue(&mut self) -> Option<UrlNode> {
        self.dequeue_ready(|_| true)
    }

    /// Pops the oldest queued URL whose host `host_ready` accepts
    ///
    /// URLs that are only recorded are always ready. URLs passed over keep
    /// their queue position.
    pub fn dequeue_ready<F>(&mut self, mut host_ready: F) -> Option<UrlNode>
    where
        F: FnMut(&str) -> bool,
    {
        let unfetched_head = self.unfetched.front().map(|(seq, _)| *seq);
        let lane_head = self
            .lanes
            .iter()
            .filter_map(|(host, lane)| lane.front().map(|(seq, _)| (*seq, host)))
            .filter(|&(_, host)| host_ready(host))
            .min_by_key(|&(seq, _)| seq)
            .map(|(seq, host)| (seq, host.clone()));

        let (_, identity) = match (unfetched_head, lane_head) {
            (Some(unfetched), Some((lane, _))) if unfetched < lane => self.unfetched.pop_front(),
            (_, Some((_, host))) => self.pop_lane(&host),
            (Some(_), None) => self.unfetched.pop_front(),
            (None, None) => None,
        }?;

        self.queued -= 1;
        self.tracked.get(&identity).map(|t| t.node.clone())
    }

    /// Politeness keys with at least one queued URL that needs fetching
    pub fn pending_hosts(&self) -> impl Iterator<Item = &str> + '_ {
        self.lanes.keys().map(String::as_str)
    }

    pub fn get(&self, identity: &str) -> Option<&TrackedUrl> {
        self.tracked.get(identity)
    }

    pub fn queue_len(&self) -> usize {
        self.queued
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queued == 0
    }

    /// Returns true if a URL was dropped because of the tracking bound
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Consumes the frontier, returning every tracked URL
    pub fn into_tracked(self) -> HashMap<String, TrackedUrl> {
        self.tracked
    }

    fn at_bound(&self) -> bool {
        self.max_tracked
            .is_some_and(|max| self.tracked.len() >= max)
    }

    fn pop_lane(&mut self, host: &str) -> Option<Slot> {
        let lane = self.lanes.get_mut(host)?;
        let slot = lane.pop_front();
        if lane.is_empty() {
            self.lanes.remove(host);
        }
        slot
    }

    fn insert(&mut self, node: UrlNode, referrer: Option<&str>, visible: bool) {
        let mut referrers = BTreeSet::new();
        if let Some(referrer) = referrer {
            referrers.insert(referrer.to_string());
        }

        let slot = (self.next_seq, node.identity.clone());
        self.next_seq += 1;
        self.queued += 1;
        if node.needs_fetch() {
            self.lanes.entry(node.host.clone()).or_default().push_back(slot);
        } else {
            self.unfetched.push_back(slot);
        }

        self.tracked.insert(
            node.identity.clone(),
            TrackedUrl {
                node,
                referrers,
                visible,
            },
        );
    }

    fn node_for(&self, url: &Url, depth: u32, path: String) -> UrlNode {
        let mut fetch_url = url.clone();
        fetch_url.set_fragment(None);

        let skip = if !is_http(url) {
            Some(ExclusionReason::Scheme(url.scheme().to_string()))
        } else {
            match self.scope.scope_of(url) {
                LinkScope::Internal => None,
                LinkScope::External => Some(ExclusionReason::External),
                LinkScope::Excluded(pattern) => Some(ExclusionReason::Pattern(pattern)),
            }
        };

        UrlNode {
            identity: identity_for(url),
            host: host_key(&fetch_url).unwrap_or_default(),
            fetch_url,
            depth,
            path,
            skip,
        }
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Identity used for dedup: the normalized form for HTTP links, the raw
/// string otherwise
fn identity_for(url: &Url) -> String {
    normalize_parsed(url.clone())
        .map(|normalized| normalized.to_string())
        .unwrap_or_else(|_| url.to_string())
}
