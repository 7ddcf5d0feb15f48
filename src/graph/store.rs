//! The live travel graph: static topology plus time-limited discovered links.
//!
//! Discovered links are stored one-directional; the reverse direction is
//! derived whenever adjacency is computed, so the adjacency view can never
//! drift from the link list. An expired link is logically absent: the sweeper
//! purges it at exactly its expiration instant.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::corpus::Corpus;
use super::persist::{KeyValueStore, LINKS_KEY};
use super::sweeper::Sweeper;
use crate::error::PipelineError;
use crate::notify::{Cue, Notifier};

/// When a travel link stops existing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Static world connection, never expires.
    Never,
    /// Discovered link, gone at this instant.
    At(DateTime<Utc>),
}

impl Expiration {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiration::Never => false,
            Expiration::At(t) => *t <= now,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiration::Never => None,
            Expiration::At(t) => Some(*t),
        }
    }
}

impl Serialize for Expiration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expiration::Never => serializer.serialize_str("never"),
            Expiration::At(t) => serializer.serialize_str(&t.to_rfc3339()),
        }
    }
}

impl<'de> Deserialize<'de> for Expiration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "never" {
            return Ok(Expiration::Never);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Expiration::At(t.with_timezone(&Utc)))
            .map_err(|e| D::Error::custom(format!("invalid expiration {:?}: {}", raw, e)))
    }
}

/// A directed, possibly time-limited connection between two locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub expiration: Expiration,
}

impl Link {
    pub fn discovered(
        source: impl Into<String>,
        target: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            expiration: Expiration::At(expiration),
        }
    }
}

/// Result of a shortest-path query. An empty route means source and target
/// are the same node; unreachable is a distinct outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PathResult {
    Route(Vec<Link>),
    Unreachable,
}

impl PathResult {
    pub fn is_reachable(&self) -> bool {
        matches!(self, PathResult::Route(_))
    }

    /// Earliest expiration along the route; None means the route never
    /// expires (or there is no route).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PathResult::Route(links) => links
                .iter()
                .filter_map(|l| l.expiration.timestamp())
                .min(),
            PathResult::Unreachable => None,
        }
    }
}

/// Aggregate outcome of one import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Payload decoded to an empty list.
    Empty,
    /// Every imported link had already expired.
    AllExpired,
    /// At least one link survived; duplicates are counted, not errors.
    Imported { added: usize, skipped: usize },
}

/// Owns the discovered-link set, the static topology, and the expiry sweeper.
pub struct LinkStore {
    corpus: Corpus,
    links: Arc<Mutex<Vec<Link>>>,
    persist: Option<Arc<dyn KeyValueStore>>,
    notifier: Arc<dyn Notifier>,
    sweeper: Sweeper,
}

impl LinkStore {
    /// Creates an empty store with no persistence.
    pub fn new(corpus: Corpus, notifier: Arc<dyn Notifier>) -> Self {
        Self::build(corpus, notifier, Vec::new(), None)
    }

    /// Re-derives all in-memory state from the key-value store; already
    /// expired records are dropped on the way in.
    pub fn with_persistence(
        corpus: Corpus,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let mut initial: Vec<Link> = match store.get(LINKS_KEY)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(links) => links,
                Err(e) => {
                    log::warn!("Discarding unreadable link store: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let now = Utc::now();
        initial.retain(|link| !link.expiration.is_expired_at(now));

        Ok(Self::build(corpus, notifier, initial, Some(store)))
    }

    fn build(
        corpus: Corpus,
        notifier: Arc<dyn Notifier>,
        initial: Vec<Link>,
        persist: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let deadline = next_deadline(&initial);
        let links = Arc::new(Mutex::new(initial));

        let sweeper_links = Arc::clone(&links);
        let sweeper_persist = persist.clone();
        let sweeper = Sweeper::spawn(move || {
            let mut links = sweeper_links.lock().expect("link store poisoned");
            let now = Utc::now();
            let before = links.len();
            links.retain(|link| !link.expiration.is_expired_at(now));
            if links.len() != before {
                log::debug!("Purged {} expired link(s)", before - links.len());
                save_links(&sweeper_persist, &links);
            }
            next_deadline(&links)
        });
        sweeper.arm(deadline);

        Self {
            corpus,
            links,
            persist,
            notifier,
            sweeper,
        }
    }

    /// Adds a discovered link. `notify` suppresses the per-link notification
    /// side effects during bulk import; errors are still returned.
    pub fn push(&self, link: Link, notify: bool) -> Result<(), PipelineError> {
        self.push_at(link, notify, Utc::now())
    }

    fn push_at(
        &self,
        link: Link,
        notify: bool,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        if link.expiration.is_expired_at(now) {
            let err = PipelineError::ExpiredLink {
                from: link.source,
                to: link.target,
            };
            if notify {
                self.notifier.notify(&err.to_string(), Cue::Error);
            }
            return Err(err);
        }

        if self
            .neighbors_at(&link.source, now)
            .iter()
            .any(|t| *t == link.target)
        {
            let err = PipelineError::DuplicateLink {
                from: link.source,
                to: link.target,
            };
            if notify {
                self.notifier.notify(&err.to_string(), Cue::Notification);
            }
            return Err(err);
        }

        if notify {
            self.notifier.notify(
                &format!("Added new link: {} > {}", link.source, link.target),
                Cue::Open,
            );
        }

        let mut links = self.links.lock().expect("link store poisoned");
        links.push(link);
        save_links(&self.persist, &links);
        let deadline = next_deadline(&links);
        drop(links);
        self.sweeper.arm(deadline);
        Ok(())
    }

    /// Unweighted breadth-first shortest path over static plus active
    /// discovered links (both directions). FIFO order breaks ties, so the
    /// result is *a* shortest path, not necessarily the unique one.
    pub fn find_shortest_path(&self, from: &str, to: &str) -> PathResult {
        self.find_shortest_path_at(from, to, Utc::now())
    }

    fn find_shortest_path_at(&self, from: &str, to: &str, now: DateTime<Utc>) -> PathResult {
        if from == to {
            return PathResult::Route(Vec::new());
        }

        let adjacency = self.adjacency_at(now);
        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            let Some(neighbors) = adjacency.get(node) else {
                continue;
            };
            for neighbor in neighbors {
                let neighbor = neighbor.as_str();
                if neighbor == to {
                    parent.insert(neighbor, node);
                    return PathResult::Route(self.assemble_route(&parent, from, to, now));
                }
                if visited.insert(neighbor) {
                    parent.insert(neighbor, node);
                    queue.push_back(neighbor);
                }
            }
        }

        PathResult::Unreachable
    }

    fn assemble_route(
        &self,
        parent: &HashMap<&str, &str>,
        from: &str,
        to: &str,
        now: DateTime<Utc>,
    ) -> Vec<Link> {
        let mut nodes = vec![to];
        while let Some(&prev) = parent.get(nodes.last().expect("non-empty")) {
            nodes.push(prev);
            if prev == from {
                break;
            }
        }
        nodes.reverse();

        let links = self.links.lock().expect("link store poisoned");
        nodes
            .windows(2)
            .map(|hop| {
                let (source, target) = (hop[0], hop[1]);
                // A discovered link in either direction carries the hop's
                // expiration; everything else is static.
                let expiration = links
                    .iter()
                    .filter(|l| !l.expiration.is_expired_at(now))
                    .find(|l| {
                        (l.source == source && l.target == target)
                            || (l.source == target && l.target == source)
                    })
                    .map(|l| l.expiration)
                    .unwrap_or(Expiration::Never);
                Link {
                    source: source.to_string(),
                    target: target.to_string(),
                    expiration,
                }
            })
            .collect()
    }

    /// Adjacency derived from scratch: static topology plus both directions
    /// of every active discovered link.
    fn adjacency_at(&self, now: DateTime<Utc>) -> HashMap<String, Vec<String>> {
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for (source, target) in self.corpus.static_pairs() {
            adjacency
                .entry(source.to_string())
                .or_default()
                .push(target.to_string());
        }

        let links = self.links.lock().expect("link store poisoned");
        for link in links.iter().filter(|l| !l.expiration.is_expired_at(now)) {
            adjacency
                .entry(link.source.clone())
                .or_default()
                .push(link.target.clone());
            adjacency
                .entry(link.target.clone())
                .or_default()
                .push(link.source.clone());
        }
        adjacency
    }

    fn neighbors_at(&self, source: &str, now: DateTime<Utc>) -> Vec<String> {
        let mut neighbors: Vec<String> = self.corpus.neighbors(source).to_vec();
        let links = self.links.lock().expect("link store poisoned");
        for link in links.iter().filter(|l| !l.expiration.is_expired_at(now)) {
            if link.source == source {
                neighbors.push(link.target.clone());
            } else if link.target == source {
                neighbors.push(link.source.clone());
            }
        }
        neighbors
    }

    /// Serializes the discovered-link set (not the static topology) into a
    /// transportable blob: base64 over a JSON array.
    pub fn export(&self) -> String {
        let links = self.links.lock().expect("link store poisoned");
        let json = serde_json::to_string(&*links).expect("links always serialize");
        BASE64.encode(json)
    }

    /// Decodes and imports a blob produced by [`export`](Self::export).
    /// Per-link duplicate/expired outcomes are silent; one aggregate outcome
    /// is reported.
    pub fn import(&self, blob: &str) -> Result<ImportOutcome, PipelineError> {
        self.import_at(blob, Utc::now())
    }

    fn import_at(&self, blob: &str, now: DateTime<Utc>) -> Result<ImportOutcome, PipelineError> {
        let decoded = BASE64
            .decode(blob.trim())
            .map_err(|e| PipelineError::InvalidImport(e.to_string()))?;
        let json = String::from_utf8(decoded)
            .map_err(|e| PipelineError::InvalidImport(e.to_string()))?;
        let links: Vec<Link> = serde_json::from_str(&json)
            .map_err(|e| PipelineError::InvalidImport(e.to_string()))?;

        if links.is_empty() {
            self.notifier
                .notify("Failed to import: data is empty", Cue::Notification);
            return Ok(ImportOutcome::Empty);
        }

        let alive: Vec<Link> = links
            .into_iter()
            .filter(|l| !l.expiration.is_expired_at(now))
            .collect();
        if alive.is_empty() {
            self.notifier
                .notify("Failed to import: data is expired", Cue::Notification);
            return Ok(ImportOutcome::AllExpired);
        }

        let mut added = 0;
        let mut skipped = 0;
        for link in alive {
            match self.push_at(link, false, now) {
                Ok(()) => added += 1,
                Err(_) => skipped += 1,
            }
        }

        self.notifier.notify("Successfully imported data", Cue::Open);
        Ok(ImportOutcome::Imported { added, skipped })
    }

    /// Clears all discovered links. The static topology is untouched.
    pub fn flush(&self) {
        let mut links = self.links.lock().expect("link store poisoned");
        links.clear();
        save_links(&self.persist, &links);
        drop(links);
        self.sweeper.arm(None);
    }

    /// Snapshot of the stored discovered links.
    pub fn discovered_links(&self) -> Vec<Link> {
        self.links.lock().expect("link store poisoned").clone()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Cancels the pending expiry timer and joins the sweeper thread.
    pub fn teardown(&mut self) {
        self.sweeper.teardown();
    }
}

fn next_deadline(links: &[Link]) -> Option<DateTime<Utc>> {
    links
        .iter()
        .filter_map(|l| l.expiration.timestamp())
        .min()
}

fn save_links(persist: &Option<Arc<dyn KeyValueStore>>, links: &[Link]) {
    let Some(store) = persist else { return };
    match serde_json::to_string(links) {
        Ok(json) => {
            if let Err(e) = store.set(LINKS_KEY, &json) {
                log::warn!("Failed to persist links: {}", e);
            }
        }
        Err(e) => log::warn!("Failed to serialize links: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::persist::testing::MemoryStore;
    use crate::notify::testing::RecordingNotifier;
    use chrono::Duration;

    fn corpus() -> Corpus {
        Corpus::from_json(
            r#"{
                "locations": [
                    {"id": "A", "display_name": "Alpha", "links": ["B"]},
                    {"id": "B", "display_name": "Beta", "links": ["A", "C"]},
                    {"id": "C", "display_name": "Gamma", "links": ["B"]},
                    {"id": "D", "display_name": "Delta"},
                    {"id": "E", "display_name": "Epsilon"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn store() -> LinkStore {
        LinkStore::new(corpus(), Arc::new(RecordingNotifier::default()))
    }

    fn hops(result: &PathResult) -> Vec<(String, String)> {
        match result {
            PathResult::Route(links) => links
                .iter()
                .map(|l| (l.source.clone(), l.target.clone()))
                .collect(),
            PathResult::Unreachable => panic!("expected a route"),
        }
    }

    #[test]
    fn test_same_node_is_empty_route() {
        let store = store();
        assert_eq!(
            store.find_shortest_path("A", "A"),
            PathResult::Route(Vec::new())
        );
    }

    #[test]
    fn test_static_path() {
        let store = store();
        let result = store.find_shortest_path("A", "C");
        assert_eq!(
            hops(&result),
            [("A".into(), "B".into()), ("B".into(), "C".into())]
        );
        // Static hops never expire.
        assert_eq!(result.expires_at(), None);
    }

    #[test]
    fn test_unreachable_is_distinct_from_same_node() {
        let store = store();
        assert_eq!(store.find_shortest_path("A", "D"), PathResult::Unreachable);
    }

    #[test]
    fn test_discovered_link_opens_path_until_expiry() {
        let store = store();
        let now = Utc::now();
        let expiration = now + Duration::milliseconds(60_000);
        store
            .push_at(Link::discovered("B", "D", expiration), true, now)
            .unwrap();

        let result = store.find_shortest_path_at("A", "D", now);
        assert_eq!(
            hops(&result),
            [("A".into(), "B".into()), ("B".into(), "D".into())]
        );
        assert_eq!(result.expires_at(), Some(expiration));

        // Simulated clock: one millisecond past expiration.
        let later = expiration + Duration::milliseconds(1);
        assert_eq!(
            store.find_shortest_path_at("A", "D", later),
            PathResult::Unreachable
        );
    }

    #[test]
    fn test_reverse_direction_is_derived() {
        let store = store();
        let now = Utc::now();
        let expiration = now + Duration::seconds(60);
        store
            .push_at(Link::discovered("D", "E", expiration), true, now)
            .unwrap();

        let result = store.find_shortest_path_at("E", "D", now);
        assert_eq!(hops(&result), [("E".into(), "D".into())]);
        // Only one record is actually stored.
        assert_eq!(store.discovered_links().len(), 1);
    }

    #[test]
    fn test_duplicate_push_rejected() {
        let store = store();
        let now = Utc::now();
        let expiration = now + Duration::seconds(60);

        store
            .push_at(Link::discovered("D", "E", expiration), true, now)
            .unwrap();
        let second = store.push_at(Link::discovered("D", "E", expiration), true, now);
        assert!(matches!(
            second,
            Err(PipelineError::DuplicateLink { .. })
        ));
        assert_eq!(store.discovered_links().len(), 1);
    }

    #[test]
    fn test_reverse_duplicate_rejected() {
        let store = store();
        let now = Utc::now();
        let expiration = now + Duration::seconds(60);

        store
            .push_at(Link::discovered("D", "E", expiration), true, now)
            .unwrap();
        let reverse = store.push_at(Link::discovered("E", "D", expiration), true, now);
        assert!(matches!(
            reverse,
            Err(PipelineError::DuplicateLink { .. })
        ));
    }

    #[test]
    fn test_static_duplicate_rejected() {
        let store = store();
        let now = Utc::now();
        let result = store.push_at(
            Link::discovered("A", "B", now + Duration::seconds(60)),
            true,
            now,
        );
        assert!(matches!(result, Err(PipelineError::DuplicateLink { .. })));
    }

    #[test]
    fn test_expired_push_rejected() {
        let store = store();
        let now = Utc::now();
        let result = store.push_at(
            Link::discovered("D", "E", now - Duration::seconds(1)),
            true,
            now,
        );
        assert!(matches!(result, Err(PipelineError::ExpiredLink { .. })));
        assert!(store.discovered_links().is_empty());
    }

    #[test]
    fn test_push_notifications() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = LinkStore::new(corpus(), notifier.clone());
        let now = Utc::now();
        let expiration = now + Duration::seconds(60);

        store
            .push_at(Link::discovered("D", "E", expiration), true, now)
            .unwrap();
        let _ = store.push_at(Link::discovered("D", "E", expiration), true, now);
        // Silent push: no notification even though it is a duplicate.
        let _ = store.push_at(Link::discovered("D", "E", expiration), false, now);

        let events = notifier.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1, Cue::Open);
        assert_eq!(events[1].1, Cue::Notification);
    }

    #[test]
    fn test_export_import_round_trip() {
        let store = store();
        let now = Utc::now();
        store
            .push_at(
                Link::discovered("D", "E", now + Duration::seconds(120)),
                true,
                now,
            )
            .unwrap();
        store
            .push_at(
                Link::discovered("B", "D", now + Duration::seconds(240)),
                true,
                now,
            )
            .unwrap();
        let blob = store.export();

        let other = LinkStore::new(corpus(), Arc::new(RecordingNotifier::default()));
        let outcome = other.import_at(&blob, now).unwrap();
        assert_eq!(outcome, ImportOutcome::Imported { added: 2, skipped: 0 });

        let mut original = store.discovered_links();
        let mut restored = other.discovered_links();
        original.sort_by(|a, b| a.source.cmp(&b.source));
        restored.sort_by(|a, b| a.source.cmp(&b.source));
        assert_eq!(original, restored);
    }

    #[test]
    fn test_import_skips_duplicates_silently() {
        let store = store();
        let now = Utc::now();
        store
            .push_at(
                Link::discovered("D", "E", now + Duration::seconds(120)),
                true,
                now,
            )
            .unwrap();
        let blob = store.export();

        let outcome = store.import_at(&blob, now).unwrap();
        assert_eq!(outcome, ImportOutcome::Imported { added: 0, skipped: 1 });
        assert_eq!(store.discovered_links().len(), 1);
    }

    #[test]
    fn test_import_empty_payload() {
        let store = store();
        let blob = BASE64.encode("[]");
        assert_eq!(store.import(&blob).unwrap(), ImportOutcome::Empty);
    }

    #[test]
    fn test_import_all_expired() {
        let store = store();
        let now = Utc::now();
        let json = serde_json::to_string(&[Link::discovered(
            "D",
            "E",
            now - Duration::seconds(10),
        )])
        .unwrap();
        let outcome = store.import_at(&BASE64.encode(json), now).unwrap();
        assert_eq!(outcome, ImportOutcome::AllExpired);
        assert!(store.discovered_links().is_empty());
    }

    #[test]
    fn test_import_rejects_bad_payloads() {
        let store = store();
        assert!(matches!(
            store.import("not base64!!!"),
            Err(PipelineError::InvalidImport(_))
        ));
        assert!(matches!(
            store.import(&BASE64.encode("{\"not\": \"an array\"}")),
            Err(PipelineError::InvalidImport(_))
        ));
        assert!(matches!(
            store.import(&BASE64.encode("[{\"source\": \"A\"}]")),
            Err(PipelineError::InvalidImport(_))
        ));
    }

    #[test]
    fn test_flush_clears_discovered_only() {
        let store = store();
        let now = Utc::now();
        store
            .push_at(
                Link::discovered("B", "D", now + Duration::seconds(60)),
                true,
                now,
            )
            .unwrap();
        store.flush();
        assert!(store.discovered_links().is_empty());
        // Static topology still routes.
        assert!(store.find_shortest_path("A", "C").is_reachable());
    }

    #[test]
    fn test_persistence_round_trip() {
        let kv: Arc<MemoryStore> = Arc::new(MemoryStore::default());
        let now = Utc::now();
        {
            let store = LinkStore::with_persistence(
                corpus(),
                Arc::new(RecordingNotifier::default()),
                kv.clone(),
            )
            .unwrap();
            store
                .push_at(
                    Link::discovered("D", "E", now + Duration::seconds(3600)),
                    true,
                    now,
                )
                .unwrap();
        }

        let restored = LinkStore::with_persistence(
            corpus(),
            Arc::new(RecordingNotifier::default()),
            kv,
        )
        .unwrap();
        let links = restored.discovered_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, "D");
    }

    #[test]
    fn test_sweeper_purges_expired_links() {
        let store = store();
        let now = Utc::now();
        store
            .push_at(
                Link::discovered("D", "E", now + Duration::milliseconds(40)),
                true,
                now,
            )
            .unwrap();
        assert_eq!(store.discovered_links().len(), 1);

        std::thread::sleep(std::time::Duration::from_millis(400));
        assert!(store.discovered_links().is_empty());
    }

    #[test]
    fn test_expiration_serde_format() {
        let json = serde_json::to_string(&Expiration::Never).unwrap();
        assert_eq!(json, "\"never\"");

        let t = Utc::now() + Duration::seconds(60);
        let round: Expiration =
            serde_json::from_str(&serde_json::to_string(&Expiration::At(t)).unwrap()).unwrap();
        assert_eq!(round, Expiration::At(t));
    }
}
