//! The closed location corpus.
//!
//! Loaded once at startup from world data: every known zone and connecting
//! road, its display name, and its static exits. Each hub city additionally
//! gets a bidirectional shortcut to its own portal pseudo-node.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CorpusFile {
    locations: Vec<CorpusLocation>,
    /// Hub cities that get a `<HUB>_PORTAL` shortcut node.
    #[serde(default)]
    hubs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CorpusLocation {
    id: String,
    display_name: String,
    #[serde(default)]
    links: Vec<String>,
}

/// Static world topology: location ids, display names, and fixed connections.
#[derive(Debug, Default)]
pub struct Corpus {
    display_names: HashMap<String, String>,
    /// Insertion-ordered ids, so matching and iteration are deterministic.
    ids: Vec<String>,
    links: HashMap<String, Vec<String>>,
}

impl Corpus {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CorpusFile =
            serde_json::from_str(json).context("Failed to parse corpus JSON")?;

        let mut corpus = Corpus::default();
        for location in file.locations {
            corpus.ids.push(location.id.clone());
            corpus
                .display_names
                .insert(location.id.clone(), location.display_name);
            corpus.links.insert(location.id, location.links);
        }

        for hub in &file.hubs {
            let portal = format!("{}_PORTAL", hub);
            let portal_display =
                format!("{} Portal", corpus.display_name(hub).unwrap_or(hub));
            corpus.ids.push(portal.clone());
            corpus.display_names.insert(portal.clone(), portal_display);
            corpus.links.entry(hub.clone()).or_default().push(portal.clone());
            corpus.links.entry(portal).or_default().push(hub.clone());
        }

        Ok(corpus)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
        Self::from_json(&contents)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.display_names.contains_key(id)
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.display_names.get(id).map(String::as_str)
    }

    /// Static neighbors of a location (never-expiring connections).
    pub fn neighbors(&self, id: &str) -> &[String] {
        self.links.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All static (source, target) pairs, in corpus order.
    pub fn static_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids.iter().flat_map(move |id| {
            self.neighbors(id)
                .iter()
                .map(move |target| (id.as_str(), target.as_str()))
        })
    }
}
