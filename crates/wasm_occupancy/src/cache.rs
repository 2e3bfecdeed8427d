//! Decoded scenes keyed by source URL.
//!
//! A viewer session revisits the same few scenes, so decoded volumes are
//! kept behind `Rc` and handed out without re-decoding. The cache is
//! unbounded unless an entry limit is set; past the limit the least
//! recently used scene is dropped.

use std::collections::HashMap;
use std::rc::Rc;

use occupancy::{decode_json, DecodedScene};

struct CachedScene {
    scene: Rc<DecodedScene>,
    last_access: u64,
}

/// URL-keyed store of decoded scenes with optional LRU eviction.
///
/// Access times come from a monotonic counter; each [`get`](SceneCache::get)
/// or [`insert`](SceneCache::insert) bumps it.
pub struct SceneCache {
    entries: HashMap<String, CachedScene>,
    max_entries: Option<usize>,
    current_time: u64,
}

impl SceneCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: None,
            current_time: 0,
        }
    }

    /// Create a cache holding at most `max_entries` scenes (at least one).
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ..Self::new()
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Look up a scene and mark it as recently used.
    pub fn get(&mut self, url: &str) -> Option<Rc<DecodedScene>> {
        self.current_time += 1;
        let now = self.current_time;
        self.entries.get_mut(url).map(|entry| {
            entry.last_access = now;
            Rc::clone(&entry.scene)
        })
    }

    /// Check for a scene without touching its access time.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Store a decoded scene, replacing any previous entry for `url`.
    ///
    /// Returns the shared handle and the URLs evicted to stay in budget.
    pub fn insert(
        &mut self,
        url: impl Into<String>,
        scene: DecodedScene,
    ) -> (Rc<DecodedScene>, Vec<String>) {
        let url = url.into();
        let scene = Rc::new(scene);
        self.current_time += 1;
        self.entries.insert(
            url.clone(),
            CachedScene {
                scene: Rc::clone(&scene),
                last_access: self.current_time,
            },
        );
        let evicted = self.evict_over_budget(&url);
        (scene, evicted)
    }

    /// Return the cached scene for `url`, decoding and storing it on a miss.
    ///
    /// Decode errors are returned and nothing is cached.
    pub fn get_or_decode(
        &mut self,
        url: &str,
        metadata_json: &str,
        bytes: &[u8],
    ) -> occupancy::Result<Rc<DecodedScene>> {
        if let Some(scene) = self.get(url) {
            return Ok(scene);
        }
        let scene = decode_json(metadata_json, bytes)?;
        let (scene, evicted) = self.insert(url, scene);
        for old in evicted {
            crate::log(&format!("evicted scene {old}"));
        }
        Ok(scene)
    }

    pub fn remove(&mut self, url: &str) -> Option<Rc<DecodedScene>> {
        self.entries.remove(url).map(|entry| entry.scene)
    }

    /// URLs ordered from least to most recently used.
    pub fn urls_lru_sorted(&self) -> Vec<String> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.last_access))
            .collect();
        entries.sort_by_key(|&(_, time)| time);
        entries.into_iter().map(|(url, _)| url).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_time = 0;
    }

    fn evict_over_budget(&mut self, keep: &str) -> Vec<String> {
        let Some(limit) = self.max_entries else {
            return Vec::new();
        };
        let mut evicted = Vec::new();
        if self.entries.len() <= limit {
            return evicted;
        }
        for url in self.urls_lru_sorted() {
            if self.entries.len() <= limit {
                break;
            }
            if url == keep {
                continue;
            }
            self.entries.remove(&url);
            evicted.push(url);
        }
        evicted
    }
}

impl Default for SceneCache {
    fn default() -> Self {
        Self::new()
    }
}
