use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32String};
use tracing::debug;

use crate::domain::models::CanonicalRecord;

/// A records snapshot. Its pointer identity is the cache key.
pub type Snapshot = Arc<[CanonicalRecord]>;

/// Searchable haystacks over one snapshot, in snapshot order.
pub struct FuzzyIndex {
    haystacks: Vec<Utf32String>,
}

impl FuzzyIndex {
    pub fn build(records: &[CanonicalRecord]) -> Self {
        Self {
            haystacks: records
                .iter()
                .map(|record| Utf32String::from(record.search.as_str()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.haystacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.haystacks.is_empty()
    }

    /// Indices of matching records, best score first; equal scores keep snapshot order.
    ///
    /// Every whitespace-separated word must fuzzy-match. The text is taken
    /// literally: `!`, `^`, `'` and `$` are plain characters, not operators.
    pub fn find(&self, text: &str) -> Vec<usize> {
        let mut matcher = Matcher::new(Config::DEFAULT);
        let pattern = Pattern::new(
            text,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );

        let mut scored: Vec<(u32, usize)> = self
            .haystacks
            .iter()
            .enumerate()
            .filter_map(|(idx, haystack)| {
                pattern
                    .score(haystack.slice(..), &mut matcher)
                    .map(|score| (score, idx))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, idx)| idx).collect()
    }
}

/// Result of one search: matching names and their rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    ranked: Vec<String>,
    rank_by_name: HashMap<String, usize>,
}

impl SearchHits {
    fn from_ranked(ranked: Vec<String>) -> Self {
        let rank_by_name = ranked
            .iter()
            .enumerate()
            .map(|(rank, name)| (name.clone(), rank))
            .collect();
        Self {
            ranked,
            rank_by_name,
        }
    }

    pub fn contains(&self, software_name: &str) -> bool {
        self.rank_by_name.contains_key(software_name)
    }

    pub fn rank(&self, software_name: &str) -> Option<usize> {
        self.rank_by_name.get(software_name).copied()
    }

    pub fn ranked(&self) -> &[String] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub index_builds: usize,
    pub query_runs: usize,
}

#[derive(Default)]
struct Slots {
    index: Option<(Snapshot, Arc<FuzzyIndex>)>,
    query: Option<(Snapshot, String, Arc<SearchHits>)>,
    stats: CacheStats,
}

/// Single-slot memoization of the fuzzy index and of the last query.
///
/// Only the most recent snapshot is indexed and only the most recent
/// (snapshot, text) pair is remembered; anything else rebuilds.
#[derive(Default)]
pub struct FuzzyIndexCache {
    slots: Mutex<Slots>,
}

impl FuzzyIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_index(&self, records: &Snapshot) -> Arc<FuzzyIndex> {
        let mut slots = self.lock();
        Self::index_in(&mut slots, records)
    }

    pub fn query(&self, records: &Snapshot, text: &str) -> Arc<SearchHits> {
        let mut slots = self.lock();

        if let Some((cached_records, cached_text, hits)) = &slots.query {
            if Arc::ptr_eq(cached_records, records) && cached_text == text {
                return Arc::clone(hits);
            }
        }

        let index = Self::index_in(&mut slots, records);
        let ranked = index
            .find(text)
            .into_iter()
            .map(|idx| records[idx].software_name.clone())
            .collect();
        let hits = Arc::new(SearchHits::from_ranked(ranked));

        slots.stats.query_runs += 1;
        slots.query = Some((Arc::clone(records), text.to_string(), Arc::clone(&hits)));
        hits
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn index_in(slots: &mut Slots, records: &Snapshot) -> Arc<FuzzyIndex> {
        if let Some((cached_records, index)) = &slots.index {
            if Arc::ptr_eq(cached_records, records) {
                return Arc::clone(index);
            }
        }

        let index = Arc::new(FuzzyIndex::build(records));
        debug!(records = index.len(), "rebuilt fuzzy index");
        slots.stats.index_builds += 1;
        slots.index = Some((Arc::clone(records), Arc::clone(&index)));
        index
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // The slots are always left consistent, so a poisoned lock is still usable.
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Prerogatives, SoftwareType};

    fn record(name: &str, search: &str) -> CanonicalRecord {
        CanonicalRecord {
            software_name: name.to_string(),
            logo_url: None,
            software_description: String::new(),
            latest_version: None,
            added_time: 0,
            update_time: 0,
            referent_count: 0,
            user_count: 0,
            organizations: Default::default(),
            categories: Vec::new(),
            parent_software: None,
            software_type: SoftwareType::Stack,
            prerogatives: Prerogatives::default(),
            test_url: None,
            search: search.to_string(),
        }
    }

    fn snapshot() -> Snapshot {
        vec![
            record("LibreOffice", "libreoffice office suite"),
            record("GIMP", "gimp image editor"),
            record("Inkscape", "inkscape vector image editor"),
        ]
        .into()
    }

    #[test]
    fn repeated_query_hits_cache() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();

        let first = cache.query(&records, "image");
        let second = cache.query(&records, "image");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                index_builds: 1,
                query_runs: 1
            }
        );
    }

    #[test]
    fn new_text_reuses_index_but_reruns_query() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();

        cache.query(&records, "image");
        let hits = cache.query(&records, "office");

        assert!(hits.contains("LibreOffice"));
        assert!(!hits.contains("GIMP"));
        assert_eq!(cache.stats().index_builds, 1);
        assert_eq!(cache.stats().query_runs, 2);
    }

    #[test]
    fn equal_but_distinct_snapshot_rebuilds() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();
        let copy: Snapshot = records.to_vec().into();

        cache.query(&records, "image");
        cache.query(&copy, "image");

        assert_eq!(cache.stats().index_builds, 2);
        assert_eq!(cache.stats().query_runs, 2);
    }

    #[test]
    fn index_is_shared_until_snapshot_changes() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();

        let first = cache.get_index(&records);
        let second = cache.get_index(&records);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);
        assert_eq!(cache.stats().index_builds, 1);

        let other: Snapshot = records[..1].to_vec().into();
        let rebuilt = cache.get_index(&other);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(cache.stats().index_builds, 2);
        assert_eq!(cache.stats().query_runs, 0);
    }

    #[test]
    fn query_operators_are_matched_literally() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();

        let negated = cache.query(&records, "!gimp");
        assert!(!negated.contains("LibreOffice"));
        assert!(!negated.contains("Inkscape"));
        assert!(negated.is_empty());

        assert!(cache.query(&records, "suite$").is_empty());
        assert!(cache.query(&records, "office").contains("LibreOffice"));
    }

    #[test]
    fn every_word_must_match() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();

        let hits = cache.query(&records, "image vector");
        assert_eq!(hits.ranked(), ["Inkscape".to_string()]);
    }

    #[test]
    fn ranks_matches_and_skips_misses() {
        let cache = FuzzyIndexCache::new();
        let records = snapshot();

        let hits = cache.query(&records, "editor");
        assert_eq!(hits.len(), 2);
        assert!(hits.rank("GIMP").is_some());
        assert!(hits.rank("Inkscape").is_some());
        assert_eq!(hits.rank("LibreOffice"), None);
    }
}
