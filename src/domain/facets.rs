//! Filtering, sorting and leave-one-out facet counts over a snapshot.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::filters::FilterState;
use crate::domain::fuzzy::{FuzzyIndexCache, SearchHits, Snapshot};
use crate::domain::models::{CanonicalRecord, Environment, Prerogative, PresentationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    Organization,
    Category,
    Environment,
    Prerogative,
}

impl FacetKind {
    pub const ALL: [FacetKind; 4] = [
        Self::Organization,
        Self::Category,
        Self::Environment,
        Self::Prerogative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Category => "category",
            Self::Environment => "environment",
            Self::Prerogative => "prerogative",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FacetOption<V> {
    pub value: V,
    pub software_count: usize,
}

/// Runs queries against one snapshot, sharing the fuzzy cache.
pub struct FacetEngine<'a> {
    records: &'a Snapshot,
    cache: &'a FuzzyIndexCache,
}

impl<'a> FacetEngine<'a> {
    pub fn new(records: &'a Snapshot, cache: &'a FuzzyIndexCache) -> Self {
        Self { records, cache }
    }

    /// Filtered and sorted results, projected for presentation.
    pub fn compute_view(&self, filters: &FilterState) -> Vec<PresentationRecord> {
        let hits = self.search_hits(filters);
        let mut matching = self.apply_filters(filters, hits.as_deref(), None);

        match filters.sort.comparator() {
            Some(comparator) => comparator.sort(&mut matching),
            None => {
                // Best match without search text has no ranking; snapshot order stands.
                if let Some(hits) = &hits {
                    matching.sort_by_key(|record| hits.rank(&record.software_name));
                }
            }
        }

        matching
            .into_iter()
            .map(CanonicalRecord::to_presentation)
            .collect()
    }

    pub fn organization_options(&self, filters: &FilterState) -> Vec<FacetOption<String>> {
        let seed = self
            .records
            .iter()
            .flat_map(|record| record.organizations.iter().cloned());
        self.tally(filters, FacetKind::Organization, seed, |record| {
            record.organizations.iter().cloned().collect()
        })
    }

    pub fn category_options(&self, filters: &FilterState) -> Vec<FacetOption<String>> {
        let seed = self
            .records
            .iter()
            .flat_map(|record| record.categories.iter().cloned());
        self.tally(filters, FacetKind::Category, seed, |record| {
            record.categories.clone()
        })
    }

    pub fn environment_options(&self, filters: &FilterState) -> Vec<FacetOption<Environment>> {
        let seed = self.records.iter().flat_map(CanonicalRecord::environments);
        self.tally(
            filters,
            FacetKind::Environment,
            seed,
            CanonicalRecord::environments,
        )
    }

    /// Derived prerogatives are always offered, intrinsic ones only once seen.
    pub fn prerogative_options(&self, filters: &FilterState) -> Vec<FacetOption<Prerogative>> {
        let seed = self
            .records
            .iter()
            .flat_map(|record| record.prerogatives.active())
            .chain(
                Prerogative::ALL
                    .into_iter()
                    .filter(|prerogative| prerogative.is_derived()),
            );
        self.tally(filters, FacetKind::Prerogative, seed, |record| {
            let merged = record.merged_prerogatives();
            Prerogative::ALL
                .into_iter()
                .filter(|prerogative| merged.get(*prerogative))
                .collect()
        })
    }

    fn search_hits(&self, filters: &FilterState) -> Option<Arc<SearchHits>> {
        if filters.is_searching() {
            Some(self.cache.query(self.records, &filters.search))
        } else {
            None
        }
    }

    /// Applies every active filter in snapshot order, skipping `excluded`.
    fn apply_filters(
        &self,
        filters: &FilterState,
        hits: Option<&SearchHits>,
        excluded: Option<FacetKind>,
    ) -> Vec<&'a CanonicalRecord> {
        let skip = |kind: FacetKind| excluded == Some(kind);

        self.records
            .iter()
            .filter(|record| hits.map_or(true, |hits| hits.contains(&record.software_name)))
            .filter(|record| {
                skip(FacetKind::Organization)
                    || filters
                        .organization
                        .as_ref()
                        .map_or(true, |org| record.organizations.contains(org))
            })
            .filter(|record| {
                skip(FacetKind::Category)
                    || filters
                        .category
                        .as_ref()
                        .map_or(true, |category| record.categories.contains(category))
            })
            .filter(|record| {
                skip(FacetKind::Environment)
                    || filters
                        .environment
                        .map_or(true, |env| record.software_type.runs_on(env))
            })
            .filter(|record| {
                if skip(FacetKind::Prerogative) || filters.prerogatives.is_empty() {
                    return true;
                }
                let merged = record.merged_prerogatives();
                filters
                    .prerogatives
                    .iter()
                    .all(|prerogative| merged.get(*prerogative))
            })
            .collect()
    }

    fn tally<V, S, F>(
        &self,
        filters: &FilterState,
        kind: FacetKind,
        seed: S,
        values_of: F,
    ) -> Vec<FacetOption<V>>
    where
        V: Clone + Eq + Hash,
        S: IntoIterator<Item = V>,
        F: Fn(&CanonicalRecord) -> Vec<V>,
    {
        let mut options: Vec<FacetOption<V>> = Vec::new();
        let mut position: HashMap<V, usize> = HashMap::new();
        for value in seed {
            if !position.contains_key(&value) {
                position.insert(value.clone(), options.len());
                options.push(FacetOption {
                    value,
                    software_count: 0,
                });
            }
        }

        let hits = self.search_hits(filters);
        for record in self.apply_filters(filters, hits.as_deref(), Some(kind)) {
            let mut counted = HashSet::new();
            for value in values_of(record) {
                if let Some(&idx) = position.get(&value) {
                    if counted.insert(idx) {
                        options[idx].software_count += 1;
                    }
                }
            }
        }

        options.sort_by(|a, b| b.software_count.cmp(&a.software_count));
        options
    }
}

