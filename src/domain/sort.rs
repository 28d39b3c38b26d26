use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domain::models::CanonicalRecord;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SortMode {
    #[serde(rename = "added_time")]
    AddedTime,
    #[serde(rename = "update_time")]
    UpdateTime,
    #[serde(rename = "latest_version_publication_date")]
    LatestVersionPublicationDate,
    #[serde(rename = "user_count")]
    UserCount,
    #[default]
    #[serde(rename = "referent_count")]
    ReferentCount,
    #[serde(rename = "user_count_ASC")]
    UserCountAsc,
    #[serde(rename = "referent_count_ASC")]
    ReferentCountAsc,
    #[serde(rename = "best_match")]
    BestMatch,
}

impl SortMode {
    /// Weighted modes in the order they are offered to users.
    pub const WEIGHTED: [SortMode; 7] = [
        Self::ReferentCount,
        Self::UserCount,
        Self::AddedTime,
        Self::UpdateTime,
        Self::LatestVersionPublicationDate,
        Self::UserCountAsc,
        Self::ReferentCountAsc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddedTime => "added_time",
            Self::UpdateTime => "update_time",
            Self::LatestVersionPublicationDate => "latest_version_publication_date",
            Self::UserCount => "user_count",
            Self::ReferentCount => "referent_count",
            Self::UserCountAsc => "user_count_ASC",
            Self::ReferentCountAsc => "referent_count_ASC",
            Self::BestMatch => "best_match",
        }
    }

    /// `None` for best match, which follows search rank instead of a weight.
    pub fn comparator(self) -> Option<WeightedComparator> {
        let comparator = match self {
            Self::AddedTime => WeightedComparator::new(added_time, Order::Descending),
            Self::UpdateTime => WeightedComparator::new(update_time, Order::Descending),
            Self::LatestVersionPublicationDate => {
                WeightedComparator::new(publication_time, Order::Descending)
                    .tie_breaker(WeightedComparator::new(update_time, Order::Descending))
            }
            Self::UserCount => WeightedComparator::new(user_count, Order::Descending),
            Self::ReferentCount => WeightedComparator::new(referent_count, Order::Descending),
            Self::UserCountAsc => WeightedComparator::new(user_count, Order::Ascending),
            Self::ReferentCountAsc => WeightedComparator::new(referent_count, Order::Ascending),
            Self::BestMatch => return None,
        };
        Some(comparator)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        Self::WEIGHTED
            .into_iter()
            .chain([Self::BestMatch])
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                anyhow!(
                    "invalid sort '{value}' (expected referent_count, user_count, added_time, \
                     update_time, latest_version_publication_date, user_count_ASC, \
                     referent_count_ASC, best_match)"
                )
            })
    }
}

fn added_time(record: &CanonicalRecord) -> u64 {
    record.added_time
}

fn update_time(record: &CanonicalRecord) -> u64 {
    record.update_time
}

fn publication_time(record: &CanonicalRecord) -> u64 {
    record
        .latest_version
        .as_ref()
        .map_or(0, |version| version.publication_time)
}

fn user_count(record: &CanonicalRecord) -> u64 {
    record.user_count
}

fn referent_count(record: &CanonicalRecord) -> u64 {
    record.referent_count
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Compares records on a numeric weight, falling back to an optional tie-breaker.
#[derive(Debug, Clone)]
pub struct WeightedComparator {
    weight: fn(&CanonicalRecord) -> u64,
    order: Order,
    tie_breaker: Option<Box<WeightedComparator>>,
}

impl WeightedComparator {
    pub fn new(weight: fn(&CanonicalRecord) -> u64, order: Order) -> Self {
        Self {
            weight,
            order,
            tie_breaker: None,
        }
    }

    pub fn tie_breaker(mut self, tie_breaker: WeightedComparator) -> Self {
        self.tie_breaker = Some(Box::new(tie_breaker));
        self
    }

    pub fn compare(&self, a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
        let (wa, wb) = ((self.weight)(a), (self.weight)(b));
        let primary = match self.order {
            Order::Ascending => wa.cmp(&wb),
            Order::Descending => wb.cmp(&wa),
        };
        match (&self.tie_breaker, primary) {
            (Some(tie_breaker), Ordering::Equal) => tie_breaker.compare(a, b),
            _ => primary,
        }
    }

    /// Stable: records that compare equal keep their relative order.
    pub fn sort(&self, records: &mut [&CanonicalRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}
