use std::collections::BTreeSet;

use anyhow::{anyhow, Result};

use crate::domain::models::{Environment, Prerogative};
use crate::domain::sort::SortMode;

/// Which filter a facet corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Search,
    Sort,
    Organization,
    Category,
    Environment,
    Prerogatives,
}

impl FilterKey {
    pub fn parse(key: &str) -> Result<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "sort" => Ok(Self::Sort),
            "organization" => Ok(Self::Organization),
            "category" => Ok(Self::Category),
            "environment" => Ok(Self::Environment),
            "prerogative" | "prerogatives" => Ok(Self::Prerogatives),
            _ => Err(anyhow!("unknown filter key: {key}")),
        }
    }
}

/// One mutation of the filter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Search(String),
    Sort(SortMode),
    Organization(Option<String>),
    Category(Option<String>),
    Environment(Option<Environment>),
    Prerogatives(BTreeSet<Prerogative>),
}

impl FilterUpdate {
    pub fn key(&self) -> FilterKey {
        match self {
            Self::Search(_) => FilterKey::Search,
            Self::Sort(_) => FilterKey::Sort,
            Self::Organization(_) => FilterKey::Organization,
            Self::Category(_) => FilterKey::Category,
            Self::Environment(_) => FilterKey::Environment,
            Self::Prerogatives(_) => FilterKey::Prerogatives,
        }
    }

    /// Parses `key=value`. An empty value clears an optional filter.
    pub fn parse(arg: &str) -> Result<Self> {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid filter syntax: {arg} (expected key=value)"))?;
        let value = value.trim();

        let update = match FilterKey::parse(key)? {
            FilterKey::Search => Self::Search(value.to_string()),
            FilterKey::Sort => Self::Sort(value.parse()?),
            FilterKey::Organization => Self::Organization(non_empty(value)),
            FilterKey::Category => Self::Category(non_empty(value)),
            FilterKey::Environment => Self::Environment(match non_empty(value) {
                Some(env) => Some(env.parse()?),
                None => None,
            }),
            FilterKey::Prerogatives => Self::Prerogatives(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::parse::<Prerogative>)
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(update)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Emitted when the state machine switches sort mode on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSwitch {
    pub sort: SortMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub sort: SortMode,
    pub organization: Option<String>,
    pub category: Option<String>,
    pub environment: Option<Environment>,
    pub prerogatives: BTreeSet<Prerogative>,
    pub sort_backup: SortMode,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(SortMode::default())
    }
}

impl FilterState {
    pub fn new(sort: SortMode) -> Self {
        Self {
            search: String::new(),
            sort,
            organization: None,
            category: None,
            environment: None,
            prerogatives: BTreeSet::new(),
            sort_backup: sort,
        }
    }

    pub fn is_searching(&self) -> bool {
        !self.search.is_empty()
    }

    /// Applies one update. Starting a search switches to best match and backs up
    /// the previous sort; clearing it restores the backup.
    pub fn update(&mut self, update: FilterUpdate) -> Option<SortSwitch> {
        match update {
            FilterUpdate::Search(search) => {
                let mut switch = None;
                if self.search.is_empty() && !search.is_empty() {
                    if self.sort != SortMode::BestMatch {
                        self.sort_backup = self.sort;
                        self.sort = SortMode::BestMatch;
                        switch = Some(SortSwitch { sort: self.sort });
                    }
                } else if !self.search.is_empty() && search.is_empty() {
                    if self.sort != self.sort_backup {
                        switch = Some(SortSwitch {
                            sort: self.sort_backup,
                        });
                    }
                    self.sort = self.sort_backup;
                }
                self.search = search;
                switch
            }
            FilterUpdate::Sort(sort) => {
                self.sort = sort;
                None
            }
            FilterUpdate::Organization(organization) => {
                self.organization = organization;
                None
            }
            FilterUpdate::Category(category) => {
                self.category = category;
                None
            }
            FilterUpdate::Environment(environment) => {
                self.environment = environment;
                None
            }
            FilterUpdate::Prerogatives(prerogatives) => {
                self.prerogatives = prerogatives;
                None
            }
        }
    }

    /// Clears the facet filters; search and sort are kept.
    pub fn reset(&mut self) {
        self.organization = None;
        self.category = None;
        self.environment = None;
        self.prerogatives.clear();
    }

    /// Sort modes a user may pick right now.
    pub fn sort_options(&self) -> Vec<SortMode> {
        let mut sorts = Vec::with_capacity(SortMode::WEIGHTED.len() + 1);
        if self.is_searching() || self.sort == SortMode::BestMatch {
            sorts.push(SortMode::BestMatch);
        }
        sorts.extend(SortMode::WEIGHTED);
        sorts
    }
}
