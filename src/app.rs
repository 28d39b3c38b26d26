use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use tracing::{debug, info};

use crate::domain::facets::{FacetEngine, FacetOption};
use crate::domain::filters::{FilterState, FilterUpdate};
use crate::domain::fuzzy::{CacheStats, FuzzyIndexCache, Snapshot};
use crate::domain::models::{Environment, Prerogative, PresentationRecord};
use crate::domain::normalize::normalize;
use crate::domain::sort::SortMode;
use crate::integrations::software_provider::{
    FileSoftwareProvider, HttpSoftwareProvider, SoftwareProvider,
};
use crate::storage::config::RuntimeConfig;
use crate::ui::render;

/// Notifications the catalog pushes to its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEvent {
    SortChanged { sort: SortMode },
}

/// Submissions made elsewhere in the system that invalidate the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalEvent {
    SoftwareFormSubmitted,
    DeclarationFormSubmitted,
}

struct Loaded {
    records: Snapshot,
    filters: FilterState,
}

/// Holds the current snapshot and filter state and answers view queries.
pub struct SoftwareCatalog {
    provider: Box<dyn SoftwareProvider>,
    default_sort: SortMode,
    loaded: Option<Loaded>,
    cache: FuzzyIndexCache,
    subscribers: Vec<Sender<CatalogEvent>>,
}

impl SoftwareCatalog {
    pub fn new(provider: Box<dyn SoftwareProvider>) -> Self {
        Self::new_with_default_sort(provider, SortMode::default())
    }

    pub fn new_with_default_sort(provider: Box<dyn SoftwareProvider>, default_sort: SortMode) -> Self {
        Self {
            provider,
            default_sort,
            loaded: None,
            cache: FuzzyIndexCache::new(),
            subscribers: Vec::new(),
        }
    }

    /// Fetches and normalizes a fresh snapshot. On failure the previous
    /// snapshot, if any, is kept.
    pub fn initialize(&mut self) -> Result<()> {
        let raw = self
            .provider
            .fetch_catalog()
            .context("fetch software catalog")?;
        let records: Snapshot = normalize(&raw)
            .context("normalize software catalog")?
            .into();

        info!(softwares = records.len(), "software catalog initialized");
        self.loaded = Some(Loaded {
            records,
            filters: FilterState::new(self.default_sort),
        });
        Ok(())
    }

    pub fn handle_external_event(&mut self, event: ExternalEvent) -> Result<()> {
        debug!(?event, "refreshing catalog after external submission");
        self.initialize()
            .with_context(|| format!("refresh catalog after {event:?}"))
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn subscribe(&mut self) -> Receiver<CatalogEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn update_filter(&mut self, update: FilterUpdate) -> Result<()> {
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| anyhow!("software catalog is not initialized"))?;

        debug!(key = ?update.key(), "filter updated");
        if let Some(switch) = loaded.filters.update(update) {
            debug!(sort = %switch.sort, "sort switched automatically");
            self.emit(CatalogEvent::SortChanged { sort: switch.sort });
        }
        Ok(())
    }

    pub fn reset_filters(&mut self) -> Result<()> {
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| anyhow!("software catalog is not initialized"))?;
        loaded.filters.reset();
        Ok(())
    }

    pub fn filter_state(&self) -> Option<&FilterState> {
        self.loaded.as_ref().map(|loaded| &loaded.filters)
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.loaded.as_ref().map(|loaded| Arc::clone(&loaded.records))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn current_results(&self) -> Vec<PresentationRecord> {
        self.with_engine(|engine, filters| engine.compute_view(filters))
    }

    pub fn sort_options(&self) -> Vec<SortMode> {
        match &self.loaded {
            Some(loaded) => loaded.filters.sort_options(),
            None => FilterState::new(self.default_sort).sort_options(),
        }
    }

    pub fn organization_options(&self) -> Vec<FacetOption<String>> {
        self.with_engine(|engine, filters| engine.organization_options(filters))
    }

    pub fn category_options(&self) -> Vec<FacetOption<String>> {
        self.with_engine(|engine, filters| engine.category_options(filters))
    }

    pub fn environment_options(&self) -> Vec<FacetOption<Environment>> {
        self.with_engine(|engine, filters| engine.environment_options(filters))
    }

    pub fn prerogative_options(&self) -> Vec<FacetOption<Prerogative>> {
        self.with_engine(|engine, filters| engine.prerogative_options(filters))
    }

    pub fn software(&self, software_name: &str) -> Option<PresentationRecord> {
        self.loaded.as_ref()?.records.iter().find_map(|record| {
            (record.software_name == software_name).then(|| record.to_presentation())
        })
    }

    fn with_engine<T: Default>(&self, f: impl FnOnce(&FacetEngine<'_>, &FilterState) -> T) -> T {
        match &self.loaded {
            Some(loaded) => f(&FacetEngine::new(&loaded.records, &self.cache), &loaded.filters),
            None => T::default(),
        }
    }

    fn emit(&mut self, event: CatalogEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct QueryArgs {
    #[arg(long, help = "Free-text fuzzy search")]
    pub search: Option<String>,
    #[arg(long, help = "Sort mode, e.g. referent_count or best_match")]
    pub sort: Option<SortMode>,
    #[arg(
        long = "filter",
        value_name = "KEY=VALUE",
        help = "organization=, category=, environment= or prerogatives=a,b"
    )]
    pub filters: Vec<String>,
}

impl QueryArgs {
    /// Updates in the order a user would apply them: search, sort, then facets.
    pub fn updates(&self) -> Result<Vec<FilterUpdate>> {
        let mut updates = Vec::new();
        if let Some(search) = &self.search {
            updates.push(FilterUpdate::Search(search.clone()));
        }
        if let Some(sort) = self.sort {
            updates.push(FilterUpdate::Sort(sort));
        }
        for arg in &self.filters {
            updates.push(FilterUpdate::parse(arg)?);
        }
        Ok(updates)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List softwares matching the query
    List(QueryArgs),
    /// Show option counts for every facet
    Facets(QueryArgs),
    /// Show a single software
    Show { name: String },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub command: Command,
}

pub fn run(options: RunOptions) -> Result<()> {
    init_tracing(options.debug);

    let config = match &options.config {
        Some(path) => RuntimeConfig::load_from_path(path),
        None => RuntimeConfig::load(),
    }
    .context("load runtime config")?;

    let provider: Box<dyn SoftwareProvider> = match &options.file {
        Some(path) => Box::new(FileSoftwareProvider::new(path)),
        None => Box::new(HttpSoftwareProvider::new_with_timeout(
            config.provider.url.clone(),
            Duration::from_millis(config.provider.timeout_ms),
        )?),
    };

    let mut catalog = SoftwareCatalog::new_with_default_sort(provider, config.defaults.sort);
    catalog.initialize()?;

    let output = execute(&mut catalog, &options.command)?;
    println!("{output}");
    Ok(())
}

/// Runs one CLI command against an initialized catalog and renders its output.
pub fn execute(catalog: &mut SoftwareCatalog, command: &Command) -> Result<String> {
    match command {
        Command::List(query) => {
            for update in query.updates()? {
                catalog.update_filter(update)?;
            }
            Ok(render::results(&catalog.current_results()))
        }
        Command::Facets(query) => {
            for update in query.updates()? {
                catalog.update_filter(update)?;
            }
            Ok(render::facets(catalog))
        }
        Command::Show { name } => catalog
            .software(name)
            .map(|software| render::software(&software))
            .ok_or_else(|| anyhow!("no software named '{name}'")),
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "sill_catalog=debug"
    } else {
        "sill_catalog=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .try_init();
}
