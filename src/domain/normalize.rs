use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::warn;

use crate::domain::models::{
    CanonicalRecord, DesktopOs, LegacyEnvironments, ParentSoftware, PresentationRecord,
    RawSoftware, SoftwareType,
};

const WIKIDATA_BASE_URL: &str = "https://www.wikidata.org/wiki";

/// Key used to look up one raw entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftwareRef {
    Name(String),
    WikidataId(String),
}

/// Lookup tables over a raw catalog. Building one rejects duplicate names.
pub struct RawCatalog<'a> {
    entries: &'a [RawSoftware],
    by_name: HashMap<&'a str, &'a RawSoftware>,
    by_wikidata_id: HashMap<&'a str, &'a RawSoftware>,
}

impl<'a> RawCatalog<'a> {
    pub fn new(entries: &'a [RawSoftware]) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_wikidata_id = HashMap::new();

        for entry in entries {
            if by_name
                .insert(entry.software_name.as_str(), entry)
                .is_some()
            {
                bail!("duplicate software name in catalog: {}", entry.software_name);
            }
            if let Some(wikidata_id) = &entry.wikidata_id {
                by_wikidata_id.entry(wikidata_id.as_str()).or_insert(entry);
            }
        }

        Ok(Self {
            entries,
            by_name,
            by_wikidata_id,
        })
    }

    pub fn find(&self, software_ref: &SoftwareRef) -> Option<&'a RawSoftware> {
        match software_ref {
            SoftwareRef::Name(name) => self.by_name.get(name.as_str()).copied(),
            SoftwareRef::WikidataId(id) => self.by_wikidata_id.get(id.as_str()).copied(),
        }
    }

    /// Normalizes every entry, preserving provider order.
    pub fn normalize_all(&self) -> Result<Vec<CanonicalRecord>> {
        self.entries.iter().map(|raw| self.to_canonical(raw)).collect()
    }

    pub fn normalize_one(&self, software_ref: &SoftwareRef) -> Result<Option<CanonicalRecord>> {
        match self.find(software_ref) {
            Some(raw) => self.to_canonical(raw).map(Some),
            None => Ok(None),
        }
    }

    fn to_canonical(&self, raw: &'a RawSoftware) -> Result<CanonicalRecord> {
        let software_type = classify(raw)?;
        let parent_software = self.resolve_parent(raw);

        let (referent_count, user_count) = raw
            .user_and_referent_count_by_organization
            .values()
            .fold((0_u64, 0_u64), |(referents, users), counts| {
                (
                    referents.saturating_add(counts.referent_count),
                    users.saturating_add(counts.user_count),
                )
            });

        let mut chain = vec![raw.software_name.as_str()];
        let search = self.search_blob(raw, &software_type, &mut chain);

        Ok(CanonicalRecord {
            software_name: raw.software_name.clone(),
            logo_url: raw.logo_url.clone(),
            software_description: raw.software_description.clone(),
            latest_version: raw.latest_version.clone(),
            added_time: raw.added_time,
            update_time: raw.update_time,
            referent_count,
            user_count,
            organizations: raw
                .user_and_referent_count_by_organization
                .keys()
                .cloned()
                .collect(),
            categories: raw.categories.clone(),
            parent_software,
            software_type,
            prerogatives: raw.prerogatives,
            test_url: raw.test_url.clone(),
            search,
        })
    }

    fn resolve_parent(&self, raw: &RawSoftware) -> Option<ParentSoftware> {
        if let Some(found) = self.in_catalog_parent(raw) {
            return Some(ParentSoftware::InCatalog {
                software_name: found.software_name.clone(),
            });
        }

        if let Some(parent) = &raw.parent_software {
            return Some(ParentSoftware::External {
                software_name: parent.wikidata_label.clone(),
                url: format!("{WIKIDATA_BASE_URL}/{}", parent.wikidata_id),
            });
        }

        if let Some(parent_name) = raw.parent_software_name.as_deref() {
            warn!(
                software = %raw.software_name,
                parent = parent_name,
                "legacy parent software not found in catalog"
            );
        }
        None
    }

    fn in_catalog_parent(&self, raw: &RawSoftware) -> Option<&'a RawSoftware> {
        match (&raw.parent_software, raw.parent_software_name.as_deref()) {
            (Some(parent), _) => self.by_wikidata_id.get(parent.wikidata_id.as_str()).copied(),
            (None, Some(name)) => self.by_name.get(name).copied(),
            (None, None) => None,
        }
    }

    /// `chain` holds the names currently being resolved; a parent already in it
    /// is skipped so that cyclic parent links terminate.
    fn search_blob(
        &self,
        raw: &'a RawSoftware,
        software_type: &SoftwareType,
        chain: &mut Vec<&'a str>,
    ) -> String {
        let mut parts: Vec<String> = vec![
            raw.software_name.clone(),
            raw.software_description.clone(),
        ];
        if let Some(version) = &raw.latest_version {
            parts.push(version.sem_ver.clone());
        }
        parts.push(raw.categories.join(" "));
        parts.push(
            software_type
                .environments()
                .iter()
                .map(|env| env.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );

        if let Some(parent) = self.in_catalog_parent(raw) {
            if !chain.contains(&parent.software_name.as_str()) {
                chain.push(parent.software_name.as_str());
                // An unclassifiable parent is reported when normalized on its own.
                if let Ok(parent_type) = classify(parent) {
                    parts.push(self.search_blob(parent, &parent_type, chain));
                }
                chain.pop();
            }
        }

        parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Normalizes a full raw catalog into a snapshot.
pub fn normalize(raw: &[RawSoftware]) -> Result<Vec<CanonicalRecord>> {
    RawCatalog::new(raw)?.normalize_all()
}

pub fn normalize_one(
    raw: &[RawSoftware],
    software_ref: &SoftwareRef,
) -> Result<Option<CanonicalRecord>> {
    RawCatalog::new(raw)?.normalize_one(software_ref)
}

pub fn presentation_by_wikidata_id(
    raw: &[RawSoftware],
    wikidata_id: &str,
) -> Result<Option<PresentationRecord>> {
    let record = normalize_one(raw, &SoftwareRef::WikidataId(wikidata_id.to_string()))?;
    Ok(record.map(|record| record.to_presentation()))
}

/// Resolves the runtime classification, adapting the legacy environment map.
pub fn classify(raw: &RawSoftware) -> Result<SoftwareType> {
    if let Some(software_type) = raw.software_type {
        return Ok(software_type);
    }
    match raw.environments {
        Some(environments) => Ok(adapt_legacy_environments(environments)),
        None => bail!(
            "software '{}' has neither softwareType nor environments",
            raw.software_name
        ),
    }
}

pub fn adapt_legacy_environments(environments: LegacyEnvironments) -> SoftwareType {
    let LegacyEnvironments {
        linux,
        windows,
        mac,
        browser,
        smartphone,
    } = environments;

    if linux || windows || mac || smartphone {
        SoftwareType::Desktop {
            os: DesktopOs {
                linux,
                windows,
                mac,
            },
        }
    } else if browser {
        SoftwareType::Cloud
    } else {
        SoftwareType::Stack
    }
}
