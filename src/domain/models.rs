use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// One catalog entry as delivered by the software provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawSoftware {
    pub software_name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub software_description: String,
    #[serde(default)]
    pub latest_version: Option<LatestVersion>,
    #[serde(default)]
    pub wikidata_id: Option<String>,
    #[serde(default)]
    pub parent_software: Option<RawParentSoftware>,
    /// Older catalogs referenced the parent by name only.
    #[serde(default)]
    pub parent_software_name: Option<String>,
    #[serde(default)]
    pub test_url: Option<String>,
    #[serde(default)]
    pub added_time: u64,
    #[serde(default)]
    pub update_time: u64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub prerogatives: Prerogatives,
    #[serde(default)]
    pub software_type: Option<SoftwareType>,
    /// Older catalogs carried a flat environment map instead of `software_type`.
    #[serde(default)]
    pub environments: Option<LegacyEnvironments>,
    #[serde(default)]
    pub user_and_referent_count_by_organization: BTreeMap<String, OrganizationCounts>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawParentSoftware {
    pub wikidata_id: String,
    pub wikidata_label: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCounts {
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub referent_count: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegacyEnvironments {
    #[serde(default)]
    pub linux: bool,
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub mac: bool,
    #[serde(default)]
    pub browser: bool,
    #[serde(default)]
    pub smartphone: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LatestVersion {
    pub sem_ver: String,
    pub publication_time: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesktopOs {
    #[serde(default)]
    pub linux: bool,
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub mac: bool,
}

/// Runtime surfaces a software runs on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SoftwareType {
    Desktop { os: DesktopOs },
    Cloud,
    Stack,
}

impl SoftwareType {
    pub fn environments(&self) -> Vec<Environment> {
        match self {
            Self::Desktop { os } => {
                let mut out = Vec::new();
                if os.linux {
                    out.push(Environment::Linux);
                }
                if os.windows {
                    out.push(Environment::Windows);
                }
                if os.mac {
                    out.push(Environment::Mac);
                }
                out
            }
            Self::Cloud => vec![Environment::Browser],
            Self::Stack => vec![Environment::Stack],
        }
    }

    pub fn runs_on(&self, environment: Environment) -> bool {
        match (self, environment) {
            (Self::Desktop { os }, Environment::Linux) => os.linux,
            (Self::Desktop { os }, Environment::Windows) => os.windows,
            (Self::Desktop { os }, Environment::Mac) => os.mac,
            (Self::Cloud, Environment::Browser) => true,
            (Self::Stack, Environment::Stack) => true,
            _ => false,
        }
    }

    pub fn is_desktop(&self) -> bool {
        matches!(self, Self::Desktop { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Linux,
    Windows,
    Mac,
    Browser,
    Stack,
}

impl Environment {
    pub const ALL: [Environment; 5] = [
        Self::Linux,
        Self::Windows,
        Self::Mac,
        Self::Browser,
        Self::Stack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Mac => "mac",
            Self::Browser => "browser",
            Self::Stack => "stack",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                anyhow!("invalid environment '{value}' (expected linux, windows, mac, browser, stack)")
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Prerogative {
    #[serde(rename = "isPresentInSupportContract")]
    IsPresentInSupportContract,
    #[serde(rename = "isFromFrenchPublicServices")]
    IsFromFrenchPublicServices,
    #[serde(rename = "doRespectRgaa")]
    DoRespectRgaa,
    #[serde(rename = "isInstallableOnUserTerminal")]
    IsInstallableOnUserTerminal,
    #[serde(rename = "isTestable")]
    IsTestable,
}

impl Prerogative {
    pub const ALL: [Prerogative; 5] = [
        Self::IsPresentInSupportContract,
        Self::IsFromFrenchPublicServices,
        Self::DoRespectRgaa,
        Self::IsInstallableOnUserTerminal,
        Self::IsTestable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsPresentInSupportContract => "isPresentInSupportContract",
            Self::IsFromFrenchPublicServices => "isFromFrenchPublicServices",
            Self::DoRespectRgaa => "doRespectRgaa",
            Self::IsInstallableOnUserTerminal => "isInstallableOnUserTerminal",
            Self::IsTestable => "isTestable",
        }
    }

    /// Derived prerogatives are recomputed from other fields at projection time.
    pub fn is_derived(self) -> bool {
        matches!(self, Self::IsInstallableOnUserTerminal | Self::IsTestable)
    }
}

impl fmt::Display for Prerogative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prerogative {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| anyhow!("invalid prerogative '{value}'"))
    }
}

/// Prerogatives intrinsic to a record, as stored in the catalog.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prerogatives {
    #[serde(default)]
    pub is_present_in_support_contract: bool,
    #[serde(default)]
    pub is_from_french_public_services: bool,
    #[serde(default)]
    pub do_respect_rgaa: bool,
}

impl Prerogatives {
    pub fn active(&self) -> Vec<Prerogative> {
        let mut out = Vec::new();
        if self.is_present_in_support_contract {
            out.push(Prerogative::IsPresentInSupportContract);
        }
        if self.is_from_french_public_services {
            out.push(Prerogative::IsFromFrenchPublicServices);
        }
        if self.do_respect_rgaa {
            out.push(Prerogative::DoRespectRgaa);
        }
        out
    }
}

/// Intrinsic prerogatives merged with the derived ones.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FullPrerogatives {
    pub is_present_in_support_contract: bool,
    pub is_from_french_public_services: bool,
    pub do_respect_rgaa: bool,
    pub is_installable_on_user_terminal: bool,
    pub is_testable: bool,
}

impl FullPrerogatives {
    pub fn get(&self, prerogative: Prerogative) -> bool {
        match prerogative {
            Prerogative::IsPresentInSupportContract => self.is_present_in_support_contract,
            Prerogative::IsFromFrenchPublicServices => self.is_from_french_public_services,
            Prerogative::DoRespectRgaa => self.do_respect_rgaa,
            Prerogative::IsInstallableOnUserTerminal => self.is_installable_on_user_terminal,
            Prerogative::IsTestable => self.is_testable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParentSoftware {
    /// The parent is itself an entry of the same snapshot.
    InCatalog {
        #[serde(rename = "softwareName")]
        software_name: String,
    },
    External {
        #[serde(rename = "softwareName")]
        software_name: String,
        url: String,
    },
}

impl ParentSoftware {
    pub fn software_name(&self) -> &str {
        match self {
            Self::InCatalog { software_name } | Self::External { software_name, .. } => {
                software_name
            }
        }
    }
}

/// Normalized, immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub software_name: String,
    pub logo_url: Option<String>,
    pub software_description: String,
    pub latest_version: Option<LatestVersion>,
    pub added_time: u64,
    pub update_time: u64,
    pub referent_count: u64,
    pub user_count: u64,
    pub organizations: BTreeSet<String>,
    pub categories: Vec<String>,
    pub parent_software: Option<ParentSoftware>,
    pub software_type: SoftwareType,
    pub prerogatives: Prerogatives,
    pub test_url: Option<String>,
    pub search: String,
}

impl CanonicalRecord {
    pub fn merged_prerogatives(&self) -> FullPrerogatives {
        merged_prerogatives(self)
    }

    pub fn environments(&self) -> Vec<Environment> {
        self.software_type.environments()
    }

    pub fn to_presentation(&self) -> PresentationRecord {
        PresentationRecord {
            software_name: self.software_name.clone(),
            logo_url: self.logo_url.clone(),
            software_description: self.software_description.clone(),
            latest_version: self.latest_version.clone(),
            referent_count: self.referent_count,
            user_count: self.user_count,
            organizations: self.organizations.clone(),
            categories: self.categories.clone(),
            parent_software: self.parent_software.clone(),
            test_url: self.test_url.clone(),
            prerogatives: merged_prerogatives(self),
        }
    }
}

pub fn merged_prerogatives(record: &CanonicalRecord) -> FullPrerogatives {
    let Prerogatives {
        is_present_in_support_contract,
        is_from_french_public_services,
        do_respect_rgaa,
    } = record.prerogatives;

    FullPrerogatives {
        is_present_in_support_contract,
        is_from_french_public_services,
        do_respect_rgaa,
        is_installable_on_user_terminal: record.software_type.is_desktop(),
        is_testable: record.test_url.is_some(),
    }
}

/// Output shape handed to the UI layer, built fresh on every projection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRecord {
    pub software_name: String,
    pub logo_url: Option<String>,
    pub software_description: String,
    pub latest_version: Option<LatestVersion>,
    pub referent_count: u64,
    pub user_count: u64,
    pub organizations: BTreeSet<String>,
    pub categories: Vec<String>,
    pub parent_software: Option<ParentSoftware>,
    pub test_url: Option<String>,
    pub prerogatives: FullPrerogatives,
}
