use std::fmt::{Display, Write};

use crate::app::SoftwareCatalog;
use crate::domain::facets::{FacetKind, FacetOption};
use crate::domain::models::{ParentSoftware, Prerogative, PresentationRecord};

pub fn results(softwares: &[PresentationRecord]) -> String {
    let mut out = format!("Softwares ({})\n", softwares.len());
    for (idx, software) in softwares.iter().enumerate() {
        let version = software
            .latest_version
            .as_ref()
            .map(|v| format!(" {}", v.sem_ver))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:>3}. {}{} | referents={} users={}",
            idx + 1,
            software.software_name,
            version,
            software.referent_count,
            software.user_count
        );
    }
    out
}

pub fn facets(catalog: &SoftwareCatalog) -> String {
    let mut out = String::new();
    for kind in FacetKind::ALL {
        let _ = writeln!(out, "[{}]", kind.label());
        match kind {
            FacetKind::Organization => options(&mut out, &catalog.organization_options()),
            FacetKind::Category => options(&mut out, &catalog.category_options()),
            FacetKind::Environment => options(&mut out, &catalog.environment_options()),
            FacetKind::Prerogative => options(&mut out, &catalog.prerogative_options()),
        }
    }
    let sorts: Vec<&str> = catalog.sort_options().iter().map(|s| s.as_str()).collect();
    let _ = writeln!(out, "[sort]\n  {}", sorts.join(", "));
    out
}

fn options<V: Display>(out: &mut String, options: &[FacetOption<V>]) {
    for option in options {
        let _ = writeln!(out, "  {} ({})", option.value, option.software_count);
    }
}

pub fn software(software: &PresentationRecord) -> String {
    let mut out = format!("{}\n", software.software_name);
    let _ = writeln!(out, "  {}", software.software_description);
    if let Some(version) = &software.latest_version {
        let _ = writeln!(out, "  version: {}", version.sem_ver);
    }
    match &software.parent_software {
        Some(ParentSoftware::InCatalog { software_name }) => {
            let _ = writeln!(out, "  parent: {software_name}");
        }
        Some(ParentSoftware::External { software_name, url }) => {
            let _ = writeln!(out, "  parent: {software_name} <{url}>");
        }
        None => {}
    }
    let _ = writeln!(
        out,
        "  referents: {}  users: {}",
        software.referent_count, software.user_count
    );
    if !software.organizations.is_empty() {
        let organizations: Vec<&str> = software.organizations.iter().map(String::as_str).collect();
        let _ = writeln!(out, "  organizations: {}", organizations.join(", "));
    }
    if !software.categories.is_empty() {
        let _ = writeln!(out, "  categories: {}", software.categories.join(", "));
    }
    let prerogatives: Vec<&str> = Prerogative::ALL
        .into_iter()
        .filter(|p| software.prerogatives.get(*p))
        .map(Prerogative::as_str)
        .collect();
    if !prerogatives.is_empty() {
        let _ = writeln!(out, "  prerogatives: {}", prerogatives.join(", "));
    }
    if let Some(test_url) = &software.test_url {
        let _ = writeln!(out, "  try it: {test_url}");
    }
    out
}
