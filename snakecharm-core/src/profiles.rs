//! profiles.rs - Named bypass profiles and their discovery on disk.
//!
//! A profile bundles the rules of a known target (a CTF jail, a WAF rule
//! set) with the filter, mode and limits that work well against it, so the
//! same search can be rerun by name. Profiles are YAML files named
//! `<name>.yaml` in the standard profile directories.
//!
//! license: MIT OR Apache-2.0

use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{FilterSpec, RuleSpec, SearchMode, SearchOptions, SearchSpec};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct BypassProfile {
    pub profile_name: String,
    pub description: Option<String>,
    pub rules: RuleSpec,
    pub filter: FilterSpec,
    pub mode: SearchMode,
    pub options: SearchOptions,
}

impl BypassProfile {
    /// The search this profile describes.
    pub fn spec(&self) -> SearchSpec {
        SearchSpec {
            rules: self.rules.clone(),
            filter: self.filter.clone(),
            mode: self.mode,
            options: self.options.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.profile_name.trim().is_empty() {
            bail!("Profile validation failed: 'profile_name' cannot be empty.");
        }
        self.spec()
            .validate()
            .with_context(|| format!("Profile '{}' validation failed", self.profile_name))
    }
}

/// Where a profile called `name` may live, in lookup order.
pub fn profile_candidate_paths(name: &str) -> Vec<PathBuf> {
    let base_dirs = vec![
        dirs::home_dir().map(|p| p.join(".snakecharm").join("profiles")),
        dirs::config_dir().map(|p| p.join("snakecharm").join("profiles")),
        Some(PathBuf::from("/etc/snakecharm/profiles")),
        Some(PathBuf::from("./profiles")),
    ];

    base_dirs
        .into_iter()
        .flatten()
        .map(|dir| dir.join(format!("{}.yaml", name)))
        .collect()
}

/// Loads and validates a profile from an explicit path.
pub fn load_profile_from_file(path: &Path) -> Result<BypassProfile> {
    let raw = fs::read(path).with_context(|| format!("reading profile file {}", path.display()))?;
    let profile: BypassProfile =
        serde_yml::from_slice(&raw).with_context(|| format!("parsing profile YAML {}", path.display()))?;
    profile.validate()?;
    Ok(profile)
}

/// Loads a profile given either a file path or a bare name.
pub fn load_profile_by_name(name_or_path: &str) -> Result<BypassProfile> {
    debug!("Attempting to load profile from: '{}'", name_or_path);

    let path_to_load = {
        let path = Path::new(name_or_path);
        if path.is_file() {
            debug!("Input is a valid file path. Loading directly from: {}", path.display());
            Some(path.to_path_buf())
        } else {
            profile_candidate_paths(name_or_path).into_iter().find(|p| p.exists())
        }
    }
    .with_context(|| {
        format!(
            "Profile '{}' not found. It is not a valid file path, and was not found in expected locations.",
            name_or_path
        )
    })?;

    let profile = load_profile_from_file(&path_to_load)?;
    debug!("Successfully loaded profile '{}'.", profile.profile_name);
    Ok(profile)
}
