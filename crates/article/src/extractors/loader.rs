// ABOUTME: Loads site registries from the bundled JSON data or from user-supplied files.
// ABOUTME: Provides load_builtin_registry() plus string and path loaders that validate every site.

//! Site registry loading.
//!
//! A registry file is a JSON array of [`SiteConfig`] objects. User-supplied
//! registries are compiled site by site while loading, so a bad selector is
//! reported with the name of the site that declared it.

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::error::ConfigError;
use crate::extractors::site::{SiteConfig, SiteRegistry};

/// Embedded JSON with the bundled site definitions.
const BUILTIN_SITES_JSON: &str = include_str!("../../data/sites.json");

/// Loads the bundled site registry.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed or cannot be deserialized.
pub fn load_builtin_registry() -> SiteRegistry {
    let sites: Vec<SiteConfig> =
        serde_json::from_str(BUILTIN_SITES_JSON).expect("failed to parse builtin sites");
    sites.into_iter().collect()
}

/// Parses and validates a registry from JSON text.
pub fn load_registry_from_str(json: &str) -> Result<SiteRegistry, ConfigError> {
    let sites: Vec<SiteConfig> = serde_json::from_str(json)
        .context("site registry is not a JSON array of sites")
        .map_err(ConfigError::Registry)?;
    for site in &sites {
        site.compile()?;
    }
    Ok(sites.into_iter().collect())
}

/// Reads, parses and validates a registry file.
pub fn load_registry_from_path(path: impl AsRef<Path>) -> Result<SiteRegistry, ConfigError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading site registry {}", path.display()))
        .map_err(ConfigError::Registry)?;
    load_registry_from_str(&json)
}
