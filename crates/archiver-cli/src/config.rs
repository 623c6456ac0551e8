//! Run configuration.
//!
//! Values come from built-in defaults, optionally overridden by a JSON file
//! and then by command line flags.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use archiver_model::{
    DEFAULT_BINARY_EXTENSIONS, DEFAULT_MODEL_EXTENSIONS, ECORE_NS_URI, Location,
    ResourceFactoryRegistry, ResourceKind,
};
use archiver_store::{ReplaceStrategy, entry_name};
use serde::{Deserialize, Serialize};

/// Location of the setup index; always mirrored.
pub const DEFAULT_INDEX_LOCATION: &str =
    "https://git.eclipse.org/c/oomph/org.eclipse.oomph.git/plain/setups/org.eclipse.setup";

/// Published location of the archive; determines the default cache path.
pub const DEFAULT_ARCHIVE_LOCATION: &str = "https://www.eclipse.org/setups/setups.zip";

/// Directory under the user cache directory that holds archives.
pub const CACHE_DIR_NAME: &str = "setup-archiver";

/// How the finished archive replaces the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceMode {
    /// Probe the target directory.
    #[default]
    Auto,
    /// Always rename over the live archive.
    Rename,
    /// Delete the live archive before renaming.
    DeleteFirst,
}

impl ReplaceMode {
    /// The strategy to use for an archive in `dir`.
    #[must_use]
    pub fn resolve(self, dir: &Path) -> ReplaceStrategy {
        match self {
            Self::Auto => ReplaceStrategy::detect(dir),
            Self::Rename => ReplaceStrategy::RenameOver,
            Self::DeleteFirst => ReplaceStrategy::DeleteThenRename,
        }
    }

    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Rename => "rename",
            Self::DeleteFirst => "delete-first",
        }
    }
}

impl fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Settings of a mirroring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiverConfig {
    /// The setup index, always the first seed.
    pub index_location: String,

    /// Where the archive is published; names the default target file.
    pub archive_location: String,

    /// Explicit archive path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,

    /// Additional seed locations.
    pub seeds: Vec<String>,

    /// Request timeout for network fetches.
    pub fetch_timeout_secs: u64,

    /// Schemes whose resources are persisted.
    pub network_schemes: Vec<String>,

    /// Extensions whose load failure aborts the run.
    pub schema_extensions: Vec<String>,

    /// Extensions parsed as models.
    pub model_extensions: Vec<String>,

    /// Extensions carried as opaque assets.
    pub binary_extensions: Vec<String>,

    /// Namespace URIs of built-in packages; references into them are not
    /// fetched.
    pub package_namespaces: Vec<String>,

    pub replace_strategy: ReplaceMode,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            index_location: DEFAULT_INDEX_LOCATION.to_string(),
            archive_location: DEFAULT_ARCHIVE_LOCATION.to_string(),
            target: None,
            seeds: Vec::new(),
            fetch_timeout_secs: 60,
            network_schemes: vec!["http".to_string(), "https".to_string()],
            schema_extensions: vec!["ecore".to_string()],
            model_extensions: to_strings(DEFAULT_MODEL_EXTENSIONS),
            binary_extensions: to_strings(DEFAULT_BINARY_EXTENSIONS),
            package_namespaces: vec![ECORE_NS_URI.to_string()],
            replace_strategy: ReplaceMode::default(),
        }
    }
}

impl ArchiverConfig {
    /// Load a configuration file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    /// Seed locations: the index first, then the extra seeds, without
    /// duplicates.
    pub fn seed_locations(&self) -> Result<Vec<Location>> {
        let mut seeds: Vec<Location> = Vec::new();
        for text in std::iter::once(&self.index_location).chain(&self.seeds) {
            let location =
                Location::parse(text).with_context(|| format!("invalid seed location {text}"))?;
            if !seeds.contains(&location) {
                seeds.push(location);
            }
        }
        Ok(seeds)
    }

    /// The archive path: the explicit target, or the cache file for the
    /// archive location.
    pub fn target_path(&self) -> Result<PathBuf> {
        if let Some(target) = &self.target {
            return Ok(target.clone());
        }
        let archive = Location::parse(&self.archive_location)
            .with_context(|| format!("invalid archive location {}", self.archive_location))?;
        let cache = dirs::cache_dir().ok_or_else(|| anyhow!("no cache directory; pass --target"))?;
        let mut path = cache.join(CACHE_DIR_NAME);
        for part in entry_name(&archive).split('/').filter(|part| !part.is_empty()) {
            path.push(sanitize(part));
        }
        Ok(path)
    }

    /// The resource factory registry for these extensions and packages.
    pub fn registry(&self) -> Result<ResourceFactoryRegistry> {
        let mut registry = ResourceFactoryRegistry::new(ResourceKind::Model);
        for extension in &self.model_extensions {
            registry.register(extension, ResourceKind::Model);
        }
        for extension in &self.binary_extensions {
            registry.register(extension, ResourceKind::Binary);
        }
        for text in &self.package_namespaces {
            let namespace = Location::parse(text)
                .with_context(|| format!("invalid package namespace {text}"))?;
            registry.register_package(namespace);
        }
        Ok(registry)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Replace characters that are not valid in file names on every platform.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\\') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArchiverConfig::default();
        let seeds = config.seed_locations().unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].as_str(), DEFAULT_INDEX_LOCATION);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(60));
        assert_eq!(config.replace_strategy, ReplaceMode::Auto);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ArchiverConfig = serde_json::from_str(
            r#"{ "seeds": ["https://h/a.setup"], "schema_extensions": ["ecore", "xcore"], "replace_strategy": "delete-first" }"#,
        )
        .unwrap();
        assert_eq!(config.index_location, DEFAULT_INDEX_LOCATION);
        assert_eq!(config.schema_extensions, vec!["ecore", "xcore"]);
        assert_eq!(config.replace_strategy, ReplaceMode::DeleteFirst);
        assert_eq!(config.seed_locations().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(serde_json::from_str::<ArchiverConfig>(r#"{ "sedes": [] }"#).is_err());
    }

    #[test]
    fn test_seeds_are_deduplicated() {
        let config = ArchiverConfig {
            index_location: "https://h/index.setup".to_string(),
            seeds: vec![
                "https://h/./index.setup".to_string(),
                "https://h/other.setup".to_string(),
            ],
            ..ArchiverConfig::default()
        };
        let seeds = config.seed_locations().unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[1].as_str(), "https://h/other.setup");
    }

    #[test]
    fn test_explicit_target_wins() {
        let config = ArchiverConfig {
            target: Some(PathBuf::from("/srv/setups.zip")),
            ..ArchiverConfig::default()
        };
        assert_eq!(config.target_path().unwrap(), PathBuf::from("/srv/setups.zip"));
    }

    #[test]
    fn test_registry_from_extensions() {
        let config = ArchiverConfig {
            binary_extensions: vec!["bmp".to_string()],
            ..ArchiverConfig::default()
        };
        let registry = config.registry().unwrap();
        let bmp = Location::parse("https://h/a.bmp").unwrap();
        let gif = Location::parse("https://h/a.gif").unwrap();
        assert_eq!(registry.kind_for(&bmp), ResourceKind::Binary);
        assert!(!registry.is_registered("gif"));
        assert_eq!(registry.kind_for(&gif), ResourceKind::Model);
        let string = Location::parse(&format!("{ECORE_NS_URI}#//EString")).unwrap();
        assert!(registry.is_package_namespace(&string));
    }

    #[test]
    fn test_invalid_package_namespace_is_rejected() {
        let config = ArchiverConfig {
            package_namespaces: vec!["not a uri".to_string()],
            ..ArchiverConfig::default()
        };
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("host:8080"), "host_8080");
        assert_eq!(sanitize("setups.zip"), "setups.zip");
    }
}
