//! Construction-time configuration for [`CachedFetch`](crate::CachedFetch)

use directories::ProjectDirs;
use std::path::PathBuf;

use crate::cache::StoreError;

/// File name of the store inside the default cache directory
pub const CACHE_FILE_NAME: &str = "fetch-cache.json";

/// Schema version used when none is configured
pub const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where the store lives and which schema version its entries belong to
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Store file location. Defaults to [`CacheConfig::default_path`].
    pub cache: Option<PathBuf>,
    /// Schema version. Changing it invalidates every stored entry.
    pub version: Option<String>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache = Some(path.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Default store path inside the platform cache directory
    ///
    /// Uses `~/.cache/fetchcache/` on Linux, or the equivalent on other platforms.
    /// Returns `None` if no home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "fetchcache")?;
        Some(project_dirs.cache_dir().join(CACHE_FILE_NAME))
    }

    pub fn resolve_path(&self) -> Result<PathBuf, StoreError> {
        match &self.cache {
            Some(path) => Ok(path.clone()),
            None => Self::default_path().ok_or(StoreError::NoCacheDir),
        }
    }

    pub fn resolve_version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_win() {
        let config = CacheConfig::new()
            .with_cache("/tmp/somewhere/cache.json")
            .with_version("9.9.9");

        assert_eq!(
            config.resolve_path().unwrap(),
            PathBuf::from("/tmp/somewhere/cache.json")
        );
        assert_eq!(config.resolve_version(), "9.9.9");
    }

    #[test]
    fn test_version_defaults_to_package_version() {
        assert_eq!(CacheConfig::new().resolve_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_default_path_is_project_scoped() {
        if let Some(path) = CacheConfig::default_path() {
            let path_str = path.to_string_lossy();
            assert!(path_str.contains("fetchcache"), "Path should contain project name");
            assert!(path_str.ends_with(CACHE_FILE_NAME));
        }
        // Test passes if default_path() returns None (e.g., no home directory in CI)
    }
}
