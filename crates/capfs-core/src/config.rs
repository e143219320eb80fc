//! Capacity configuration that callers can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Hard cap (in bytes) on the aggregate size of the managed tree.
    pub limit_bytes: i64,

    /// Optional backend URI (`memory://`, `file:///srv/data`). Falls back to
    /// `root_dir` on the host filesystem when unset.
    pub backend_uri: Option<String>,

    /// Host directory used when no URI is given.
    pub root_dir: String,

    /// Directory overhead reported by the in-memory backend.
    pub dir_size: u64,

    /// Settle writes and truncates against real size changes instead of
    /// charging every written byte and subtracting the new truncate length.
    pub exact_accounting: bool,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            limit_bytes: 1024 * 1024 * 1024, // 1 GiB default
            backend_uri: None,
            root_dir: "/tmp/capfs".to_string(),
            dir_size: 4096,
            exact_accounting: true,
        }
    }
}

impl CapacityConfig {
    pub fn with_limit(limit_bytes: i64) -> Self {
        Self {
            limit_bytes,
            ..Self::default()
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `CAPFS_LIMIT_BYTES`: capacity limit in bytes
    /// - `CAPFS_BACKEND_URI`: backend URI
    /// - `CAPFS_ROOT_DIR`: host directory for the default backend
    /// - `CAPFS_DIR_SIZE`: in-memory directory overhead
    /// - `CAPFS_EXACT_ACCOUNTING`: `true`/`false`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("CAPFS_LIMIT_BYTES") {
            if let Ok(v) = s.parse::<i64>() {
                cfg.limit_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("CAPFS_BACKEND_URI") {
            cfg.backend_uri = Some(s);
        }

        if let Ok(s) = std::env::var("CAPFS_ROOT_DIR") {
            cfg.root_dir = s;
        }

        if let Ok(s) = std::env::var("CAPFS_DIR_SIZE") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.dir_size = v;
            }
        }

        if let Ok(s) = std::env::var("CAPFS_EXACT_ACCOUNTING") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.exact_accounting = v;
            }
        }

        cfg
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit_bytes < 0 {
            return Err(Error::Config(format!(
                "limit must be non-negative, got {}",
                self.limit_bytes
            )));
        }
        Ok(())
    }

    pub fn scheme(&self) -> Option<&str> {
        self.backend_uri
            .as_deref()
            .and_then(|uri| uri.split_once("://"))
            .map(|(scheme, _)| scheme.trim())
            .filter(|s| !s.is_empty())
    }

    /// Host path the filesystem backend should be rooted at.
    pub fn backend_root(&self) -> String {
        match (self.scheme(), self.backend_uri.as_deref()) {
            (Some("file"), Some(uri)) => {
                file_uri_to_path(uri).unwrap_or_else(|| self.root_dir.clone())
            }
            (None, Some(path)) if !path.trim().is_empty() => path.to_string(),
            _ => self.root_dir.clone(),
        }
    }
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = CapacityConfig::default();
        cfg.validate().unwrap();
        assert!(cfg.exact_accounting);
        assert_eq!(cfg.scheme(), None);
        assert_eq!(cfg.backend_root(), "/tmp/capfs");
    }

    #[test]
    fn negative_limit_is_rejected() {
        let err = CapacityConfig::with_limit(-1).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn json_fills_missing_fields_from_defaults() {
        let cfg = CapacityConfig::from_json(r#"{"limit_bytes": 5120, "backend_uri": "memory://"}"#)
            .unwrap();
        assert_eq!(cfg.limit_bytes, 5120);
        assert_eq!(cfg.scheme(), Some("memory"));
        assert_eq!(cfg.dir_size, 4096);
    }

    #[test]
    fn json_errors_map_to_config() {
        assert!(matches!(
            CapacityConfig::from_json("{not json").unwrap_err(),
            Error::Config(_)
        ));
        assert!(matches!(
            CapacityConfig::from_json(r#"{"limit_bytes": -3}"#).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn file_uri_and_bare_path_roots() {
        let mut cfg = CapacityConfig::default();
        cfg.backend_uri = Some("file:///srv/data".into());
        assert_eq!(cfg.backend_root(), "/srv/data");

        cfg.backend_uri = Some("file://srv/data".into());
        assert_eq!(cfg.backend_root(), "/srv/data");

        cfg.backend_uri = Some("/var/capfs".into());
        assert_eq!(cfg.scheme(), None);
        assert_eq!(cfg.backend_root(), "/var/capfs");
    }

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("CAPFS_LIMIT_BYTES", "2048");
        std::env::set_var("CAPFS_EXACT_ACCOUNTING", "false");
        std::env::set_var("CAPFS_DIR_SIZE", "not-a-number");
        let cfg = CapacityConfig::from_env();
        std::env::remove_var("CAPFS_LIMIT_BYTES");
        std::env::remove_var("CAPFS_EXACT_ACCOUNTING");
        std::env::remove_var("CAPFS_DIR_SIZE");

        assert_eq!(cfg.limit_bytes, 2048);
        assert!(!cfg.exact_accounting);
        assert_eq!(cfg.dir_size, 4096);
    }
}
