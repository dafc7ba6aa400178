//! Configuration and test-data file discovery
//!
//! Lookup order for the configuration file:
//! 1. explicit `--config` path
//! 2. `$APIFLOW_CONFIG`
//! 3. `./config/config.yaml`, then `./config.yaml`
//! 4. the platform config directory (`~/.config/apiflow/config.yaml` on Linux)

use std::path::{Path, PathBuf};

/// Name used for platform directories
const APP_NAME: &str = "apiflow";

/// Environment variable overriding the configuration file
pub const CONFIG_ENV: &str = "APIFLOW_CONFIG";

/// Environment variable overriding the test-data file
pub const DATA_ENV: &str = "APIFLOW_DATA";

/// Default test-data file name, placed next to the configuration file
pub const DEFAULT_DATA_FILE: &str = "test_data.yaml";

/// Get the platform configuration directory
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/apiflow/`
/// - macOS: `~/Library/Application Support/apiflow/`
/// - Windows: `%APPDATA%\apiflow\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Resolve the configuration file path
///
/// Returns the first existing candidate, or the explicit/env path even when
/// it does not exist so the load error names the file the user asked for.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let candidates = [
        Some(PathBuf::from("config").join("config.yaml")),
        Some(PathBuf::from("config.yaml")),
        config_dir().map(|dir| dir.join("config.yaml")),
    ];

    candidates.into_iter().flatten().find(|p| p.exists())
}

/// Resolve the test-data file path
///
/// `configured` is the `test_data_file` value from the configuration and is
/// interpreted relative to the configuration file's directory.
pub fn resolve_data_path(
    explicit: Option<&Path>,
    config_path: &Path,
    configured: Option<&Path>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    let base = config_path.parent().unwrap_or(Path::new("."));
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base.join(path),
        None => base.join(DEFAULT_DATA_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_valid() {
        let dir = config_dir();
        assert!(dir.is_some());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(Some(Path::new("/nonexistent/custom.yaml")));
        assert_eq!(path, Some(PathBuf::from("/nonexistent/custom.yaml")));
    }

    #[test]
    fn test_data_path_relative_to_config() {
        let path = resolve_data_path(
            Some(Path::new("/tmp/explicit.yaml")),
            Path::new("/etc/apiflow/config.yaml"),
            None,
        );
        assert_eq!(path, PathBuf::from("/tmp/explicit.yaml"));

        let path = resolve_data_path(
            None,
            Path::new("/etc/apiflow/config.yaml"),
            Some(Path::new("data/run.yaml")),
        );
        if std::env::var(DATA_ENV).is_err() {
            assert_eq!(path, PathBuf::from("/etc/apiflow/data/run.yaml"));
        }
    }
}
