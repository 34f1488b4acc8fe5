pub mod error;
pub mod stack;

pub use error::*;
pub use stack::StackConfig;

use std::path::{Path, PathBuf};

/// Environment variable that points directly at a config file
pub const CONFIG_PATH_ENV: &str = "GATEFLOW_CONFIG";

const CANDIDATES: [&str; 4] = [
    "gateflow.local.yaml",
    ".gateflow.local.yaml",
    "gateflow.yaml",
    ".gateflow.yaml",
];

/// Locate the gateflow config file
///
/// Search order:
/// 1. `GATEFLOW_CONFIG` (direct path; must exist)
/// 2. current directory: gateflow.local.yaml, .gateflow.local.yaml, gateflow.yaml, .gateflow.yaml
/// 3. `./.gateflow/` directory, same order
/// 4. `~/.config/gateflow/gateflow.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ExplicitPathMissing { path: config_path });
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let local_dir = current_dir.join(".gateflow");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("gateflow").join("gateflow.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Parse a YAML stack config file
pub fn load_config(path: impl AsRef<Path>) -> Result<StackConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    // An empty file is a valid, empty config
    if content.trim().is_empty() {
        return Ok(StackConfig::default());
    }

    let config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    tracing::debug!("Loaded stack config from {}", path.display());
    Ok(config)
}

/// Load the config file from `explicit` or, failing that, by discovery.
///
/// Returns `Ok(None)` when discovery finds nothing; the stack can still be
/// configured entirely through flags and environment variables.
pub fn discover(explicit: Option<&Path>) -> Result<Option<(PathBuf, StackConfig)>> {
    let path = match explicit {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => {
            return Err(ConfigError::ExplicitPathMissing {
                path: path.display().to_string(),
            });
        }
        None => match find_config_file() {
            Ok(path) => path,
            Err(ConfigError::ConfigFileNotFound) => return Ok(None),
            Err(e) => return Err(e),
        },
    };

    let config = load_config(&path)?;
    Ok(Some((path, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// Run `f` inside `dir` with no config env var and an isolated global config dir
    fn in_dir<R>(dir: &Path, f: impl FnOnce() -> R) -> R {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();

        let xdg = dir.join("xdg-config");
        let result = temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, None),
                ("XDG_CONFIG_HOME", Some(xdg.to_str().unwrap())),
            ],
            f,
        );

        std::env::set_current_dir(original_dir).unwrap();
        result
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("gateflow.yaml"), "region: us-east1\n").unwrap();

        let found = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(found.ends_with("gateflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("gateflow.yaml"), "# shared").unwrap();
        fs::write(temp_dir.path().join("gateflow.local.yaml"), "# local").unwrap();

        let found = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(found.ends_with("gateflow.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_gateflow_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let local_dir = temp_dir.path().join(".gateflow");
        fs::create_dir(&local_dir).unwrap();
        fs::write(local_dir.join("gateflow.yaml"), "# nested").unwrap();

        let found = in_dir(temp_dir.path(), find_config_file).unwrap();
        assert!(found.ends_with(".gateflow/gateflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "api_id: custom\n").unwrap();

        let found = temp_env::with_var(CONFIG_PATH_ENV, Some(config_path.to_str().unwrap()), || {
            find_config_file().unwrap()
        });
        assert_eq!(found, config_path);
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var_missing() {
        let result = temp_env::with_var(
            CONFIG_PATH_ENV,
            Some("/definitely/not/here/gateflow.yaml"),
            find_config_file,
        );
        assert!(matches!(
            result,
            Err(ConfigError::ExplicitPathMissing { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        let result = in_dir(temp_dir.path(), find_config_file);
        if let Err(ConfigError::ConfigFileNotFound) = result {
            // expected
        } else {
            panic!("Expected ConfigFileNotFound error");
        }
    }

    #[test]
    #[serial]
    fn test_discover_without_file_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();

        let result = in_dir(temp_dir.path(), || discover(None)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_discover_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("stack.yaml");
        fs::write(&path, "project_id: p-123\ngateway_id: edge\n").unwrap();

        let (found, config) = discover(Some(&path)).unwrap().unwrap();
        assert_eq!(found, path);
        assert_eq!(config.project_id.as_deref(), Some("p-123"));
        assert_eq!(config.gateway_id.as_deref(), Some("edge"));
    }

    #[test]
    fn test_load_config_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("gateflow.yaml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(load_config(&path).unwrap(), StackConfig::default());
    }

    #[test]
    fn test_load_config_parse_error_names_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.yaml");
        fs::write(&path, "memory_mb: [not a number\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
