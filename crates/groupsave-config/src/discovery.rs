//! Where GroupSave looks for its TOML files and how they stack.
//!
//! Two files are consulted and merged field by field, the later one winning:
//!
//! 1. the per-user file, `$GROUPSAVE_CONFIG_DIR/config.toml` or
//!    `<platform config dir>/groupsave/config.toml`;
//! 2. `groupsave.toml` in the project directory (the working directory
//!    unless one is given).
//!
//! Command-line flags and `GROUPSAVE_API_URL` are applied on top by the caller.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, GroupSaveConfig, Result};

const PROJECT_FILE: &str = "groupsave.toml";
const USER_FILE: &str = "config.toml";
const APP_DIR: &str = "groupsave";
const CONFIG_DIR_ENV: &str = "GROUPSAVE_CONFIG_DIR";

/// Which of the two files a source refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::User => f.write_str("user"),
            ConfigLayer::Project => f.write_str("project"),
        }
    }
}

/// One file that was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    /// `false` when the file was absent or could not be parsed.
    pub loaded: bool,
}

/// The merged configuration and how it came about.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: GroupSaveConfig,
    /// User layer first, when a user directory could be determined.
    pub sources: Vec<ConfigSource>,
    /// One line per file that exists but was skipped.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that contributed to `config`.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }

    pub fn source(&self, layer: ConfigLayer) -> Option<&ConfigSource> {
        self.sources.iter().find(|s| s.layer == layer)
    }
}

/// Merge the user file and the project file found from `project_dir`.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with the user directory pinned to `config_dir`
/// instead of `GROUPSAVE_CONFIG_DIR` or the platform default.
///
/// A file that fails to read or parse is skipped with a warning; the rest
/// of the configuration still loads.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = match config_dir {
        Some(dir) => Some(dir.join(USER_FILE)),
        None => user_config_path(),
    };
    let project = match project_dir {
        Some(dir) => dir.join(PROJECT_FILE),
        None => PathBuf::from(PROJECT_FILE),
    };

    let layers = user
        .map(|path| (ConfigLayer::User, path))
        .into_iter()
        .chain(std::iter::once((ConfigLayer::Project, project)));

    let mut loaded = LoadedConfig::default();
    for (layer, path) in layers {
        let mut source = ConfigSource {
            layer,
            path,
            loaded: false,
        };
        match read_if_present(&source.path) {
            Ok(Some(partial)) => {
                loaded.config.merge(partial);
                source.loaded = true;
            }
            Ok(None) => {}
            Err(e) => loaded.warnings.push(format!(
                "Failed to load {} config {}: {}",
                layer,
                source.path.display(),
                e
            )),
        }
        loaded.sources.push(source);
    }
    Ok(loaded)
}

/// Parse one file, without discovery or merging.
pub fn load_config_file(path: &Path) -> Result<GroupSaveConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    GroupSaveConfig::from_toml(&text)
}

/// Write `config` to `path`, creating missing directories.
pub fn save_config(config: &GroupSaveConfig, path: &Path) -> Result<()> {
    let write_error = |at: &Path| {
        let at = at.display().to_string();
        move |source: std::io::Error| ConfigError::WriteFile { path: at, source }
    };

    let text = config.to_toml()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_error(dir))?;
    }
    std::fs::write(path, text).map_err(write_error(path))
}

/// The per-user `config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    Some(user_config_dir()?.join(USER_FILE))
}

/// Directory of the per-user file, also home to the log directory.
///
/// A non-empty `GROUPSAVE_CONFIG_DIR` wins over the platform default.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|base| base.join(APP_DIR)),
    }
}

fn read_if_present(path: &Path) -> Result<Option<GroupSaveConfig>> {
    if path.is_file() {
        load_config_file(path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_user_config_path_shape() {
        if std::env::var(CONFIG_DIR_ENV).is_err()
            && let Some(p) = user_config_path()
        {
            assert!(p.ends_with("groupsave/config.toml"));
        }
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_broken_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api\nurl = ").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_nothing_on_disk_gives_defaults() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        assert_eq!(loaded.config, GroupSaveConfig::default());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(
            loaded.source(ConfigLayer::User).unwrap().path,
            user.path().join("config.toml")
        );
        assert_eq!(
            loaded.source(ConfigLayer::Project).unwrap().path,
            project.path().join("groupsave.toml")
        );
    }

    #[test]
    fn test_project_file_overrides_user_file_per_field() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        fs::write(
            user.path().join("config.toml"),
            r#"
[api]
url = "https://user.example/api/"
timeout_secs = 20

[session]
poll_interval_secs = 120
"#,
        )
        .unwrap();
        fs::write(
            project.path().join("groupsave.toml"),
            r#"
[api]
url = "https://project.example/api/"

[cache]
dashboard_ttl_secs = 10
"#,
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        let config = &loaded.config;

        assert_eq!(
            config.api.as_ref().unwrap().url.as_deref(),
            Some("https://project.example/api/")
        );
        assert_eq!(config.api_timeout(), Duration::from_secs(20));
        assert_eq!(config.poll_interval(), Duration::from_secs(120));
        assert_eq!(config.dashboard_ttl(), Duration::from_secs(10));
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_broken_project_file_keeps_user_settings() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[session]\nexpiry_margin_secs = 45\n",
        )
        .unwrap();
        fs::write(project.path().join("groupsave.toml"), "[session\n").unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.config.expiry_margin(), Duration::from_secs(45));
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("project config"));
        assert!(!loaded.source(ConfigLayer::Project).unwrap().loaded);
        assert!(loaded.source(ConfigLayer::User).unwrap().loaded);
    }

    #[test]
    fn test_saved_config_reloads_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = GroupSaveConfig::from_toml("[session]\nexpiry_margin_secs = 45\n").unwrap();

        save_config(&config, &path).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
