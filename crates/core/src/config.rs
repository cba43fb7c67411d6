//! Configuration management for the Prompt Iteration Assistant.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.pia/config.yaml)
//!
//! The configuration is workspace-centric, with prompt documents and the
//! config file stored in `.pia/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the workspace state directory.
pub const PIA_DIR: &str = ".pia";

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the workspace root (contains .pia/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit `# Role` headings when flattening messages to instruct text
    pub include_role_headers: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OutputConfig {
    #[serde(rename = "includeRoleHeaders")]
    include_role_headers: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
            include_role_headers: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `PIA_WORKSPACE`: Override workspace path
    /// - `PIA_CONFIG`: Path to config file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use pia_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], but an explicit workspace or config file
    /// wins over `PIA_WORKSPACE` / `PIA_CONFIG`. The config file is read
    /// from the resolved location, and an explicit workspace also wins over
    /// its `workspace.path`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();
        let explicit_workspace = workspace.clone();

        let workspace =
            workspace.or_else(|| std::env::var_os("PIA_WORKSPACE").map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("PIA_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.pia_dir().join("config.yaml"));

        if config_path.exists() {
            tracing::debug!("Loading config file {:?}", config_path);
            config = config.merge_yaml(&config_path)?;
            if let Some(workspace) = explicit_workspace {
                config.workspace = workspace;
            }
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = LogFormat::parse(&format).ok_or_else(|| {
                    AppError::Config(format!(
                        "Unknown log format: {}. Supported: pretty, json",
                        format
                    ))
                })?;
            }
        }

        if let Some(include) = config_file.output.and_then(|o| o.include_role_headers) {
            result.include_role_headers = include;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the config file and the
    /// environment.
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .pia directory.
    pub fn pia_dir(&self) -> PathBuf {
        self.workspace.join(PIA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.include_role_headers);
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_pia_dir() {
        let config = AppConfig::default();
        assert!(config.pia_dir().ends_with(".pia"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(None, true, false);

        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_explicit_level_beats_verbose() {
        let overridden =
            AppConfig::default().with_overrides(Some("trace".into()), true, false);
        assert_eq!(overridden.log_level, Some("trace".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let yaml = r#"
logging:
  level: info
  color: false
  format: json
output:
  includeRoleHeaders: false
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.log_level, Some("info".to_string()));
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
        assert!(!merged.include_role_headers);
    }

    #[test]
    fn test_merge_empty_yaml() {
        let merged = AppConfig::default().merge_yaml_str("").unwrap();
        assert!(merged.include_role_headers);
    }

    #[test]
    fn test_merge_unknown_log_format() {
        let yaml = "logging:\n  format: xml\n";
        assert!(AppConfig::default().merge_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_load_from_explicit_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(PIA_DIR)).unwrap();
        std::fs::write(
            dir.path().join(PIA_DIR).join("config.yaml"),
            "output:\n  includeRoleHeaders: false\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, dir.path());
        assert!(!config.include_role_headers);
    }

    #[test]
    fn test_explicit_workspace_beats_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(PIA_DIR)).unwrap();
        std::fs::write(
            dir.path().join(PIA_DIR).join("config.yaml"),
            "workspace:\n  path: /srv/elsewhere\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, dir.path());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load_from(Some(dir.path().join("nope")), None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_load_from_missing_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load_from(
            Some(dir.path().to_path_buf()),
            Some(dir.path().join("absent.yaml")),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_merge_yaml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "workspace:\n  path: /srv/prompts\n").unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.workspace, PathBuf::from("/srv/prompts"));
    }
}
