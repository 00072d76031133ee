//! Bridge configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux/macOS: `~/.config/shellbridge/bridge.toml`
//! - Windows: `%APPDATA%/shellbridge/bridge.toml`
//!
//! The file is created on first run with a generated shared secret; command
//! line flags override individual values per invocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Listening host for remote agent connections.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret the remote agent must present.
    #[serde(default)]
    pub api_key: String,

    /// Driving CLI launched after a remote agent authenticates.
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Driving-CLI launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Program to launch.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments passed before the working-directory argument.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_program() -> String {
    "claude".into()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: String::new(),
            runner: RunnerConfig::default(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from `path`, or the platform default location.
    ///
    /// A missing file is created with defaults. A missing or empty shared
    /// secret is replaced with a generated one and written back, so the
    /// bridge never listens with a blank credential.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_owned(),
            None => config_path()?,
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<BridgeConfig>(&content)?
        } else {
            BridgeConfig::default()
        };

        if config.api_key.is_empty() {
            config.api_key = uuid::Uuid::new_v4().to_string();
            config.save(&path)?;
            tracing::info!(path = %path.display(), "generated shared secret");
        }

        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix (contains the shared secret).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| anyhow::anyhow!("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("shellbridge")
            .join("bridge.toml"))
    }

    #[cfg(not(windows))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("shellbridge")
            .join("bridge.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_creates_file_with_generated_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let config = BridgeConfig::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert!(!config.api_key.is_empty());
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.runner.program, "claude");
    }

    #[test]
    fn loaded_secret_is_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let first = BridgeConfig::load(Some(&path)).unwrap();
        let second = BridgeConfig::load(Some(&path)).unwrap();
        assert_eq!(first.api_key, second.api_key);
    }

    #[test]
    fn partial_file_fills_defaults_and_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "port = 9999\napi_key = \"abc\"\n").unwrap();

        let config = BridgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn blank_secret_in_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "api_key = \"\"\n").unwrap();

        let config = BridgeConfig::load(Some(&path)).unwrap();
        assert!(!config.api_key.is_empty());

        // And the regenerated secret was persisted.
        let reloaded = BridgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_key, reloaded.api_key);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        BridgeConfig::load(Some(&path)).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let mut config = BridgeConfig::default();
        config.api_key = "secret".into();
        config.runner.program = "other-cli".into();
        config.runner.args = vec!["--verbose".into()];
        config.save(&path).unwrap();

        let loaded = BridgeConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.api_key, "secret");
        assert_eq!(loaded.runner.program, "other-cli");
        assert_eq!(loaded.runner.args, vec!["--verbose".to_string()]);
    }
}
