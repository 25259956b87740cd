use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Validated runtime configuration, assembled from a TOML file (if
/// any) overridden by CLI flags: mode, view, role, port, peer,
/// camera identifier, density spec.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub view: View,
    pub role: Role,
    pub port: u16,
    pub peer: Ipv4Addr,
    pub camera: String,
    pub density: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mirror,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Pip,
    Split,
}

impl View {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Pip => Self::Split,
            Self::Split => Self::Pip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Client,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Network,
            view: View::Pip,
            role: Role::Server,
            port: 3000,
            peer: Ipv4Addr::new(127, 0, 0, 1),
            camera: "dummy-gradient".to_string(),
            density: String::new(),
        }
    }
}

impl Config {
    /// Load a TOML config file, returning the default configuration
    /// if `path` is `None` or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(?path, "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "configuration loaded");
        Ok(config)
    }

    /// Check configuration bounds before entering any loop: a
    /// non-zero port. An empty density spec is allowed — it signals
    /// "use locale auto-detection", resolved later by
    /// `picturephone_ramp::DensityRamp::auto_detect`.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be in 1..=65535");
        }
        Ok(())
    }

    /// Resolve the configured density spec into a ramp, falling back
    /// to locale auto-detection when the spec is empty.
    pub fn resolve_density(&self) -> picturephone_ramp::DensityRamp {
        if self.density.is_empty() {
            picturephone_ramp::DensityRamp::auto_detect()
        } else {
            picturephone_ramp::DensityRamp::parse(&self.density)
                .unwrap_or_else(|_| picturephone_ramp::DensityRamp::auto_detect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_server_on_loopback() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.peer, Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(config.role, Role::Server);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/picturephone.toml"))).unwrap();
        assert_eq!(config.port, Config::default().port);
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = Config::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }
}
