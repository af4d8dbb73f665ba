//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Port the plugin UI connects to.
pub const DEFAULT_PORT: u16 = 3055;

/// Runtime settings of a bridge server.
///
/// Artifact directories are relative to `root` unless absolute.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address. Port 0 picks a free port.
    pub bind: SocketAddr,
    /// Base directory for every write.
    pub root: PathBuf,
    /// Where exported images go.
    pub images_dir: PathBuf,
    /// Where the design metadata file goes.
    pub data_dir: PathBuf,
    /// Name of the design metadata file, overwritten on every export.
    pub design_file: String,
}

impl ServerConfig {
    /// Default layout under `root`, listening on localhost.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn images_path(&self) -> PathBuf {
        self.root.join(&self.images_dir)
    }

    pub fn data_path(&self) -> PathBuf {
        self.root.join(&self.data_dir)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            root: PathBuf::from("."),
            images_dir: PathBuf::from("images"),
            data_dir: PathBuf::from("data"),
            design_file: "design-data.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), 3055);
        assert!(config.bind.ip().is_loopback());
        assert_eq!(config.images_path(), PathBuf::from("./images"));
        assert_eq!(config.data_path(), PathBuf::from("./data"));
        assert_eq!(config.design_file, "design-data.json");
    }

    #[test]
    fn test_with_root() {
        let config = ServerConfig::with_root("/tmp/site");
        assert_eq!(config.images_path(), PathBuf::from("/tmp/site/images"));
    }
}
