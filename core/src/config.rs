use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_BATCH_FILES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat channel listener.
    pub listen: SocketAddr,
    /// Upload gateway listener.
    pub upload_listen: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Files accepted by one `/upload/multiple` request.
    pub max_batch_files: usize,
    /// Keep only the newest N messages. Unset keeps everything.
    pub backlog_capacity: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: SocketAddr::from(([0, 0, 0, 0], 8075)),
            upload_listen: SocketAddr::from(([0, 0, 0, 0], 8076)),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_batch_files: DEFAULT_MAX_BATCH_FILES,
            backlog_capacity: None,
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str, origin: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|source| RelayError::ConfigParse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| RelayError::ConfigIo {
            path: origin.clone(),
            source,
        })?;
        Self::from_toml(&raw, &origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.listen.port(), 8075);
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.max_batch_files, 10);
        assert_eq!(cfg.backlog_capacity, None);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = Config::from_toml(
            "listen = \"127.0.0.1:9000\"\nbacklog_capacity = 500\n",
            "inline",
        )
        .unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.backlog_capacity, Some(500));
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn bad_toml_is_an_error() {
        let err = Config::from_toml("listen = 12", "inline").unwrap_err();
        assert!(matches!(err, RelayError::ConfigParse { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "max_upload_bytes = 1024\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().max_upload_bytes, 1024);
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(RelayError::ConfigIo { .. })
        ));
    }
}
