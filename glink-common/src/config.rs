//! Configuration loading with compiled defaults
//!
//! The core has no required configuration; everything here has a sensible
//! default and may be overridden from a TOML file supplied by the host
//! application.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default event bus capacity (events buffered per subscriber)
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Shared core configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// EventBus channel capacity
    pub event_capacity: usize,
    /// STUN server URLs handed to the peer connection factory
    pub ice_servers: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            ice_servers: vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
            ],
        }
    }
}

impl CoreConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// no path is given. A missing key falls back per-field; a missing or
    /// unparsable file is a configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_path() {
        let config = CoreConfig::load(None).unwrap();
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.ice_servers.len(), 2);
    }

    #[test]
    fn partial_file_falls_back_per_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "event_capacity = 32").unwrap();

        let config = CoreConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.event_capacity, 32);
        assert!(!config.ice_servers.is_empty());
    }

    #[test]
    fn missing_file_is_config_error() {
        let result = CoreConfig::load(Some(Path::new("/nonexistent/glink.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
