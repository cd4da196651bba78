use crate::core::aton::{DEFAULT_PORT, PORT_ENV_VAR};
use crate::core::error::*;

use log::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverOptions {
    pub port: u16,
    pub aovs_enabled: bool,
    pub multi_frame_enabled: bool,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        ReceiverOptions {
            port: default_port(),
            aovs_enabled: false,
            multi_frame_enabled: false,
        }
    }
}

impl ReceiverOptions {
    pub fn new() -> Self {
        ReceiverOptions::default()
    }

    pub fn from_json_str(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| AtonError::config(path, e.to_string()))?;
        let options =
            Self::from_json_str(&text).map_err(|e| AtonError::config(path, e.to_string()))?;
        debug!("Loaded {:?} from {}", options, path.display());
        return Ok(options);
    }

    pub fn to_json(&self) -> String {
        // plain fields; serialization cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// `ATON_PORT` if set to a valid port, otherwise 9201.
pub fn default_port() -> u16 {
    parse_port(std::env::var(PORT_ENV_VAR).ok().as_deref())
}

pub fn parse_port(value: Option<&str>) -> u16 {
    match value.map(|s| s.trim()) {
        Some(s) if !s.is_empty() => match s.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                warn!("Ignoring {}={:?}: not a port number.", PORT_ENV_VAR, s);
                DEFAULT_PORT
            }
        },
        _ => DEFAULT_PORT,
    }
}
