//! Server settings, loadable from a YAML file.
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::line_reader::DEFAULT_MAX_LINE_LEN;
use crate::parser::MAX_CONSUMER_LEN;

/// Length of `conclude <u64::MAX> <longest consumer>`, the longest valid
/// command.
pub const MIN_LINE_LEN: usize = "conclude ".len() + 20 + 1 + MAX_CONSUMER_LEN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("max-line-len {0} is below the minimum of {MIN_LINE_LEN}")]
    LineLenTooSmall(usize),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Address to listen on.
    pub listen: IpAddr,
    /// (TCP) port to listen on.
    pub port: u16,
    /// Longest command line accepted, excluding the CRLF.
    pub max_line_len: usize,
    /// How long to wait for open connections to finish after a shutdown
    /// signal.
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            shutdown_grace_secs: 5,
        }
    }
}

impl Config {
    /// Reads settings from a YAML file. Keys left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_line_len < MIN_LINE_LEN {
            return Err(ConfigError::LineLenTooSmall(self.max_line_len));
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
