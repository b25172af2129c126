// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encoder configuration.
//!
//! Supports both programmatic and file-based configuration.
//!
//! ```toml
//! include_encoders = "IPv4,TransportFlow"
//! buffer = true
//! compression = true
//! out = "/var/lib/ncap"
//! ```

use crate::sink::{OutputOptions, DEFAULT_BLOCK_SIZE, DEFAULT_CHANNEL_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration consumed by the encoder registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Comma-separated encoder names to run (empty = all).
    pub include_encoders: String,

    /// Comma-separated encoder names to skip.
    pub exclude_encoders: String,

    /// Buffer output in blocks of `block_size` bytes.
    pub buffer: bool,

    /// Gzip the output.
    pub compression: bool,

    /// Write CSV instead of binary frames.
    pub csv: bool,

    /// Output directory.
    pub out: PathBuf,

    /// Stream binary frames into channels instead of files.
    pub write_chan: bool,

    /// Buffered writer size in bytes.
    pub block_size: usize,

    /// Frames a channel holds before writers block.
    pub channel_capacity: usize,

    /// Capture source recorded in stream headers.
    pub source: String,

    /// Whether records carry packet payloads (stream header flag).
    pub include_payloads: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            include_encoders: String::new(),
            exclude_encoders: String::new(),
            buffer: true,
            compression: true,
            csv: false,
            out: PathBuf::from("."),
            write_chan: false,
            block_size: DEFAULT_BLOCK_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            source: String::new(),
            include_payloads: false,
        }
    }
}

impl EncoderConfig {
    /// Defaults writing into `out`.
    pub fn new<P: AsRef<Path>>(out: P) -> Self {
        Self {
            out: out.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.write_chan && !self.csv && (self.buffer || self.compression) {
            return Err(ConfigError::Invalid(
                "buffering or compression cannot be activated when running using write_chan"
                    .into(),
            ));
        }
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be positive".into()));
        }
        if self.write_chan && self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Set the include list.
    pub fn include(mut self, names: impl Into<String>) -> Self {
        self.include_encoders = names.into();
        self
    }

    /// Set the exclude list.
    pub fn exclude(mut self, names: impl Into<String>) -> Self {
        self.exclude_encoders = names.into();
        self
    }

    pub fn buffer(mut self, enable: bool) -> Self {
        self.buffer = enable;
        self
    }

    pub fn compression(mut self, enable: bool) -> Self {
        self.compression = enable;
        self
    }

    pub fn csv(mut self, enable: bool) -> Self {
        self.csv = enable;
        self
    }

    pub fn write_chan(mut self, enable: bool) -> Self {
        self.write_chan = enable;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Set the capture source recorded in headers.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Include list, split on commas. Empty tokens are dropped, so an unset
    /// flag means "no include filter".
    pub fn include_list(&self) -> Vec<String> {
        split_names(&self.include_encoders)
    }

    /// Exclude list, split on commas.
    pub fn exclude_list(&self) -> Vec<String> {
        split_names(&self.exclude_encoders)
    }

    /// Output options shared by every encoder.
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            buffer: self.buffer,
            compress: self.compression,
            csv: self.csv,
            channel: self.write_chan,
            out: self.out.clone(),
            block_size: self.block_size,
            channel_capacity: self.channel_capacity,
        }
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_split_names() {
        let config = EncoderConfig::default().include("IPv4, NetworkFlow,,");
        assert_eq!(config.include_list(), vec!["IPv4", "NetworkFlow"]);
        assert!(EncoderConfig::default().include_list().is_empty());
        assert!(EncoderConfig::default().include("").include_list().is_empty());
    }

    #[test]
    fn test_channel_with_buffer_rejected() {
        let config = EncoderConfig::default().write_chan(true);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = config.buffer(false).compression(false);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = EncoderConfig::default().block_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ncap.toml");
        std::fs::write(
            &path,
            "include_encoders = \"IPv4\"\ncsv = true\nout = \"/tmp/ncap\"\nblock_size = 4096\n",
        )
        .expect("write");

        let config = EncoderConfig::from_file(&path).expect("load");
        assert_eq!(config.include_list(), vec!["IPv4"]);
        assert!(config.csv);
        assert!(config.buffer);
        assert_eq!(config.out, PathBuf::from("/tmp/ncap"));
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ncap.toml");
        std::fs::write(&path, "write_chan = true\n").expect("write");

        assert!(matches!(
            EncoderConfig::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EncoderConfig::new("/data").include("IPv4").source("eth0");
        let text = toml::to_string_pretty(&config).expect("serialize");
        assert!(text.contains("include_encoders = \"IPv4\""));

        let parsed: EncoderConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_output_options() {
        let options = EncoderConfig::new("/data")
            .buffer(false)
            .csv(true)
            .output_options();
        assert!(!options.buffer);
        assert!(options.compress);
        assert!(options.csv);
        assert_eq!(options.out, PathBuf::from("/data"));
    }
}
