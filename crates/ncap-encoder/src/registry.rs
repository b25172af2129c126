// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encoder registry.
//!
//! Holds the catalogue, selects the active subset from include/exclude
//! lists and drives the lifecycle of every active encoder.
//!
//! # Selection
//!
//! ```text
//! include = ""           -> whole catalogue
//! include = "A,B"        -> catalogue entries named A or B, catalogue order
//! exclude = "B"          -> first entry named B removed
//! unknown name in either -> RegistryError::UnknownEncoder
//! ```

use crate::config::{ConfigError, EncoderConfig};
use crate::encoder::{CustomEncoder, DestroyReport, EncoderDescriptor, EncoderError};
use crate::encoders;
use crate::packet::Packet;
use crate::record::Header;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid encoder: {0}")]
    UnknownEncoder(String),

    #[error("Custom encoders already initialized")]
    AlreadyInitialized,

    #[error("Encoder {name}: {source}")]
    Encoder {
        name: String,
        #[source]
        source: EncoderError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RegistryError {
    /// Configuration and lifecycle failures must stop the process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::UnknownEncoder(_) | Self::AlreadyInitialized | Self::Config(_) => true,
            Self::Encoder { source, .. } => source.is_fatal(),
        }
    }
}

/// Catalogue plus the set of initialized encoders.
pub struct Registry {
    catalogue: Vec<EncoderDescriptor>,
    names: HashSet<String>,
    active: Vec<Arc<CustomEncoder>>,
    initialized: bool,
}

impl Registry {
    /// Registry over an explicit catalogue.
    pub fn new(catalogue: Vec<EncoderDescriptor>) -> Self {
        let names = catalogue.iter().map(|d| d.name().to_string()).collect();
        Self {
            catalogue,
            names,
            active: Vec::new(),
            initialized: false,
        }
    }

    /// Registry over the built-in catalogue.
    pub fn with_defaults() -> Self {
        Self::new(encoders::catalogue())
    }

    /// Known encoder names.
    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    pub fn catalogue(&self) -> &[EncoderDescriptor] {
        &self.catalogue
    }

    /// Resolve include and exclude lists into the active descriptors.
    ///
    /// Every name is validated before anything is selected. Excluding a
    /// known name that is not selected is a no-op.
    pub fn select(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<&EncoderDescriptor>, RegistryError> {
        for name in include.iter().chain(exclude) {
            if !self.names.contains(name) {
                return Err(RegistryError::UnknownEncoder(name.clone()));
            }
        }

        let mut selected: Vec<&EncoderDescriptor> = if include.is_empty() {
            self.catalogue.iter().collect()
        } else {
            self.catalogue
                .iter()
                .filter(|d| include.iter().any(|name| name == d.name()))
                .collect()
        };

        for name in exclude {
            if let Some(pos) = selected.iter().position(|d| d.name() == name) {
                selected.remove(pos);
            }
        }

        Ok(selected)
    }

    /// Select, initialize and start every configured encoder.
    ///
    /// For each one: build the stack, run the post-init hook, then write the
    /// stream header. Any failure here is fatal for the caller. May only be
    /// called once.
    pub fn init_custom_encoders(&mut self, config: &EncoderConfig) -> Result<(), RegistryError> {
        if self.initialized {
            return Err(RegistryError::AlreadyInitialized);
        }
        config.validate()?;

        let options = config.output_options();
        let selected = self.select(&config.include_list(), &config.exclude_list())?;

        let mut active = Vec::with_capacity(selected.len());
        for descriptor in selected {
            let name = descriptor.name().to_string();
            let wrap = |source| RegistryError::Encoder {
                name: name.clone(),
                source,
            };

            let encoder = CustomEncoder::init(descriptor, &options).map_err(wrap)?;
            encoder.run_post_init().map_err(wrap)?;

            let header = Header::new(
                descriptor.record_type(),
                config.source.clone(),
                config.include_payloads,
            );
            encoder.write_header(&header).map_err(wrap)?;

            tracing::debug!("initialized {} ({})", name, descriptor.record_type());
            active.push(Arc::new(encoder));
        }

        self.active = active;
        self.initialized = true;

        tracing::info!(
            "initialized {} custom encoders | buffer size: {}",
            self.active.len(),
            config.block_size
        );
        Ok(())
    }

    /// Initialized encoders, in catalogue order.
    pub fn active(&self) -> &[Arc<CustomEncoder>] {
        &self.active
    }

    /// Look up an active encoder by name.
    pub fn get(&self, name: &str) -> Option<&Arc<CustomEncoder>> {
        self.active.iter().find(|e| e.name() == name)
    }

    /// Hand a packet to every active encoder.
    ///
    /// Failures do not stop the fan-out; they are returned per encoder.
    pub fn encode(&self, packet: &Packet) -> Vec<(String, EncoderError)> {
        self.active
            .iter()
            .filter_map(|encoder| {
                encoder
                    .encode(packet)
                    .err()
                    .map(|e| (encoder.name().to_string(), e))
            })
            .collect()
    }

    /// Destroy every active encoder, in catalogue order.
    ///
    /// Stops at the first failure, since a failed deinit hook is fatal.
    pub fn destroy_all(&self) -> Result<Vec<DestroyReport>, RegistryError> {
        self.active
            .iter()
            .map(|encoder| {
                encoder.destroy().map_err(|source| RegistryError::Encoder {
                    name: encoder.name().to_string(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Ipv4Layer, Layer};
    use crate::record::{AuditRecord, Flow, RecordType};
    use chrono::Utc;
    use std::net::Ipv4Addr;
    use tempfile::tempdir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn selected(registry: &Registry, include: &[&str], exclude: &[&str]) -> Vec<String> {
        registry
            .select(&names(include), &names(exclude))
            .expect("select")
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    fn noop(name: &str) -> EncoderDescriptor {
        EncoderDescriptor::new(name, RecordType::NetworkFlow, |_: &Packet| {
            None::<Box<dyn AuditRecord>>
        })
    }

    #[test]
    fn test_select_all_by_default() {
        let registry = Registry::with_defaults();
        assert_eq!(
            selected(&registry, &[], &[]),
            vec!["IPv4", "NetworkFlow", "TransportFlow"]
        );
    }

    #[test]
    fn test_select_include_keeps_catalogue_order() {
        let registry = Registry::with_defaults();
        assert_eq!(
            selected(&registry, &["TransportFlow", "IPv4"], &[]),
            vec!["IPv4", "TransportFlow"]
        );
    }

    #[test]
    fn test_select_exclude() {
        let registry = Registry::with_defaults();
        assert_eq!(
            selected(&registry, &[], &["NetworkFlow"]),
            vec!["IPv4", "TransportFlow"]
        );
        // known but not included
        assert_eq!(selected(&registry, &["IPv4"], &["NetworkFlow"]), vec!["IPv4"]);
        assert!(selected(&registry, &["IPv4"], &["IPv4"]).is_empty());
    }

    #[test]
    fn test_select_unknown_names() {
        let registry = Registry::with_defaults();
        let err = registry.select(&names(&["Bogus"]), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid encoder: Bogus");
        assert!(err.is_fatal());

        assert!(matches!(
            registry.select(&[], &names(&["Nope"])),
            Err(RegistryError::UnknownEncoder(n)) if n == "Nope"
        ));
    }

    #[test]
    fn test_exclude_removes_first_match_only() {
        let registry = Registry::new(vec![noop("Dup"), noop("Other"), noop("Dup")]);
        assert_eq!(
            selected(&registry, &[], &["Dup"]),
            vec!["Other", "Dup"]
        );
    }

    #[test]
    fn test_init_writes_files_and_headers() {
        let dir = tempdir().expect("tempdir");
        let config = EncoderConfig::new(dir.path())
            .include("IPv4,NetworkFlow")
            .buffer(false)
            .compression(false)
            .source("test.pcap");

        let mut registry = Registry::with_defaults();
        registry.init_custom_encoders(&config).expect("init");
        assert_eq!(registry.active().len(), 2);
        assert!(registry.get("TransportFlow").is_none());

        let packet = Packet::new(Utc::now(), 60).with_layer(Layer::Ipv4(Ipv4Layer::new(
            Ipv4Addr::new(1, 1, 1, 1),
            Ipv4Addr::new(2, 2, 2, 2),
            6,
        )));
        assert!(registry.encode(&packet).is_empty());
        assert_eq!(registry.get("IPv4").expect("active").num_records(), 1);

        let reports = registry.destroy_all().expect("destroy");
        let summary: Vec<(String, u64)> = reports
            .iter()
            .map(|r| (r.name.clone(), r.records))
            .collect();
        assert_eq!(
            summary,
            vec![("IPv4".to_string(), 1), ("NetworkFlow".to_string(), 1)]
        );
        assert!(dir.path().join("IPv4.ncap").exists());
        assert!(dir.path().join("NetworkFlow.ncap").exists());

        // teardown happens once
        assert!(matches!(
            registry.destroy_all(),
            Err(RegistryError::Encoder {
                source: EncoderError::AlreadyDestroyed,
                ..
            })
        ));
    }

    #[test]
    fn test_init_twice() {
        let dir = tempdir().expect("tempdir");
        let config = EncoderConfig::new(dir.path()).include("IPv4");
        let mut registry = Registry::with_defaults();
        registry.init_custom_encoders(&config).expect("init");

        let err = registry.init_custom_encoders(&config).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyInitialized));
        registry.destroy_all().expect("destroy");
    }

    #[test]
    fn test_channel_with_buffer_is_fatal() {
        let config = EncoderConfig::default().write_chan(true);
        let mut registry = Registry::with_defaults();

        let err = registry.init_custom_encoders(&config).unwrap_err();
        assert!(matches!(err, RegistryError::Config(ConfigError::Invalid(_))));
        assert!(err.is_fatal());
        assert!(registry.active().is_empty());
    }

    #[test]
    fn test_post_init_failure_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let failing = noop("Broken").post_init(|_| Err("no table".into()));
        let mut registry = Registry::new(vec![failing]);

        let err = registry
            .init_custom_encoders(&EncoderConfig::new(dir.path()))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, RegistryError::Encoder { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn test_encode_collects_errors() {
        let dir = tempdir().expect("tempdir");
        let flow = |p: &Packet| -> Option<Box<dyn AuditRecord>> {
            Some(Box::new(Flow::new(
                RecordType::NetworkFlow,
                p.timestamp,
                Ipv4Addr::LOCALHOST,
                Ipv4Addr::LOCALHOST,
                0,
                0,
                0,
                p.length as u64,
            )))
        };
        let mut registry = Registry::new(vec![
            EncoderDescriptor::new("A", RecordType::NetworkFlow, flow),
            EncoderDescriptor::new("B", RecordType::NetworkFlow, flow),
        ]);
        registry
            .init_custom_encoders(&EncoderConfig::new(dir.path()))
            .expect("init");

        // closing one encoder early makes its writes fail
        registry.get("A").expect("A").destroy().expect("destroy A");

        let errors = registry.encode(&Packet::new(Utc::now(), 1));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "A");
        assert!(matches!(errors[0].1, EncoderError::Closed));
        assert_eq!(registry.get("B").expect("B").num_records(), 1);
    }
}
