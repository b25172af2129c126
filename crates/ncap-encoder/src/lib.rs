// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ncap Custom Encoders
//!
//! Turn decoded packets into audit records and persist them through a
//! configurable sink stack:
//! - Length-delimited binary frames (`.ncap`) or CSV rows (`.csv`)
//! - Optional block buffering and gzip compression
//! - In-memory channel streaming for binary frames
//!
//! # Quick Start
//!
//! ```no_run
//! use ncap_encoder::{EncoderConfig, Registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EncoderConfig::new("/tmp/ncap").include("IPv4,TransportFlow");
//!
//! let mut registry = Registry::with_defaults();
//! registry.init_custom_encoders(&config)?;
//!
//! // for every decoded packet:
//! // registry.encode(&packet);
//!
//! for report in registry.destroy_all()? {
//!     println!("{}: {} records", report.name, report.records);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Output Modes
//!
//! | Mode | File | Framing |
//! |------|------|---------|
//! | binary | `<name>.ncap[.gz]` | header frame + record frames |
//! | csv | `<name>.csv[.gz]` | header row + rows |
//! | channel | none | same frames as binary, one message each |

pub mod atomic;
pub mod config;
pub mod encoder;
pub mod encoders;
pub mod packet;
pub mod reader;
pub mod record;
pub mod registry;
pub mod sink;

pub use atomic::AtomicFrameWriter;
pub use config::{ConfigError, EncoderConfig};
pub use encoder::{CustomEncoder, DestroyReport, EncoderDescriptor, EncoderError, HookStage};
pub use packet::{Layer, Packet};
pub use reader::{NcapReader, ReadError};
pub use record::{AnyRecord, AuditRecord, Header, RecordError, RecordType};
pub use registry::{Registry, RegistryError};
pub use sink::{OutputOptions, SinkLayer};
