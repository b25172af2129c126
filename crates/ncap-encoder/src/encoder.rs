// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Custom encoders.
//!
//! A [`CustomEncoder`] runs a decode handler on every packet and writes the
//! resulting audit records through its own sink stack.
//!
//! # Lifecycle
//!
//! ```text
//! init ──> post-init hook ──> header ──> encode* ──> deinit hook ──> close layers
//! ```

use crate::atomic::AtomicFrameWriter;
use crate::packet::Packet;
use crate::record::{AuditRecord, Header, RecordError, RecordType};
use crate::sink::{close_chain, LayerKind, OutputOptions, SinkChain};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error type returned by lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Turns a packet into at most one audit record.
pub type DecodeHandler = Arc<dyn Fn(&Packet) -> Option<Box<dyn AuditRecord>> + Send + Sync>;

/// Setup or teardown hook run against the live encoder.
pub type LifecycleHook = Arc<dyn Fn(&CustomEncoder) -> Result<(), HookError> + Send + Sync>;

/// Lifecycle stage of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PostInit,
    Deinit,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostInit => f.write_str("post-init"),
            Self::Deinit => f.write_str("deinit"),
        }
    }
}

/// Encoder errors.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Buffering or compression cannot be activated when writing into a channel")]
    ChannelConflict,

    #[error("{stage} hook failed: {source}")]
    Hook {
        stage: HookStage,
        #[source]
        source: HookError,
    },

    #[error("Output stream corrupted by an earlier write failure")]
    StreamCorrupted,

    #[error("Encoder closed")]
    Closed,

    #[error("Encoder already destroyed")]
    AlreadyDestroyed,
}

impl EncoderError {
    /// Configuration and hook failures must stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ChannelConflict | Self::Hook { .. })
    }
}

/// Static registration record of an encoder.
#[derive(Clone)]
pub struct EncoderDescriptor {
    name: String,
    record_type: RecordType,
    handler: DecodeHandler,
    post_init: Option<LifecycleHook>,
    deinit: Option<LifecycleHook>,
}

impl EncoderDescriptor {
    /// Create a descriptor without hooks.
    pub fn new<F>(name: impl Into<String>, record_type: RecordType, handler: F) -> Self
    where
        F: Fn(&Packet) -> Option<Box<dyn AuditRecord>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            record_type,
            handler: Arc::new(handler),
            post_init: None,
            deinit: None,
        }
    }

    /// Set the hook run right after the sink stack is built.
    pub fn post_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CustomEncoder) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post_init = Some(Arc::new(hook));
        self
    }

    /// Set the hook run before the sink stack is closed.
    pub fn deinit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CustomEncoder) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.deinit = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }
}

impl fmt::Debug for EncoderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderDescriptor")
            .field("name", &self.name)
            .field("record_type", &self.record_type)
            .field("post_init", &self.post_init.is_some())
            .field("deinit", &self.deinit.is_some())
            .finish()
    }
}

/// Outcome of [`CustomEncoder::destroy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyReport {
    /// Encoder name.
    pub name: String,
    /// Output file, `None` in channel mode.
    pub path: Option<PathBuf>,
    /// Final size of the output.
    pub bytes: u64,
    /// Records written over the encoder's lifetime.
    pub records: u64,
    /// Layers closed, top-down.
    pub layers: Vec<LayerKind>,
}

/// A live encoder bound to one sink stack.
pub struct CustomEncoder {
    name: String,
    record_type: RecordType,
    handler: DecodeHandler,
    post_init: Option<LifecycleHook>,
    deinit: Option<LifecycleHook>,
    options: OutputOptions,
    writer: AtomicFrameWriter,
    path: Option<PathBuf>,
    receiver: Mutex<Option<Receiver<Vec<u8>>>>,
    num_records: AtomicU64,
    destroyed: AtomicBool,
}

impl CustomEncoder {
    /// Build the sink stack for a descriptor.
    ///
    /// Fails with [`EncoderError::ChannelConflict`] when channel output is
    /// combined with buffering or compression. Hooks are not run here.
    pub fn init(
        descriptor: &EncoderDescriptor,
        options: &OutputOptions,
    ) -> Result<Self, EncoderError> {
        if options.csv && options.channel {
            tracing::warn!(
                "{}: channel output ignored, CSV is always written to a file",
                descriptor.name
            );
        }

        let chain = SinkChain::build(&descriptor.name, options)?;
        let writer = if options.csv {
            AtomicFrameWriter::csv(chain.top)
        } else {
            AtomicFrameWriter::delimited(chain.top)
        };

        Ok(Self {
            name: descriptor.name.clone(),
            record_type: descriptor.record_type,
            handler: Arc::clone(&descriptor.handler),
            post_init: descriptor.post_init.clone(),
            deinit: descriptor.deinit.clone(),
            options: options.clone(),
            writer,
            path: chain.path,
            receiver: Mutex::new(chain.receiver),
            num_records: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Run the post-init hook, if any.
    pub fn run_post_init(&self) -> Result<(), EncoderError> {
        match &self.post_init {
            Some(hook) => hook(self).map_err(|source| EncoderError::Hook {
                stage: HookStage::PostInit,
                source,
            }),
            None => Ok(()),
        }
    }

    /// Write the stream header: CSV column names, or a binary header frame.
    pub fn write_header(&self, header: &Header) -> Result<(), EncoderError> {
        if self.writer.is_csv() {
            self.writer.put_csv_header(self.record_type.csv_header())
        } else {
            self.writer.put_frame(header)
        }
    }

    /// Decode a packet and write the resulting record, if any.
    ///
    /// A handler returning `None` is not an error. Safe to call from many
    /// threads at once.
    pub fn encode(&self, packet: &Packet) -> Result<(), EncoderError> {
        match (self.handler)(packet) {
            Some(record) => self.write_record(record.as_ref()),
            None => Ok(()),
        }
    }

    /// Write one record and count it once the frame is on the stream.
    pub fn write_record(&self, record: &dyn AuditRecord) -> Result<(), EncoderError> {
        self.writer.put_frame(record)?;
        self.num_records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Run the deinit hook, then close compressor, buffer and destination.
    ///
    /// Must be called once, after the packet source is drained. A second
    /// call fails with [`EncoderError::AlreadyDestroyed`].
    pub fn destroy(&self) -> Result<DestroyReport, EncoderError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(EncoderError::AlreadyDestroyed);
        }

        if let Some(hook) = &self.deinit {
            hook(self).map_err(|source| EncoderError::Hook {
                stage: HookStage::Deinit,
                source,
            })?;
        }

        let report = close_chain(self.writer.take_sink()?)?;
        let records = self.num_records();

        tracing::info!(
            "closed {} ({} records, {} bytes, layers: {})",
            self.path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("{} channel", self.name)),
            records,
            report.bytes,
            report
                .layers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" > ")
        );

        Ok(DestroyReport {
            name: self.name.clone(),
            path: self.path.clone(),
            bytes: report.bytes,
            records,
            layers: report.layers,
        })
    }

    /// Hand out the receiving end of the frame stream.
    ///
    /// Channel mode only, and only once: the encoder keeps no receiver of
    /// its own, so once the consumer drops it further writes fail with
    /// `BrokenPipe` instead of blocking on a full channel.
    pub fn take_channel(&self) -> Option<Receiver<Vec<u8>>> {
        self.receiver.lock().take()
    }

    /// Records written so far.
    pub fn num_records(&self) -> u64 {
        self.num_records.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    /// Output file, `None` in channel mode.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for CustomEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEncoder")
            .field("name", &self.name)
            .field("record_type", &self.record_type)
            .field("path", &self.path)
            .field("num_records", &self.num_records())
            .finish()
    }
}
