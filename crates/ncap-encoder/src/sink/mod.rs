// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layered output sinks.
//!
//! # Layer Stack
//!
//! ```text
//! +---------------------------------------------+
//! |  DelimitedWriter (binary) | CsvWriter (text) |
//! +---------------------------------------------+
//! |  GzipSink            (compress = true)       |
//! +---------------------------------------------+
//! |  BufferedSink        (buffer = true)         |
//! +---------------------------------------------+
//! |  FileSink  |  ChannelSink (channel, binary)  |
//! +---------------------------------------------+
//! ```
//!
//! Layers are built bottom-up and closed top-down: every layer flushes into
//! the one it wraps before handing it back.
//!
//! | csv | compress | file name          |
//! |-----|----------|--------------------|
//! | no  | no       | `<name>.ncap`      |
//! | no  | yes      | `<name>.ncap.gz`   |
//! | yes | no       | `<name>.csv`       |
//! | yes | yes      | `<name>.csv.gz`    |

mod delimited;
mod layers;
mod text;

pub use delimited::{
    encode_varint, read_varint, varint_len, DelimitedReader, DelimitedWriter, MAX_FRAME_SIZE,
    MAX_VARINT_LEN,
};
pub use layers::{BufferedSink, ChannelSink, FileSink, GzipSink};
pub use text::CsvWriter;

use crate::encoder::EncoderError;
use crossbeam::channel::Receiver;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default buffered writer size (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Default number of frames a channel sink holds before writers block.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Kind of a sink layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    File,
    Channel,
    Buffer,
    Gzip,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::File => "file",
            Self::Channel => "channel",
            Self::Buffer => "buffer",
            Self::Gzip => "gzip",
        };
        f.write_str(name)
    }
}

/// Result of closing one layer.
pub enum Closed {
    /// The layer that was wrapped, still open.
    Inner(Box<dyn SinkLayer>),
    /// Terminal layer closed; total bytes that reached the destination.
    Done { bytes: u64 },
}

/// One closeable layer of the output stack.
pub trait SinkLayer: Write + Send {
    fn kind(&self) -> LayerKind;

    /// Flush and close this layer, handing back the layer it wrapped.
    fn close(self: Box<Self>) -> io::Result<Closed>;
}

/// Resolved output configuration of one encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub buffer: bool,
    pub compress: bool,
    pub csv: bool,
    pub channel: bool,
    pub out: PathBuf,
    pub block_size: usize,
    pub channel_capacity: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            buffer: false,
            compress: false,
            csv: false,
            channel: false,
            out: PathBuf::from("."),
            block_size: DEFAULT_BLOCK_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl OutputOptions {
    /// Whether binary frames go into a channel instead of a file.
    ///
    /// CSV output always goes to a file.
    pub fn uses_channel(&self) -> bool {
        self.channel && !self.csv
    }

    /// Reject combinations the stack cannot build.
    pub fn validate(&self) -> Result<(), EncoderError> {
        if self.uses_channel() && (self.buffer || self.compress) {
            return Err(EncoderError::ChannelConflict);
        }
        Ok(())
    }

    /// File extension for the configured mode.
    pub fn extension(&self) -> &'static str {
        match (self.csv, self.compress) {
            (true, true) => ".csv.gz",
            (true, false) => ".csv",
            (false, true) => ".ncap.gz",
            (false, false) => ".ncap",
        }
    }

    /// Output file of the named encoder.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.out.join(format!("{}{}", name, self.extension()))
    }
}

/// A freshly built stack, ready to be wrapped by a framer or CSV writer.
pub struct SinkChain {
    /// Topmost layer.
    pub top: Box<dyn SinkLayer>,
    /// Output file, `None` in channel mode.
    pub path: Option<PathBuf>,
    /// Receiving end, channel mode only.
    pub receiver: Option<Receiver<Vec<u8>>>,
}

impl SinkChain {
    /// Build the stack for the named encoder: destination, then buffer,
    /// then compression. Skipped layers leave no gap.
    pub fn build(name: &str, options: &OutputOptions) -> Result<Self, EncoderError> {
        options.validate()?;

        let (mut top, path, receiver) = if options.uses_channel() {
            let (sink, rx) = ChannelSink::bounded(options.channel_capacity);
            let top: Box<dyn SinkLayer> = Box::new(sink);
            (top, None, Some(rx))
        } else {
            let path = options.output_path(name);
            let top: Box<dyn SinkLayer> = Box::new(FileSink::create(&path)?);
            (top, Some(path), None)
        };

        if options.buffer {
            top = Box::new(BufferedSink::new(top, options.block_size));
        }
        if options.compress {
            top = Box::new(GzipSink::new(top));
        }

        Ok(Self {
            top,
            path,
            receiver,
        })
    }
}

/// Layers closed (top-down) and the final destination size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub layers: Vec<LayerKind>,
    pub bytes: u64,
}

/// Close every layer from `top` down to the destination.
pub fn close_chain(top: Box<dyn SinkLayer>) -> io::Result<CloseReport> {
    let mut layers = Vec::new();
    let mut layer = top;
    loop {
        layers.push(layer.kind());
        match layer.close()? {
            Closed::Inner(inner) => layer = inner,
            Closed::Done { bytes } => return Ok(CloseReport { layers, bytes }),
        }
    }
}

/// Whether a path names a gzip container.
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}
