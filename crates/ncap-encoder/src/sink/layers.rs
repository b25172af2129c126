// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concrete sink layers: file, channel, buffer and gzip.

use super::{Closed, LayerKind, SinkLayer};
use crossbeam::channel::{self, Receiver, Sender};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Terminal layer writing into a file.
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Create (or truncate) the file, creating parent directories.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl SinkLayer for FileSink {
    fn kind(&self) -> LayerKind {
        LayerKind::File
    }

    fn close(self: Box<Self>) -> io::Result<Closed> {
        let mut file = self.file;
        file.flush()?;
        file.sync_all()?;
        let bytes = file.metadata()?.len();
        Ok(Closed::Done { bytes })
    }
}

/// Terminal layer pushing every write into a bounded channel.
///
/// Sends block while the channel is full. Closing drops the sender, so
/// consumers drain the remaining frames and then observe disconnection.
pub struct ChannelSink {
    tx: Sender<Vec<u8>>,
    bytes: u64,
}

impl ChannelSink {
    /// Create the sink and its receiving end.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = channel::bounded(capacity);
        (Self { tx, bytes: 0 }, rx)
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.send(buf.to_vec()).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped")
        })?;
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SinkLayer for ChannelSink {
    fn kind(&self) -> LayerKind {
        LayerKind::Channel
    }

    fn close(self: Box<Self>) -> io::Result<Closed> {
        let bytes = self.bytes;
        drop(self.tx);
        Ok(Closed::Done { bytes })
    }
}

/// Block buffering on top of another layer.
pub struct BufferedSink {
    inner: BufWriter<Box<dyn SinkLayer>>,
}

impl BufferedSink {
    pub fn new(inner: Box<dyn SinkLayer>, block_size: usize) -> Self {
        Self {
            inner: BufWriter::with_capacity(block_size, inner),
        }
    }
}

impl Write for BufferedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl SinkLayer for BufferedSink {
    fn kind(&self) -> LayerKind {
        LayerKind::Buffer
    }

    fn close(self: Box<Self>) -> io::Result<Closed> {
        let inner = self.inner.into_inner().map_err(|e| e.into_error())?;
        Ok(Closed::Inner(inner))
    }
}

/// Gzip compression on top of another layer.
pub struct GzipSink {
    inner: GzEncoder<Box<dyn SinkLayer>>,
}

impl GzipSink {
    pub fn new(inner: Box<dyn SinkLayer>) -> Self {
        Self {
            inner: GzEncoder::new(inner, Compression::default()),
        }
    }
}

impl Write for GzipSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl SinkLayer for GzipSink {
    fn kind(&self) -> LayerKind {
        LayerKind::Gzip
    }

    fn close(self: Box<Self>) -> io::Result<Closed> {
        // writes the gzip trailer into the layer below
        let inner = self.inner.finish()?;
        Ok(Closed::Inner(inner))
    }
}
