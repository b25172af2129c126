// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrency-safe record writer.
//!
//! Serialization and the frame write happen under one lock, so concurrent
//! callers never interleave bytes of different frames. The record counter
//! lives outside this lock (see [`crate::encoder::CustomEncoder`]).

use crate::encoder::EncoderError;
use crate::record::AuditRecord;
use crate::sink::{CsvWriter, DelimitedWriter, SinkLayer};
use parking_lot::Mutex;

/// Top of an encoder's stack: binary frames or CSV rows.
enum RecordWriter {
    Delimited(DelimitedWriter<Box<dyn SinkLayer>>),
    Csv(CsvWriter<Box<dyn SinkLayer>>),
}

struct WriterState {
    writer: Option<RecordWriter>,
    poisoned: bool,
}

/// Serializes records onto a sink stack, one whole frame at a time.
pub struct AtomicFrameWriter {
    state: Mutex<WriterState>,
    csv: bool,
}

impl AtomicFrameWriter {
    /// Binary length-delimited output.
    pub fn delimited(sink: Box<dyn SinkLayer>) -> Self {
        Self::with_writer(RecordWriter::Delimited(DelimitedWriter::new(sink)), false)
    }

    /// CSV text output.
    pub fn csv(sink: Box<dyn SinkLayer>) -> Self {
        Self::with_writer(RecordWriter::Csv(CsvWriter::new(sink)), true)
    }

    fn with_writer(writer: RecordWriter, csv: bool) -> Self {
        Self {
            state: Mutex::new(WriterState {
                writer: Some(writer),
                poisoned: false,
            }),
            csv,
        }
    }

    /// Whether this writer emits CSV rows.
    pub fn is_csv(&self) -> bool {
        self.csv
    }

    /// Write one record as a single frame (or row).
    ///
    /// A serialization error leaves the stream untouched. An I/O error may
    /// have left a partial frame behind, so the writer is poisoned and every
    /// later call fails with [`EncoderError::StreamCorrupted`].
    pub fn put_frame(&self, record: &dyn AuditRecord) -> Result<(), EncoderError> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(EncoderError::StreamCorrupted);
        }

        let result = match state.writer.as_mut().ok_or(EncoderError::Closed)? {
            RecordWriter::Delimited(w) => {
                // nothing is written if serialization fails
                record.encode(w.begin_frame())?;
                w.finish_frame().map(|_| ()).map_err(EncoderError::from)
            }
            RecordWriter::Csv(w) => w.write_row(&record.csv_record()).map_err(EncoderError::from),
        };

        if result.is_err() {
            state.poisoned = true;
        }
        result
    }

    /// Write the CSV column names. No-op for binary output.
    pub fn put_csv_header(&self, fields: &[&str]) -> Result<(), EncoderError> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(EncoderError::StreamCorrupted);
        }
        let result = match state.writer.as_mut().ok_or(EncoderError::Closed)? {
            RecordWriter::Csv(w) => w.write_header(fields).map_err(EncoderError::from),
            RecordWriter::Delimited(_) => Ok(()),
        };
        if result.is_err() {
            state.poisoned = true;
        }
        result
    }

    /// Detach the stack so it can be closed. Later writes fail with
    /// [`EncoderError::Closed`].
    pub fn take_sink(&self) -> Result<Box<dyn SinkLayer>, EncoderError> {
        let writer = self.state.lock().writer.take().ok_or(EncoderError::Closed)?;
        let sink = match writer {
            RecordWriter::Delimited(w) => w.into_inner(),
            RecordWriter::Csv(w) => w.into_inner()?,
        };
        Ok(sink)
    }
}
