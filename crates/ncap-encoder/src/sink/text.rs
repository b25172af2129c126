// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tabular text (CSV) output.

use std::io::{self, Write};

/// Writes a header row and one comma-delimited row per record.
pub struct CsvWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(inner),
        }
    }

    /// Write the column names.
    pub fn write_header(&mut self, fields: &[&str]) -> csv::Result<()> {
        self.inner.write_record(fields)
    }

    /// Write one record row.
    pub fn write_row(&mut self, fields: &[String]) -> csv::Result<()> {
        self.inner.write_record(fields)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Flush pending rows and unwrap the underlying sink.
    pub fn into_inner(self) -> io::Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_then_rows() {
        let mut writer = CsvWriter::new(Vec::new());
        writer.write_header(&["Timestamp", "SrcIP"]).expect("header");
        writer
            .write_row(&["t0".to_string(), "10.0.0.1".to_string()])
            .expect("row");
        writer
            .write_row(&["t1".to_string(), "(1-2-ab)(3-4-)".to_string()])
            .expect("row");

        let bytes = writer.into_inner().expect("into_inner");
        assert_eq!(
            String::from_utf8(bytes).expect("utf8"),
            "Timestamp,SrcIP\nt0,10.0.0.1\nt1,(1-2-ab)(3-4-)\n"
        );
    }
}
