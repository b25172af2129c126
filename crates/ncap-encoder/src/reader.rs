// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader for `.ncap` and `.ncap.gz` containers.
//!
//! A container is a header frame followed by zero or more record frames,
//! each a varint length and a payload.

use crate::record::{AnyRecord, Header, RecordError, RecordType};
use crate::sink::{is_gzip_path, DelimitedReader};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Container read errors.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Stream has no header frame")]
    MissingHeader,
}

/// Sequential reader over one container.
pub struct NcapReader<R: Read> {
    frames: DelimitedReader<R>,
    header: Header,
    frames_read: u64,
}

impl NcapReader<Box<dyn Read + Send>> {
    /// Open a container file, decompressing `.gz` files on the fly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let inner: Box<dyn Read + Send> = if is_gzip_path(path) {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Self::from_reader(inner)
    }
}

impl<R: Read> NcapReader<R> {
    /// Read the header frame from an uncompressed stream.
    pub fn from_reader(inner: R) -> Result<Self, ReadError> {
        let mut frames = DelimitedReader::new(inner);
        let data = frames.next_frame()?.ok_or(ReadError::MissingHeader)?;
        let header = Header::decode(&data)?;

        tracing::debug!(
            "opened {} stream from {} (v{})",
            header.record_type,
            header.input_source,
            header.version
        );

        Ok(Self {
            frames,
            header,
            frames_read: 0,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Record type announced by the header.
    pub fn record_type(&self) -> RecordType {
        self.header.record_type
    }

    /// Raw payload of the next record frame.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        let frame = self.frames.next_frame()?;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    /// Decode the next record. `None` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<AnyRecord>, ReadError> {
        match self.next_frame()? {
            Some(data) => Ok(Some(AnyRecord::decode(self.record_type(), &data)?)),
            None => Ok(None),
        }
    }

    /// Record frames read so far (the header excluded).
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Iterate over the remaining records.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }
}

/// Iterator returned by [`NcapReader::records`].
pub struct Records<'a, R: Read> {
    reader: &'a mut NcapReader<R>,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<AnyRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AuditRecord, Flow};
    use crate::sink::DelimitedWriter;
    use chrono::Utc;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::net::Ipv4Addr;
    use tempfile::tempdir;

    fn stream(records: &[Flow]) -> Vec<u8> {
        let mut writer = DelimitedWriter::new(Vec::new());
        let mut buf = Vec::new();
        Header::new(RecordType::TransportFlow, "eth0", false)
            .encode(&mut buf)
            .expect("encode header");
        writer.put_record(&buf).expect("header frame");
        for record in records {
            buf.clear();
            record.encode(&mut buf).expect("encode");
            writer.put_record(&buf).expect("frame");
        }
        writer.into_inner()
    }

    fn flow(port: u16) -> Flow {
        Flow::new(
            RecordType::TransportFlow,
            Utc::now(),
            Ipv4Addr::new(10, 1, 1, 1),
            Ipv4Addr::new(10, 1, 1, 2),
            port,
            80,
            6,
            512,
        )
    }

    #[test]
    fn test_read_records() {
        let data = stream(&[flow(1), flow(2)]);
        let mut reader = NcapReader::from_reader(data.as_slice()).expect("open");
        assert_eq!(reader.record_type(), RecordType::TransportFlow);
        assert_eq!(reader.header().input_source, "eth0");

        let ports: Vec<u16> = reader
            .records()
            .map(|r| match r.expect("record") {
                AnyRecord::Flow(f) => f.src_port,
                other => panic!("unexpected record {:?}", other),
            })
            .collect();
        assert_eq!(ports, vec![1, 2]);
        assert_eq!(reader.frames_read(), 2);
    }

    #[test]
    fn test_empty_stream() {
        let err = NcapReader::from_reader(&[][..]).err().expect("error");
        assert!(matches!(err, ReadError::MissingHeader));
    }

    #[test]
    fn test_truncated_record() {
        let mut data = stream(&[flow(1)]);
        data.truncate(data.len() - 3);

        let mut reader = NcapReader::from_reader(data.as_slice()).expect("open");
        assert!(matches!(reader.next_record(), Err(ReadError::Io(_))));
    }

    #[test]
    fn test_open_gzip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("TransportFlow.ncap.gz");

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&stream(&[flow(9)])).expect("compress");
        std::fs::write(&path, gz.finish().expect("finish")).expect("write");

        let mut reader = NcapReader::open(&path).expect("open");
        let record = reader.next_record().expect("read").expect("record");
        assert_eq!(record.as_record().record_type(), RecordType::TransportFlow);
        assert!(reader.next_record().expect("read").is_none());
    }
}
