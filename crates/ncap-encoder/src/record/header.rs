// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream header record, written once before any data record.
//!
//! # Wire Format
//!
//! ```text
//! created (12) | input_source (u16 + var) | type (2)
//! version (u16 + var) | contains_payloads (1)
//! ```

use super::{
    ensure_consumed, format_timestamp, read_string, read_timestamp, write_str, write_timestamp,
    AuditRecord, RecordError, RecordType,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};

/// Stream metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Stream creation time.
    pub created: DateTime<Utc>,
    /// Capture source (interface or input file).
    pub input_source: String,
    /// Type of the data records that follow.
    pub record_type: RecordType,
    /// Version of the encoder that wrote the stream.
    pub version: String,
    /// Whether records carry packet payloads.
    pub contains_payloads: bool,
}

impl Header {
    /// Header for a new stream created now.
    pub fn new(
        record_type: RecordType,
        input_source: impl Into<String>,
        contains_payloads: bool,
    ) -> Self {
        Self {
            created: Utc::now(),
            input_source: input_source.into(),
            record_type,
            version: env!("CARGO_PKG_VERSION").to_string(),
            contains_payloads,
        }
    }

    /// Decode from the first frame of a stream.
    pub fn decode(data: &[u8]) -> Result<Self, RecordError> {
        let mut r = data;
        let created = read_timestamp(&mut r)?;
        let input_source = read_string(&mut r)?;
        let record_type = RecordType::from_code(r.read_u16::<LittleEndian>()?)?;
        let version = read_string(&mut r)?;
        let contains_payloads = r.read_u8()? != 0;
        ensure_consumed(r)?;

        Ok(Self {
            created,
            input_source,
            record_type,
            version,
            contains_payloads,
        })
    }
}

impl AuditRecord for Header {
    fn record_type(&self) -> RecordType {
        RecordType::Header
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), RecordError> {
        write_timestamp(buf, &self.created)?;
        write_str(buf, "input_source", &self.input_source)?;
        buf.write_u16::<LittleEndian>(self.record_type.code())?;
        write_str(buf, "version", &self.version)?;
        buf.write_u8(u8::from(self.contains_payloads))?;
        Ok(())
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            format_timestamp(&self.created),
            self.input_source.clone(),
            self.record_type.name().to_string(),
            self.version.clone(),
            self.contains_payloads.to_string(),
        ]
    }
}
