// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Audit record model.
//!
//! Every record knows its [`RecordType`], its binary wire form (used inside
//! delimited frames) and its tabular CSV form.
//!
//! # Wire Conventions
//!
//! ```text
//! integers   little-endian, fixed width
//! timestamp  secs (i64) | nanos (u32)
//! bytes/str  len (u16) | data (var)
//! lists      count (u16) | item[]
//! ```

pub mod flow;
pub mod header;
pub mod ipv4;

pub use flow::Flow;
pub use header::Header;
pub use ipv4::{Ipv4, Ipv4Option};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Opening marker of a nested sub-record in CSV output.
pub const BEGIN: &str = "(";

/// Field separator inside a nested sub-record.
pub const SEPARATOR: &str = "-";

/// Closing marker of a nested sub-record.
pub const END: &str = ")";

/// Timestamp layout used for CSV output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Record encoding errors.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown record type code: {0}")]
    UnknownType(u16),

    #[error("Unexpected record type: {0}")]
    UnexpectedType(RecordType),

    #[error("Field `{field}` too long: {len} bytes")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("Invalid timestamp: {secs}s {nanos}ns")]
    InvalidTimestamp { secs: i64, nanos: u32 },

    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
}

/// Kind of audit record carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// Stream header.
    Header,
    /// IPv4 layer.
    Ipv4,
    /// Aggregated host-to-host flow.
    NetworkFlow,
    /// Aggregated port-to-port flow.
    TransportFlow,
}

const FLOW_HEADER: &[&str] = &[
    "TimestampFirst",
    "TimestampLast",
    "SrcIP",
    "DstIP",
    "SrcPort",
    "DstPort",
    "Protocol",
    "NumPackets",
    "TotalSize",
    "Duration",
];

impl RecordType {
    /// Stable numeric code used on the wire.
    pub fn code(self) -> u16 {
        match self {
            Self::Header => 0,
            Self::Ipv4 => 1,
            Self::NetworkFlow => 2,
            Self::TransportFlow => 3,
        }
    }

    /// Resolve a wire code.
    pub fn from_code(code: u16) -> Result<Self, RecordError> {
        match code {
            0 => Ok(Self::Header),
            1 => Ok(Self::Ipv4),
            2 => Ok(Self::NetworkFlow),
            3 => Ok(Self::TransportFlow),
            other => Err(RecordError::UnknownType(other)),
        }
    }

    /// Human readable type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => "NC_Header",
            Self::Ipv4 => "NC_IPv4",
            Self::NetworkFlow => "NC_NetworkFlow",
            Self::TransportFlow => "NC_TransportFlow",
        }
    }

    /// Column names of the CSV form.
    pub fn csv_header(self) -> &'static [&'static str] {
        match self {
            Self::Header => &[
                "Created",
                "InputSource",
                "Type",
                "Version",
                "ContainsPayloads",
            ],
            Self::Ipv4 => &[
                "Timestamp",
                "Version",
                "IHL",
                "TOS",
                "Length",
                "Id",
                "Flags",
                "FragOffset",
                "TTL",
                "Protocol",
                "Checksum",
                "SrcIP",
                "DstIP",
                "Padding",
                "Options",
                "PayloadEntropy",
                "PayloadSize",
            ],
            Self::NetworkFlow | Self::TransportFlow => FLOW_HEADER,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured audit record produced by a decode handler.
pub trait AuditRecord: fmt::Debug + Send + Sync {
    /// Record kind.
    fn record_type(&self) -> RecordType;

    /// Capture time of the record.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Append the binary wire form to `buf`.
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), RecordError>;

    /// Fields rendered as strings, in `csv_header` order.
    fn csv_record(&self) -> Vec<String>;

    /// Column names matching `csv_record`.
    fn csv_header(&self) -> &'static [&'static str] {
        self.record_type().csv_header()
    }
}

/// A decoded data record of any supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyRecord {
    Ipv4(Ipv4),
    Flow(Flow),
}

impl AnyRecord {
    /// Decode a data frame payload of the given stream type.
    pub fn decode(record_type: RecordType, data: &[u8]) -> Result<Self, RecordError> {
        match record_type {
            RecordType::Ipv4 => Ok(Self::Ipv4(Ipv4::decode(data)?)),
            RecordType::NetworkFlow | RecordType::TransportFlow => {
                Ok(Self::Flow(Flow::decode(record_type, data)?))
            }
            RecordType::Header => Err(RecordError::UnexpectedType(record_type)),
        }
    }

    /// Borrow as a trait object.
    pub fn as_record(&self) -> &dyn AuditRecord {
        match self {
            Self::Ipv4(r) => r,
            Self::Flow(r) => r,
        }
    }
}

// Wire helpers shared by the concrete records

pub(crate) fn write_timestamp(buf: &mut Vec<u8>, ts: &DateTime<Utc>) -> Result<(), RecordError> {
    buf.write_i64::<LittleEndian>(ts.timestamp())?;
    buf.write_u32::<LittleEndian>(ts.timestamp_subsec_nanos())?;
    Ok(())
}

pub(crate) fn read_timestamp<R: Read>(r: &mut R) -> Result<DateTime<Utc>, RecordError> {
    let secs = r.read_i64::<LittleEndian>()?;
    let nanos = r.read_u32::<LittleEndian>()?;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or(RecordError::InvalidTimestamp { secs, nanos })
}

pub(crate) fn write_bytes(
    buf: &mut Vec<u8>,
    field: &'static str,
    data: &[u8],
) -> Result<(), RecordError> {
    let len = u16::try_from(data.len()).map_err(|_| RecordError::FieldTooLong {
        field,
        len: data.len(),
    })?;
    buf.write_u16::<LittleEndian>(len)?;
    buf.write_all(data)?;
    Ok(())
}

pub(crate) fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>, RecordError> {
    let len = r.read_u16::<LittleEndian>()? as usize;
    let mut data = vec![0u8; len];
    r.read_exact(&mut data)?;
    Ok(data)
}

pub(crate) fn write_str(buf: &mut Vec<u8>, field: &'static str, s: &str) -> Result<(), RecordError> {
    write_bytes(buf, field, s.as_bytes())
}

pub(crate) fn read_string<R: Read>(r: &mut R) -> Result<String, RecordError> {
    Ok(String::from_utf8_lossy(&read_bytes(r)?).into_owned())
}

pub(crate) fn ensure_consumed(rest: &[u8]) -> Result<(), RecordError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(RecordError::TrailingBytes(rest.len()))
    }
}

/// Render a timestamp for CSV output.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Render a float with six decimals.
pub fn format_float(value: f64) -> String {
    format!("{:.6}", value)
}
