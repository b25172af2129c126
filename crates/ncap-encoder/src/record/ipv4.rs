// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IPv4 audit record.
//!
//! # Wire Format
//!
//! ```text
//! timestamp (12) | version (1) | ihl (1) | tos (1) | length (2) | id (2)
//! flags (1) | frag_offset (2) | ttl (1) | protocol (1) | checksum (2)
//! src (4) | dst (4) | padding (u16 + var) | option_count (2) | option[]
//! payload_entropy (8) | payload_size (4)
//!
//! option = type (1) | length (1) | data (u16 + var)
//! ```

use super::{
    ensure_consumed, format_float, format_timestamp, read_bytes, read_timestamp, write_bytes,
    write_timestamp, AuditRecord, RecordError, RecordType, BEGIN, END, SEPARATOR,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use std::io::Read;
use std::net::Ipv4Addr;

/// A single IPv4 header option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Option {
    pub option_type: u8,
    pub option_length: u8,
    pub option_data: Vec<u8>,
}

impl Ipv4Option {
    /// Render as a bracketed CSV sub-record: `(type-length-hexdata)`.
    pub fn to_csv(&self) -> String {
        let mut s = String::with_capacity(8 + self.option_data.len() * 2);
        s.push_str(BEGIN);
        s.push_str(&self.option_type.to_string());
        s.push_str(SEPARATOR);
        s.push_str(&self.option_length.to_string());
        s.push_str(SEPARATOR);
        s.push_str(&hex::encode(&self.option_data));
        s.push_str(END);
        s
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), RecordError> {
        buf.write_u8(self.option_type)?;
        buf.write_u8(self.option_length)?;
        write_bytes(buf, "option_data", &self.option_data)
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self, RecordError> {
        Ok(Self {
            option_type: r.read_u8()?,
            option_length: r.read_u8()?,
            option_data: read_bytes(r)?,
        })
    }
}

/// IPv4 layer audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct Ipv4 {
    pub timestamp: DateTime<Utc>,
    pub version: u8,
    pub ihl: u8,
    pub tos: u8,
    pub length: u16,
    pub id: u16,
    pub flags: u8,
    pub frag_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub padding: Vec<u8>,
    pub options: Vec<Ipv4Option>,
    pub payload_entropy: f64,
    pub payload_size: u32,
}

impl Ipv4 {
    /// Decode from a frame payload.
    pub fn decode(data: &[u8]) -> Result<Self, RecordError> {
        let mut r = data;
        let timestamp = read_timestamp(&mut r)?;
        let version = r.read_u8()?;
        let ihl = r.read_u8()?;
        let tos = r.read_u8()?;
        let length = r.read_u16::<LittleEndian>()?;
        let id = r.read_u16::<LittleEndian>()?;
        let flags = r.read_u8()?;
        let frag_offset = r.read_u16::<LittleEndian>()?;
        let ttl = r.read_u8()?;
        let protocol = r.read_u8()?;
        let checksum = r.read_u16::<LittleEndian>()?;
        let src_ip = Ipv4Addr::from(r.read_u32::<LittleEndian>()?);
        let dst_ip = Ipv4Addr::from(r.read_u32::<LittleEndian>()?);
        let padding = read_bytes(&mut r)?;

        let option_count = r.read_u16::<LittleEndian>()?;
        let mut options = Vec::with_capacity(option_count as usize);
        for _ in 0..option_count {
            options.push(Ipv4Option::decode(&mut r)?);
        }

        let payload_entropy = r.read_f64::<LittleEndian>()?;
        let payload_size = r.read_u32::<LittleEndian>()?;
        ensure_consumed(r)?;

        Ok(Self {
            timestamp,
            version,
            ihl,
            tos,
            length,
            id,
            flags,
            frag_offset,
            ttl,
            protocol,
            checksum,
            src_ip,
            dst_ip,
            padding,
            options,
            payload_entropy,
            payload_size,
        })
    }
}

impl AuditRecord for Ipv4 {
    fn record_type(&self) -> RecordType {
        RecordType::Ipv4
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), RecordError> {
        write_timestamp(buf, &self.timestamp)?;
        buf.write_u8(self.version)?;
        buf.write_u8(self.ihl)?;
        buf.write_u8(self.tos)?;
        buf.write_u16::<LittleEndian>(self.length)?;
        buf.write_u16::<LittleEndian>(self.id)?;
        buf.write_u8(self.flags)?;
        buf.write_u16::<LittleEndian>(self.frag_offset)?;
        buf.write_u8(self.ttl)?;
        buf.write_u8(self.protocol)?;
        buf.write_u16::<LittleEndian>(self.checksum)?;
        buf.write_u32::<LittleEndian>(u32::from(self.src_ip))?;
        buf.write_u32::<LittleEndian>(u32::from(self.dst_ip))?;
        write_bytes(buf, "padding", &self.padding)?;

        let count = u16::try_from(self.options.len()).map_err(|_| RecordError::FieldTooLong {
            field: "options",
            len: self.options.len(),
        })?;
        buf.write_u16::<LittleEndian>(count)?;
        for opt in &self.options {
            opt.encode(buf)?;
        }

        buf.write_f64::<LittleEndian>(self.payload_entropy)?;
        buf.write_u32::<LittleEndian>(self.payload_size)?;
        Ok(())
    }

    fn csv_record(&self) -> Vec<String> {
        let options: String = self.options.iter().map(Ipv4Option::to_csv).collect();
        vec![
            format_timestamp(&self.timestamp),
            self.version.to_string(),
            self.ihl.to_string(),
            self.tos.to_string(),
            self.length.to_string(),
            self.id.to_string(),
            self.flags.to_string(),
            self.frag_offset.to_string(),
            self.ttl.to_string(),
            self.protocol.to_string(),
            self.checksum.to_string(),
            self.src_ip.to_string(),
            self.dst_ip.to_string(),
            hex::encode(&self.padding),
            options,
            format_float(self.payload_entropy),
            self.payload_size.to_string(),
        ]
    }
}
