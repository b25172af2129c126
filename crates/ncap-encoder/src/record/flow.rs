// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aggregated flow record, shared by network and transport flows.

use super::{
    ensure_consumed, format_timestamp, read_timestamp, write_timestamp, AuditRecord, RecordError,
    RecordType,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;

/// Flow audit record.
///
/// Network flows leave both ports at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub record_type: RecordType,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    pub num_packets: u64,
    pub total_size: u64,
}

impl Flow {
    /// Start a flow from its first packet.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        record_type: RecordType,
        timestamp: DateTime<Utc>,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
        protocol: u8,
        size: u64,
    ) -> Self {
        Self {
            record_type,
            first_seen: timestamp,
            last_seen: timestamp,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            protocol,
            num_packets: 1,
            total_size: size,
        }
    }

    /// Account one more packet.
    pub fn update(&mut self, timestamp: DateTime<Utc>, size: u64) {
        if timestamp < self.first_seen {
            self.first_seen = timestamp;
        }
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
        }
        self.num_packets += 1;
        self.total_size += size;
    }

    /// Nanoseconds between first and last packet.
    pub fn duration_nanos(&self) -> i64 {
        (self.last_seen - self.first_seen)
            .num_nanoseconds()
            .unwrap_or(i64::MAX)
    }

    /// Decode from a frame payload.
    pub fn decode(record_type: RecordType, data: &[u8]) -> Result<Self, RecordError> {
        if !matches!(
            record_type,
            RecordType::NetworkFlow | RecordType::TransportFlow
        ) {
            return Err(RecordError::UnexpectedType(record_type));
        }

        let mut r = data;
        let first_seen = read_timestamp(&mut r)?;
        let last_seen = read_timestamp(&mut r)?;
        let src_ip = Ipv4Addr::from(r.read_u32::<LittleEndian>()?);
        let dst_ip = Ipv4Addr::from(r.read_u32::<LittleEndian>()?);
        let src_port = r.read_u16::<LittleEndian>()?;
        let dst_port = r.read_u16::<LittleEndian>()?;
        let protocol = r.read_u8()?;
        let num_packets = r.read_u64::<LittleEndian>()?;
        let total_size = r.read_u64::<LittleEndian>()?;
        ensure_consumed(r)?;

        Ok(Self {
            record_type,
            first_seen,
            last_seen,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            protocol,
            num_packets,
            total_size,
        })
    }
}

impl AuditRecord for Flow {
    fn record_type(&self) -> RecordType {
        self.record_type
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.first_seen
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), RecordError> {
        write_timestamp(buf, &self.first_seen)?;
        write_timestamp(buf, &self.last_seen)?;
        buf.write_u32::<LittleEndian>(u32::from(self.src_ip))?;
        buf.write_u32::<LittleEndian>(u32::from(self.dst_ip))?;
        buf.write_u16::<LittleEndian>(self.src_port)?;
        buf.write_u16::<LittleEndian>(self.dst_port)?;
        buf.write_u8(self.protocol)?;
        buf.write_u64::<LittleEndian>(self.num_packets)?;
        buf.write_u64::<LittleEndian>(self.total_size)?;
        Ok(())
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            format_timestamp(&self.first_seen),
            format_timestamp(&self.last_seen),
            self.src_ip.to_string(),
            self.dst_ip.to_string(),
            self.src_port.to_string(),
            self.dst_port.to_string(),
            self.protocol.to_string(),
            self.num_packets.to_string(),
            self.total_size.to_string(),
            self.duration_nanos().to_string(),
        ]
    }
}
