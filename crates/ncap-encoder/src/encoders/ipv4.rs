// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IPv4 encoder.

use crate::encoder::EncoderDescriptor;
use crate::packet::Packet;
use crate::record::{AuditRecord, Ipv4, RecordType};

/// Descriptor of the stateless `IPv4` encoder.
pub fn ipv4() -> EncoderDescriptor {
    EncoderDescriptor::new("IPv4", RecordType::Ipv4, decode)
}

fn decode(packet: &Packet) -> Option<Box<dyn AuditRecord>> {
    let layer = packet.ipv4()?;
    let payload = packet.payload();

    Some(Box::new(Ipv4 {
        timestamp: packet.timestamp,
        version: layer.version,
        ihl: layer.ihl,
        tos: layer.tos,
        length: layer.length,
        id: layer.id,
        flags: layer.flags,
        frag_offset: layer.frag_offset,
        ttl: layer.ttl,
        protocol: layer.protocol,
        checksum: layer.checksum,
        src_ip: layer.src,
        dst_ip: layer.dst,
        padding: layer.padding.clone(),
        options: layer.options.clone(),
        payload_entropy: payload_entropy(payload),
        payload_size: u32::try_from(payload.len()).unwrap_or(u32::MAX),
    }))
}

/// Shannon entropy of `data` in bits per byte (0.0 for empty input).
pub fn payload_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let total = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
