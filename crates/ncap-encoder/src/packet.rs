// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded packet handed over by the capture layer.
//!
//! Dissection happens upstream; encoders only inspect the layers that were
//! already decoded.

use crate::record::Ipv4Option;
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;

/// Decoded IPv4 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Layer {
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
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub options: Vec<Ipv4Option>,
    pub padding: Vec<u8>,
}

impl Ipv4Layer {
    /// Minimal header between two hosts.
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8) -> Self {
        Self {
            version: 4,
            ihl: 5,
            tos: 0,
            length: 20,
            id: 0,
            flags: 0,
            frag_offset: 0,
            ttl: 64,
            protocol,
            checksum: 0,
            src,
            dst,
            options: Vec::new(),
            padding: Vec::new(),
        }
    }
}

/// Decoded TCP ports and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
}

/// Decoded UDP ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpLayer {
    pub src_port: u16,
    pub dst_port: u16,
}

/// One decoded protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Ipv4(Ipv4Layer),
    Tcp(TcpLayer),
    Udp(UdpLayer),
    Payload(Vec<u8>),
}

/// A captured packet with its decoded layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Capture timestamp.
    pub timestamp: DateTime<Utc>,
    /// Wire length in bytes.
    pub length: usize,
    /// Layers from outermost to innermost.
    pub layers: Vec<Layer>,
}

impl Packet {
    /// Create an empty packet.
    pub fn new(timestamp: DateTime<Utc>, length: usize) -> Self {
        Self {
            timestamp,
            length,
            layers: Vec::new(),
        }
    }

    /// Append a decoded layer.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// IPv4 layer, if present.
    pub fn ipv4(&self) -> Option<&Ipv4Layer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Ipv4(ip) => Some(ip),
            _ => None,
        })
    }

    /// Transport ports `(src, dst)` from the first TCP or UDP layer.
    pub fn ports(&self) -> Option<(u16, u16)> {
        self.layers.iter().find_map(|l| match l {
            Layer::Tcp(tcp) => Some((tcp.src_port, tcp.dst_port)),
            Layer::Udp(udp) => Some((udp.src_port, udp.dst_port)),
            _ => None,
        })
    }

    /// Application payload (empty when none was decoded).
    pub fn payload(&self) -> &[u8] {
        self.layers
            .iter()
            .find_map(|l| match l {
                Layer::Payload(data) => Some(data.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_accessors() {
        let packet = Packet::new(Utc::now(), 60)
            .with_layer(Layer::Ipv4(Ipv4Layer::new(
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                17,
            )))
            .with_layer(Layer::Udp(UdpLayer {
                src_port: 5353,
                dst_port: 53,
            }))
            .with_layer(Layer::Payload(vec![1, 2, 3]));

        assert_eq!(packet.ipv4().map(|ip| ip.protocol), Some(17));
        assert_eq!(packet.ports(), Some((5353, 53)));
        assert_eq!(packet.payload(), &[1, 2, 3]);
    }

    #[test]
    fn test_packet_without_layers() {
        let packet = Packet::new(Utc::now(), 0);
        assert!(packet.ipv4().is_none());
        assert!(packet.ports().is_none());
        assert!(packet.payload().is_empty());
    }
}
