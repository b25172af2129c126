// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flow encoders.
//!
//! The decode handler only aggregates packets into a flow table and never
//! emits a record itself. Flows are written by the deinit hook, while the
//! sink stack is still open, oldest first.

use crate::encoder::EncoderDescriptor;
use crate::packet::Packet;
use crate::record::{AuditRecord, Flow, RecordType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Aggregation key of a flow.
///
/// Network flows leave both ports at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
}

impl FlowKey {
    /// Key of `packet` for the given flow type, `None` if it does not apply.
    pub fn of(record_type: RecordType, packet: &Packet) -> Option<Self> {
        let ip = packet.ipv4()?;
        let (src_port, dst_port) = match record_type {
            RecordType::NetworkFlow => (0, 0),
            RecordType::TransportFlow => packet.ports()?,
            _ => return None,
        };
        Some(Self {
            src_ip: ip.src,
            dst_ip: ip.dst,
            src_port,
            dst_port,
            protocol: ip.protocol,
        })
    }
}

type FlowTable = Arc<Mutex<HashMap<FlowKey, Flow>>>;

/// Descriptor of the `NetworkFlow` encoder (host to host).
pub fn network_flow() -> EncoderDescriptor {
    flow_encoder("NetworkFlow", RecordType::NetworkFlow)
}

/// Descriptor of the `TransportFlow` encoder (port to port).
pub fn transport_flow() -> EncoderDescriptor {
    flow_encoder("TransportFlow", RecordType::TransportFlow)
}

fn flow_encoder(name: &str, record_type: RecordType) -> EncoderDescriptor {
    let table: FlowTable = Arc::new(Mutex::new(HashMap::new()));
    let (handler_table, reset_table, flush_table) =
        (Arc::clone(&table), Arc::clone(&table), table);

    EncoderDescriptor::new(name, record_type, move |packet: &Packet| {
        aggregate(&handler_table, record_type, packet);
        None::<Box<dyn AuditRecord>>
    })
    .post_init(move |_| {
        reset_table.lock().clear();
        Ok(())
    })
    .deinit(move |encoder| {
        let mut flows: Vec<Flow> = flush_table.lock().drain().map(|(_, flow)| flow).collect();
        flows.sort_by_key(|flow| flow.first_seen);

        tracing::debug!("{}: flushing {} flows", encoder.name(), flows.len());
        for flow in &flows {
            encoder.write_record(flow)?;
        }
        Ok(())
    })
}

fn aggregate(table: &FlowTable, record_type: RecordType, packet: &Packet) {
    let Some(key) = FlowKey::of(record_type, packet) else {
        return;
    };
    let size = packet.length as u64;

    table
        .lock()
        .entry(key)
        .and_modify(|flow| flow.update(packet.timestamp, size))
        .or_insert_with(|| {
            Flow::new(
                record_type,
                packet.timestamp,
                key.src_ip,
                key.dst_ip,
                key.src_port,
                key.dst_port,
                key.protocol,
                size,
            )
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::CustomEncoder;
    use crate::packet::{Ipv4Layer, Layer, TcpLayer, UdpLayer};
    use crate::sink::{DelimitedReader, OutputOptions};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn packet(secs: i64, src: u8, sport: u16, length: usize) -> Packet {
        Packet::new(Utc.timestamp_opt(secs, 0).unwrap(), length)
            .with_layer(Layer::Ipv4(Ipv4Layer::new(
                Ipv4Addr::new(10, 0, 0, src),
                Ipv4Addr::new(10, 0, 0, 100),
                6,
            )))
            .with_layer(Layer::Tcp(TcpLayer {
                src_port: sport,
                dst_port: 443,
                flags: 0x02,
            }))
    }

    fn flows_in(path: &std::path::Path, record_type: RecordType) -> Vec<Flow> {
        let bytes = std::fs::read(path).expect("read");
        DelimitedReader::new(bytes.as_slice())
            .map(|frame| Flow::decode(record_type, &frame.expect("frame")).expect("decode"))
            .collect()
    }

    #[test]
    fn test_flow_key() {
        let p = packet(0, 1, 5000, 60);
        let net = FlowKey::of(RecordType::NetworkFlow, &p).expect("key");
        assert_eq!((net.src_port, net.dst_port), (0, 0));

        let transport = FlowKey::of(RecordType::TransportFlow, &p).expect("key");
        assert_eq!((transport.src_port, transport.dst_port), (5000, 443));

        let udp_less = Packet::new(Utc::now(), 20).with_layer(Layer::Ipv4(Ipv4Layer::new(
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::LOCALHOST,
            1,
        )));
        assert!(FlowKey::of(RecordType::TransportFlow, &udp_less).is_none());
        assert!(FlowKey::of(RecordType::NetworkFlow, &udp_less).is_some());
        assert!(FlowKey::of(RecordType::Ipv4, &p).is_none());
    }

    #[test]
    fn test_network_flow_flushed_on_destroy() {
        let dir = tempdir().expect("tempdir");
        let options = OutputOptions {
            out: dir.path().to_path_buf(),
            ..Default::default()
        };
        let encoder = CustomEncoder::init(&network_flow(), &options).expect("init");
        encoder.run_post_init().expect("post-init");

        // two hosts, host 2 first; ports differ but network flows ignore them
        encoder.encode(&packet(10, 2, 1, 100)).expect("encode");
        encoder.encode(&packet(20, 1, 2, 40)).expect("encode");
        encoder.encode(&packet(30, 1, 3, 60)).expect("encode");
        assert_eq!(encoder.num_records(), 0);

        let report = encoder.destroy().expect("destroy");
        assert_eq!(report.records, 2);

        let flows = flows_in(&dir.path().join("NetworkFlow.ncap"), RecordType::NetworkFlow);
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].src_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(flows[1].src_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(flows[1].num_packets, 2);
        assert_eq!(flows[1].total_size, 100);
        assert_eq!(flows[1].duration_nanos(), 10_000_000_000);
    }

    #[test]
    fn test_transport_flow_splits_ports() {
        let dir = tempdir().expect("tempdir");
        let options = OutputOptions {
            out: dir.path().to_path_buf(),
            ..Default::default()
        };
        let encoder = CustomEncoder::init(&transport_flow(), &options).expect("init");

        encoder.encode(&packet(1, 1, 1000, 60)).expect("encode");
        encoder.encode(&packet(2, 1, 1001, 60)).expect("encode");
        encoder.encode(&packet(3, 1, 1000, 60)).expect("encode");
        let udp = Packet::new(Utc.timestamp_opt(4, 0).unwrap(), 80)
            .with_layer(Layer::Ipv4(Ipv4Layer::new(
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 100),
                17,
            )))
            .with_layer(Layer::Udp(UdpLayer {
                src_port: 1000,
                dst_port: 53,
            }));
        encoder.encode(&udp).expect("encode");

        let report = encoder.destroy().expect("destroy");
        assert_eq!(report.records, 3);

        let flows = flows_in(
            &dir.path().join("TransportFlow.ncap"),
            RecordType::TransportFlow,
        );
        let ports: Vec<(u16, u64)> = flows.iter().map(|f| (f.src_port, f.num_packets)).collect();
        assert_eq!(ports, vec![(1000, 2), (1001, 1), (1000, 1)]);
        assert_eq!(flows[2].protocol, 17);
    }

    #[test]
    fn test_post_init_resets_table() {
        let dir = tempdir().expect("tempdir");
        let options = OutputOptions {
            out: dir.path().to_path_buf(),
            ..Default::default()
        };
        let encoder = CustomEncoder::init(&network_flow(), &options).expect("init");

        encoder.encode(&packet(1, 1, 1, 10)).expect("encode");
        encoder.run_post_init().expect("post-init");
        let report = encoder.destroy().expect("destroy");
        assert_eq!(report.records, 0);
    }
}
