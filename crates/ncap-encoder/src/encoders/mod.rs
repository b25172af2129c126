// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in encoder catalogue.
//!
//! | Name            | Record           | State                       |
//! |-----------------|------------------|-----------------------------|
//! | `IPv4`          | `NC_IPv4`        | none, one record per packet |
//! | `NetworkFlow`   | `NC_NetworkFlow` | flow table, flushed on deinit |
//! | `TransportFlow` | `NC_TransportFlow` | flow table, flushed on deinit |

mod flow;
mod ipv4;

pub use flow::{network_flow, transport_flow, FlowKey};
pub use ipv4::{ipv4, payload_entropy};

use crate::encoder::EncoderDescriptor;

/// Fresh descriptors for every built-in encoder, in catalogue order.
///
/// Stateful encoders get their own tables on every call.
pub fn catalogue() -> Vec<EncoderDescriptor> {
    vec![ipv4(), network_flow(), transport_flow()]
}
