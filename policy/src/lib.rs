// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Compiler for network-policy ingress and egress rules.
//!
//! A [`GressRule`] holds one rule of a network policy: its IP blocks, its port policies and the
//! address set of peer-pod addresses the rule's ACLs refer to. The crate renders the rule into the
//! boolean match expressions consumed by the logical-flow ACL engine, and keeps the peer address
//! set in the external store consistent as peer pods come and go, reference-counting addresses
//! that several pods report at the same time.

#![deny(clippy::all, clippy::pedantic)]

pub mod config;
pub mod converters;
mod display;
pub mod errors;
pub mod gress;
pub mod ipblock;
pub mod l4;
pub mod peers;

// re-exports
pub use config::{AddressFamilies, CompilerConfig, ConfigError};
pub use errors::PolicyError;
pub use gress::{GressRule, PolicyDirection};
pub use ipblock::{IpBlock, IpFamily};
pub use l4::{L4Protocol, PortPolicy, l4_match};
pub use peers::{PeerAddressSet, PodKey, PodPeer};
