// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of the policy compiler

use addrset::AddressSetError;
use std::net::IpAddr;

/// Failures to keep a rule's peer address set in sync with the store. The store's own error is
/// kept, unmodified, as the source.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("Rule {0} has no peer address set")]
    NoPeerAddressSet(String),
    #[error("Address set {set} has no backing set for the address family of {ip}")]
    NoFamilySet { set: String, ip: IpAddr },
    #[error("Failed to ensure address set {set}: {source}")]
    EnsureAddressSet {
        set: String,
        #[source]
        source: AddressSetError,
    },
    #[error("Failed to add {ip} to address set {set}: {source}")]
    AddPeerIp {
        set: String,
        ip: IpAddr,
        #[source]
        source: AddressSetError,
    },
    #[error("Failed to delete {ip} from address set {set}: {source}")]
    DeletePeerIp {
        set: String,
        ip: IpAddr,
        #[source]
        source: AddressSetError,
    },
    #[error("Failed to destroy address set {set}: {source}")]
    DestroyAddressSet {
        set: String,
        #[source]
        source: AddressSetError,
    },
}

impl PolicyError {
    /// The error reported by the store, if this error originates there.
    #[must_use]
    pub fn store_error(&self) -> Option<&AddressSetError> {
        match self {
            PolicyError::NoPeerAddressSet(_) | PolicyError::NoFamilySet { .. } => None,
            PolicyError::EnsureAddressSet { source, .. }
            | PolicyError::AddPeerIp { source, .. }
            | PolicyError::DeletePeerIp { source, .. }
            | PolicyError::DestroyAddressSet { source, .. } => Some(source),
        }
    }
}
