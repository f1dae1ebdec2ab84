// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Interface to the external address-set store.
//!
//! An address set is a named, mutable collection of IP addresses that ACL match expressions refer
//! to by name. The store that actually holds them (a northbound database, typically) is an
//! external collaborator: this crate only defines the seam through which the policy compiler
//! talks to it, the [`AddressSetFactory`] that creates or fetches sets by name and the
//! [`AddressSet`] handle that adds or removes addresses.
//!
//! Store operations are assumed idempotent on the store side: adding an address that is already
//! present, or deleting one that is absent, is a no-op there. Any timeout, retry or cancellation
//! belongs to the implementation and surfaces here only as an [`AddressSetError`].

#![deny(clippy::all, clippy::pedantic)]

#[cfg(any(test, feature = "testing"))]
mod fake;

#[cfg(any(test, feature = "testing"))]
pub use fake::{FakeAddressSet, FakeAddressSetFactory, FakeStoreOp};

use std::fmt::Debug;
use std::net::IpAddr;
use std::sync::Arc;

/// Errors reported by an address-set store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressSetError {
    #[error("Address set {0} does not exist")]
    NotFound(String),
    #[error("Invalid address set name: '{0}'")]
    InvalidName(String),
    #[error("Store failure on address set {name}: {reason}")]
    Store { name: String, reason: String },
}

/// A handle to one named address set living in the backing store.
pub trait AddressSet: Debug + Send + Sync {
    /// The name under which the set was created.
    fn name(&self) -> &str;

    /// Add the given addresses to the set.
    ///
    /// # Errors
    /// Returns an [`AddressSetError`] if the store rejected or failed the update.
    fn add_ips(&self, ips: &[IpAddr]) -> Result<(), AddressSetError>;

    /// Remove the given addresses from the set.
    ///
    /// # Errors
    /// Returns an [`AddressSetError`] if the store rejected or failed the update.
    fn delete_ips(&self, ips: &[IpAddr]) -> Result<(), AddressSetError>;

    /// Remove the set itself from the store.
    ///
    /// # Errors
    /// Returns an [`AddressSetError`] if the store failed to remove the set.
    fn destroy(&self) -> Result<(), AddressSetError>;
}

/// Creates address sets, or fetches them if a set with the same name already exists.
pub trait AddressSetFactory {
    /// Create-or-fetch the address set called `name`. Calling this repeatedly with the same name
    /// must not create more than one set in the store.
    ///
    /// # Errors
    /// Returns an [`AddressSetError`] if the set could not be created or looked up.
    fn ensure_address_set(&self, name: &str) -> Result<Arc<dyn AddressSet>, AddressSetError>;
}
