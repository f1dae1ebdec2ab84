// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory address-set store for tests.
//!
//! [`FakeAddressSetFactory`] keeps every set it creates in a shared map so that tests can inspect
//! the store after driving the code under test, and can make chosen store operations fail to
//! exercise error paths.

#![allow(clippy::missing_panics_doc)]

use crate::{AddressSet, AddressSetError, AddressSetFactory};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::trace;

/// The kinds of operation the fake store accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FakeStoreOp {
    Ensure,
    Add,
    Delete,
    Destroy,
}

#[derive(Debug, Default)]
struct FakeStore {
    sets: BTreeMap<String, BTreeSet<IpAddr>>,
    creations: BTreeMap<String, usize>,
    calls: BTreeMap<FakeStoreOp, usize>,
    failing: BTreeSet<FakeStoreOp>,
}

impl FakeStore {
    // Account for an attempted operation and tell if it must fail
    fn attempt(&mut self, op: FakeStoreOp, name: &str) -> Result<(), AddressSetError> {
        *self.calls.entry(op).or_default() += 1;
        if self.failing.contains(&op) {
            trace!("Fake store: injected {op:?} failure on {name}");
            return Err(AddressSetError::Store {
                name: name.to_string(),
                reason: format!("injected {op:?} failure"),
            });
        }
        Ok(())
    }
}

/// A handle to a set held by a [`FakeAddressSetFactory`].
#[derive(Debug)]
pub struct FakeAddressSet {
    name: String,
    store: Arc<Mutex<FakeStore>>,
}

impl AddressSet for FakeAddressSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_ips(&self, ips: &[IpAddr]) -> Result<(), AddressSetError> {
        let mut store = self.store.lock();
        store.attempt(FakeStoreOp::Add, &self.name)?;
        let set = store
            .sets
            .get_mut(&self.name)
            .ok_or_else(|| AddressSetError::NotFound(self.name.clone()))?;
        set.extend(ips.iter().copied());
        Ok(())
    }

    fn delete_ips(&self, ips: &[IpAddr]) -> Result<(), AddressSetError> {
        let mut store = self.store.lock();
        store.attempt(FakeStoreOp::Delete, &self.name)?;
        let set = store
            .sets
            .get_mut(&self.name)
            .ok_or_else(|| AddressSetError::NotFound(self.name.clone()))?;
        for ip in ips {
            set.remove(ip);
        }
        Ok(())
    }

    fn destroy(&self) -> Result<(), AddressSetError> {
        let mut store = self.store.lock();
        store.attempt(FakeStoreOp::Destroy, &self.name)?;
        store.sets.remove(&self.name);
        Ok(())
    }
}

/// An [`AddressSetFactory`] backed by memory, with assertion helpers.
#[derive(Debug, Clone, Default)]
pub struct FakeAddressSetFactory {
    store: Arc<Mutex<FakeStore>>,
}

impl AddressSetFactory for FakeAddressSetFactory {
    fn ensure_address_set(&self, name: &str) -> Result<Arc<dyn AddressSet>, AddressSetError> {
        let mut store = self.store.lock();
        store.attempt(FakeStoreOp::Ensure, name)?;
        if name.is_empty() {
            return Err(AddressSetError::InvalidName(name.to_string()));
        }
        if !store.sets.contains_key(name) {
            store.sets.insert(name.to_string(), BTreeSet::new());
            *store.creations.entry(name.to_string()).or_default() += 1;
        }
        Ok(Arc::new(FakeAddressSet {
            name: name.to_string(),
            store: self.store.clone(),
        }))
    }
}

impl FakeAddressSetFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation of kind `op` fail, until [`Self::clear_failures`].
    pub fn fail_on(&self, op: FakeStoreOp) {
        self.store.lock().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.store.lock().failing.clear();
    }

    /// The addresses in set `name`, or `None` if the set does not exist.
    #[must_use]
    pub fn address_set_ips(&self, name: &str) -> Option<BTreeSet<IpAddr>> {
        self.store.lock().sets.get(name).cloned()
    }

    /// Number of sets currently in the store.
    #[must_use]
    pub fn address_set_count(&self) -> usize {
        self.store.lock().sets.len()
    }

    /// How many times set `name` has been created in the store.
    #[must_use]
    pub fn creations(&self, name: &str) -> usize {
        self.store.lock().creations.get(name).copied().unwrap_or(0)
    }

    /// How many operations of kind `op` were attempted, including failed ones.
    #[must_use]
    pub fn calls(&self, op: FakeStoreOp) -> usize {
        self.store.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Assert that set `name` exists and contains exactly `ips`.
    pub fn expect_address_set_with_ips(&self, name: &str, ips: &[&str]) {
        let expected: BTreeSet<IpAddr> = ips
            .iter()
            .map(|ip| ip.parse::<IpAddr>().unwrap_or_else(|e| panic!("bad test ip {ip}: {e}")))
            .collect();
        let Some(actual) = self.address_set_ips(name) else {
            panic!("address set {name} does not exist");
        };
        assert_eq!(actual, expected, "unexpected contents for address set {name}");
    }

    /// Assert that set `name` exists and is empty.
    pub fn expect_empty_address_set_exist(&self, name: &str) {
        self.expect_address_set_with_ips(name, &[]);
    }

    /// Assert that there is no set called `name`.
    pub fn expect_no_address_set(&self, name: &str) {
        assert!(
            self.address_set_ips(name).is_none(),
            "address set {name} should not exist"
        );
    }
}
