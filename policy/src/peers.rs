// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Peer pods and the reference-counted address set of their IPs
//!
//! Several pods may report the same IP at the same time (host-networked pods, or a pod being
//! replaced by another one that got the same address). [`PeerAddressSet`] therefore keeps, for
//! each address, the set of pods currently contributing it. The address is in the backing store
//! exactly when that set is not empty, and the store is only called when the set goes from empty
//! to non-empty or back.

use addrset::{AddressSet, AddressSetFactory};
use ordermap::OrderSet;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::config::AddressFamilies;
use crate::errors::PolicyError;
use crate::ipblock::IpFamily;

/// The identity of a pod.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// A pod selected as a peer of a rule, with its addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodPeer {
    pub key: PodKey,
    ips: OrderSet<IpAddr>,
}

impl PodPeer {
    /// Build a [`PodPeer`]. Repeated addresses are only kept once, in first-seen order.
    #[must_use]
    pub fn new(namespace: &str, name: &str, ips: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            key: PodKey::new(namespace, name),
            ips: ips.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn ips(&self) -> &OrderSet<IpAddr> {
        &self.ips
    }
}

/// Reference-counted membership of peer IPs in backing address sets.
///
/// A [`PeerAddressSet`] named `base` is backed by one store set per enabled address family, named
/// after [`IpFamily::address_set_name`] (`<base>_v4`, `<base>_v6`), which is how match expressions
/// refer to them. Each address goes to the set of its family.
///
/// The in-memory owner sets only ever reflect store operations that succeeded: a failed store call
/// leaves them untouched.
#[derive(Debug)]
pub struct PeerAddressSet {
    name: String,
    handles: BTreeMap<IpFamily, Arc<dyn AddressSet>>,
    // never holds an empty owner set
    owners: BTreeMap<IpAddr, BTreeSet<PodKey>>,
}

impl PeerAddressSet {
    #[must_use]
    pub fn new(
        name: &str,
        handles: impl IntoIterator<Item = (IpFamily, Arc<dyn AddressSet>)>,
    ) -> Self {
        Self {
            name: name.to_string(),
            handles: handles.into_iter().collect(),
            owners: BTreeMap::new(),
        }
    }

    /// Create or fetch the store sets backing `name`, one per family in `families`.
    ///
    /// # Errors
    /// Returns [`PolicyError::EnsureAddressSet`] for the first set the factory failed to provide.
    /// Sets provided before the failure stay in the store, and are fetched again on retry.
    pub fn ensure(
        factory: &dyn AddressSetFactory,
        name: &str,
        families: AddressFamilies,
    ) -> Result<Self, PolicyError> {
        let mut handles = Vec::new();
        for family in families.enabled() {
            let set = family.address_set_name(name);
            let handle = factory
                .ensure_address_set(&set)
                .map_err(|source| PolicyError::EnsureAddressSet {
                    set: set.clone(),
                    source,
                })?;
            debug!("Using address set {} for {family:?} peers", handle.name());
            handles.push((family, handle));
        }
        Ok(Self::new(name, handles))
    }

    /// The base name of the set.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store set holding addresses of `family`, if that family is enabled.
    #[must_use]
    pub fn family_set(&self, family: IpFamily) -> Option<&Arc<dyn AddressSet>> {
        self.handles.get(&family)
    }

    fn handle_for(&self, ip: IpAddr) -> Result<&Arc<dyn AddressSet>, PolicyError> {
        self.handles
            .get(&IpFamily::of(&ip))
            .ok_or_else(|| PolicyError::NoFamilySet {
                set: self.name.clone(),
                ip,
            })
    }

    /// The addresses currently in the set.
    pub fn ips(&self) -> impl Iterator<Item = &IpAddr> {
        self.owners.keys()
    }

    /// The pods currently contributing `ip`, if any.
    #[must_use]
    pub fn owners(&self, ip: &IpAddr) -> Option<&BTreeSet<PodKey>> {
        self.owners.get(ip)
    }

    #[must_use]
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.owners.contains_key(ip)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Record `owner` as contributing `ip`. The store is only updated if no other pod contributed
    /// `ip` yet. Returns true if the address was added to the store.
    ///
    /// # Errors
    /// Returns [`PolicyError::NoFamilySet`] if there is no set for the family of `ip`, or
    /// [`PolicyError::AddPeerIp`] if the store failed to add the address. Nothing is recorded in
    /// either case.
    pub fn add_owner(&mut self, ip: IpAddr, owner: &PodKey) -> Result<bool, PolicyError> {
        if let Some(owners) = self.owners.get_mut(&ip) {
            if owners.insert(owner.clone()) {
                trace!(
                    "{ip} in {} is now shared by {} pods",
                    self.name,
                    owners.len()
                );
            } else {
                trace!("{owner:?} already owns {ip} in {}", self.name);
            }
            return Ok(false);
        }
        let handle = self.handle_for(ip)?;
        handle.add_ips(&[ip]).map_err(|source| {
            error!("Failed to add {ip} to address set {}: {source}", handle.name());
            PolicyError::AddPeerIp {
                set: handle.name().to_string(),
                ip,
                source,
            }
        })?;
        debug!("Added {ip} of {owner:?} to address set {}", handle.name());
        self.owners.insert(ip, BTreeSet::from([owner.clone()]));
        Ok(true)
    }

    /// Forget `owner` as a contributor of `ip`. The store is only updated if `owner` was the last
    /// pod contributing `ip`. Returns true if the address was removed from the store.
    ///
    /// # Errors
    /// Returns [`PolicyError::DeletePeerIp`] if the store failed to remove the address, in which
    /// case `owner` is still recorded.
    pub fn remove_owner(&mut self, ip: IpAddr, owner: &PodKey) -> Result<bool, PolicyError> {
        let Some(owners) = self.owners.get_mut(&ip) else {
            trace!("{ip} is not in address set {}", self.name);
            return Ok(false);
        };
        if !owners.contains(owner) {
            trace!("{owner:?} does not own {ip} in {}", self.name);
            return Ok(false);
        }
        if owners.len() > 1 {
            owners.remove(owner);
            trace!(
                "{ip} in {} is still used by {} pods",
                self.name,
                owners.len()
            );
            return Ok(false);
        }
        let handle = self.handle_for(ip)?;
        handle.delete_ips(&[ip]).map_err(|source| {
            error!(
                "Failed to delete {ip} from address set {}: {source}",
                handle.name()
            );
            PolicyError::DeletePeerIp {
                set: handle.name().to_string(),
                ip,
                source,
            }
        })?;
        debug!(
            "Deleted {ip} of {owner:?} from address set {}",
            handle.name()
        );
        self.owners.remove(&ip);
        Ok(true)
    }

    /// Forget `owner` as a contributor of every address it contributes, in address order.
    ///
    /// # Errors
    /// Stops at the first store failure, see [`Self::remove_owner`]. Addresses handled before the
    /// failure stay removed.
    pub fn remove_all_of(&mut self, owner: &PodKey) -> Result<(), PolicyError> {
        let owned: Vec<IpAddr> = self
            .owners
            .iter()
            .filter(|(_, owners)| owners.contains(owner))
            .map(|(ip, _)| *ip)
            .collect();
        for ip in owned {
            self.remove_owner(ip, owner)?;
        }
        Ok(())
    }

    /// Remove the backing sets from the store. Sets are forgotten as soon as they are removed, so
    /// that after a failure a new call only retries the remaining ones. The [`PeerAddressSet`]
    /// must not be used once this succeeded.
    ///
    /// # Errors
    /// Returns [`PolicyError::DestroyAddressSet`] for the first set the store failed to remove.
    pub fn destroy(&mut self) -> Result<(), PolicyError> {
        while let Some((&family, handle)) = self.handles.first_key_value() {
            handle
                .destroy()
                .map_err(|source| PolicyError::DestroyAddressSet {
                    set: handle.name().to_string(),
                    source,
                })?;
            debug!("Destroyed address set {}", handle.name());
            self.handles.remove(&family);
        }
        Ok(())
    }
}
