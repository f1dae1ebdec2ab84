// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! One ingress or egress rule of a network policy

use addrset::AddressSetFactory;
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::{instrument, trace};

use crate::config::{AddressFamilies, CompilerConfig};
use crate::errors::PolicyError;
use crate::ipblock::{IpBlock, IpFamily, ip_block_match};
use crate::l4::PortPolicy;
use crate::peers::{PeerAddressSet, PodPeer};

/// The direction of the traffic a rule applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyDirection {
    Ingress,
    Egress,
}

impl PolicyDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyDirection::Ingress => "ingress",
            PolicyDirection::Egress => "egress",
        }
    }

    /// The packet field that carries the peer's address in this direction.
    #[must_use]
    pub fn peer_field(self) -> &'static str {
        match self {
            PolicyDirection::Ingress => "src",
            PolicyDirection::Egress => "dst",
        }
    }
}

/// A rule of a network policy, identified by its namespace, policy, direction and index within
/// the policy.
///
/// Mutating operations take `&mut self`: callers serialize them, typically by processing the
/// events of one policy in order.
#[derive(Debug)]
pub struct GressRule {
    direction: PolicyDirection,
    index: usize,
    namespace: String,
    policy_name: String,
    families: AddressFamilies,
    ip_blocks: Vec<IpBlock>,
    port_policies: Vec<PortPolicy>,
    peer_address_set_name: String,
    peer_address_set: Option<PeerAddressSet>,
    namespace_address_sets: BTreeSet<String>,
}

impl GressRule {
    #[must_use]
    pub fn new(
        direction: PolicyDirection,
        index: usize,
        namespace: &str,
        policy_name: &str,
        config: &CompilerConfig,
    ) -> Self {
        Self {
            direction,
            index,
            namespace: namespace.to_string(),
            policy_name: policy_name.to_string(),
            families: config.families,
            ip_blocks: Vec::new(),
            port_policies: Vec::new(),
            peer_address_set_name: format!(
                "{namespace}.{policy_name}.{}.{index}",
                direction.as_str()
            ),
            peer_address_set: None,
            namespace_address_sets: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn direction(&self) -> PolicyDirection {
        self.direction
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    /// The name of the rule's peer address set: `<namespace>.<policy>.<direction>.<index>`.
    #[must_use]
    pub fn peer_address_set_name(&self) -> &str {
        &self.peer_address_set_name
    }

    #[must_use]
    pub fn peer_address_set(&self) -> Option<&PeerAddressSet> {
        self.peer_address_set.as_ref()
    }

    /// The addresses currently in the peer address set, in address order. Empty if the rule has
    /// no peer address set.
    #[must_use]
    pub fn peer_ips(&self) -> Vec<IpAddr> {
        self.peer_address_set
            .iter()
            .flat_map(PeerAddressSet::ips)
            .copied()
            .collect()
    }

    pub fn add_ip_block(&mut self, block: IpBlock) {
        self.ip_blocks.push(block);
    }

    #[must_use]
    pub fn ip_blocks(&self) -> &[IpBlock] {
        &self.ip_blocks
    }

    #[must_use]
    pub fn size_of_ip_blocks(&self) -> usize {
        self.ip_blocks.len()
    }

    pub fn add_port_policy(&mut self, policy: PortPolicy) {
        self.port_policies.push(policy);
    }

    #[must_use]
    pub fn port_policies(&self) -> &[PortPolicy] {
        &self.port_policies
    }

    /// The L4 match of each port policy, in insertion order. Port policies with an unsupported
    /// protocol are left out.
    #[must_use]
    pub fn l4_matches(&self) -> Vec<String> {
        self.port_policies
            .iter()
            .map(PortPolicy::l4_match)
            .filter(|l4| !l4.is_empty())
            .collect()
    }

    /// One match per IP block of the rule, in insertion order. See [`ip_block_match`].
    #[must_use]
    pub fn ip_block_match(&self, lport_match: &str, l4_match: &str) -> Vec<String> {
        ip_block_match(&self.ip_blocks, lport_match, l4_match)
    }

    /// The IP block matches of all the ACLs the rule needs: one per IP block if the rule has no
    /// port policy, otherwise one per IP block and per supported port policy, grouped by port
    /// policy.
    #[must_use]
    pub fn ip_block_acl_matches(&self, lport_match: &str) -> Vec<String> {
        if self.port_policies.is_empty() {
            return self.ip_block_match(lport_match, "");
        }
        self.l4_matches()
            .iter()
            .flat_map(|l4| self.ip_block_match(lport_match, l4))
            .collect()
    }

    /// Track the address set of a namespace selected by the rule. Returns true if it was not
    /// tracked already.
    pub fn add_namespace_address_set(&mut self, name: &str) -> bool {
        self.namespace_address_sets.insert(name.to_string())
    }

    /// Stop tracking the address set of a namespace. Returns true if it was tracked.
    pub fn del_namespace_address_set(&mut self, name: &str) -> bool {
        self.namespace_address_sets.remove(name)
    }

    /// The L3 match over the address sets the rule refers to (its own peer address set, if any,
    /// and the namespace address sets), with one clause per enabled address family, e.g.
    /// `(ip4.src == {$ns1.pol1.ingress.0_v4, $ns2_v4})`. Returns `None` if the rule refers to no
    /// address set.
    #[must_use]
    pub fn l3_match_from_address_sets(&self) -> Option<String> {
        let mut sets: BTreeSet<&str> = self
            .namespace_address_sets
            .iter()
            .map(String::as_str)
            .collect();
        if let Some(peers) = &self.peer_address_set {
            sets.insert(peers.name());
        }
        if sets.is_empty() {
            return None;
        }
        let field = self.direction.peer_field();
        let clauses: Vec<String> = self
            .families
            .enabled()
            .map(|family| {
                let refs: Vec<String> = sets
                    .iter()
                    .map(|set| format!("${}", family.address_set_name(set)))
                    .collect();
                format!("{}.{field} == {{{}}}", family.token(), refs.join(", "))
            })
            .collect();
        Some(format!("({})", clauses.join(" || ")))
    }

    /// Create or fetch the rule's peer address set, backed by one store set per enabled address
    /// family. Does nothing if the rule already has it.
    ///
    /// # Errors
    /// Returns [`PolicyError::EnsureAddressSet`] if the factory failed.
    #[instrument(level = "debug", skip_all, fields(rule = %self.peer_address_set_name))]
    pub fn ensure_peer_address_set(
        &mut self,
        factory: &dyn AddressSetFactory,
    ) -> Result<(), PolicyError> {
        if self.peer_address_set.is_some() {
            trace!("Peer address set already exists");
            return Ok(());
        }
        let peers = PeerAddressSet::ensure(factory, &self.peer_address_set_name, self.families)?;
        self.peer_address_set = Some(peers);
        Ok(())
    }

    fn peers_mut(&mut self) -> Result<&mut PeerAddressSet, PolicyError> {
        self.peer_address_set
            .as_mut()
            .ok_or_else(|| PolicyError::NoPeerAddressSet(self.peer_address_set_name.clone()))
    }

    /// Add the addresses of `pods` to the peer address set. Addresses of a family that is not
    /// enabled are skipped.
    ///
    /// # Errors
    /// Returns [`PolicyError::NoPeerAddressSet`] if [`Self::ensure_peer_address_set`] was not
    /// called, or the error of the first store update that failed. Pods and addresses processed
    /// before the failure remain added.
    #[instrument(level = "debug", skip_all, fields(rule = %self.peer_address_set_name))]
    pub fn add_peer_pods(&mut self, pods: &[PodPeer]) -> Result<(), PolicyError> {
        let families = self.families;
        let peers = self.peers_mut()?;
        for pod in pods {
            for ip in pod.ips() {
                if !families.is_enabled(IpFamily::of(ip)) {
                    trace!("Skipping {ip} of {:?}: address family disabled", pod.key);
                    continue;
                }
                peers.add_owner(*ip, &pod.key)?;
            }
        }
        Ok(())
    }

    /// Remove the addresses contributed by `pod` from the peer address set. Addresses still
    /// contributed by other pods stay.
    ///
    /// # Errors
    /// Returns [`PolicyError::NoPeerAddressSet`] if [`Self::ensure_peer_address_set`] was not
    /// called, or the error of the first store update that failed.
    #[instrument(level = "debug", skip_all, fields(rule = %self.peer_address_set_name))]
    pub fn delete_peer_pod(&mut self, pod: &PodPeer) -> Result<(), PolicyError> {
        self.peers_mut()?.remove_all_of(&pod.key)
    }

    /// Destroy the rule's peer address set in the store, if it has one. A new one can then be
    /// created with [`Self::ensure_peer_address_set`].
    ///
    /// # Errors
    /// Returns [`PolicyError::DestroyAddressSet`] if the store failed to remove one of the sets, in
    /// which case the rule keeps the peer address set and a new call retries the sets left.
    #[instrument(level = "debug", skip_all, fields(rule = %self.peer_address_set_name))]
    pub fn destroy(&mut self) -> Result<(), PolicyError> {
        if let Some(peers) = &mut self.peer_address_set {
            peers.destroy()?;
            self.peer_address_set = None;
        }
        Ok(())
    }
}
