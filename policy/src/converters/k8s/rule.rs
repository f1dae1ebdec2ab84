// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use k8s_openapi::api::networking::v1::{
    NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicyPort,
};
use tracing::trace;

use crate::config::CompilerConfig;
use crate::converters::k8s::FromK8sConversionError;
use crate::gress::{GressRule, PolicyDirection};
use crate::ipblock::IpBlock;
use crate::l4::PortPolicy;

fn populate(
    rule: &mut GressRule,
    peers: Option<&[NetworkPolicyPeer]>,
    ports: Option<&[NetworkPolicyPort]>,
) -> Result<(), FromK8sConversionError> {
    for port in ports.into_iter().flatten() {
        rule.add_port_policy(PortPolicy::try_from(port)?);
    }
    for peer in peers.into_iter().flatten() {
        match &peer.ip_block {
            Some(block) => rule.add_ip_block(IpBlock::from(block)),
            None => trace!(
                "Rule {}: skipping selector peer",
                rule.peer_address_set_name()
            ),
        }
    }
    Ok(())
}

/// Build the [`GressRule`] for the ingress rule at `index` of policy `policy_name`.
///
/// # Errors
/// Returns a [`FromK8sConversionError`] if one of the rule's ports is invalid or cannot be
/// expressed as a match (named ports).
pub fn gress_rule_from_ingress(
    k8s_rule: &NetworkPolicyIngressRule,
    index: usize,
    namespace: &str,
    policy_name: &str,
    config: &CompilerConfig,
) -> Result<GressRule, FromK8sConversionError> {
    let mut rule = GressRule::new(
        PolicyDirection::Ingress,
        index,
        namespace,
        policy_name,
        config,
    );
    populate(&mut rule, k8s_rule.from.as_deref(), k8s_rule.ports.as_deref())?;
    Ok(rule)
}

/// Build the [`GressRule`] for the egress rule at `index` of policy `policy_name`.
///
/// # Errors
/// Returns a [`FromK8sConversionError`] if one of the rule's ports is invalid or cannot be
/// expressed as a match (named ports).
pub fn gress_rule_from_egress(
    k8s_rule: &NetworkPolicyEgressRule,
    index: usize,
    namespace: &str,
    policy_name: &str,
    config: &CompilerConfig,
) -> Result<GressRule, FromK8sConversionError> {
    let mut rule = GressRule::new(
        PolicyDirection::Egress,
        index,
        namespace,
        policy_name,
        config,
    );
    populate(&mut rule, k8s_rule.to.as_deref(), k8s_rule.ports.as_deref())?;
    Ok(rule)
}
