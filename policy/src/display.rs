// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations for the policy objects

use std::fmt::Display;

use crate::gress::{GressRule, PolicyDirection};
use crate::ipblock::IpBlock;
use crate::l4::{L4Protocol, PortPolicy};
use crate::peers::{PeerAddressSet, PodKey, PodPeer};

impl Display for PolicyDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for L4Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for IpBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cidr)?;
        if !self.except.is_empty() {
            write!(f, " except [{}]", self.except.join(", "))?;
        }
        Ok(())
    }
}

impl Display for PortPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.port, self.end_port) {
            (0, _) => write!(f, "{}", self.protocol),
            (port, 0) => write!(f, "{}/{port}", self.protocol),
            (port, end_port) => write!(f, "{}/[{port}-{end_port}]", self.protocol),
        }
    }
}

impl Display for PodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl Display for PodPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [", self.key)?;
        for (n, ip) in self.ips().iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ip}")?;
        }
        write!(f, "]")
    }
}

impl Display for PeerAddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "address set {}:", self.name())?;
        if self.is_empty() {
            return writeln!(f, "   (empty)");
        }
        for ip in self.ips() {
            let owners = self
                .owners(ip)
                .map(|owners| {
                    owners
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            writeln!(f, "   {ip:<40} {owners}")?;
        }
        Ok(())
    }
}

fn fmt_gress_rule_heading(f: &mut std::fmt::Formatter<'_>, rule: &GressRule) -> std::fmt::Result {
    writeln!(
        f,
        " ━━━━━━━━━━━━━━━━━ {}/{} {} rule {} ━━━━━━━━━━━━━━━━━",
        rule.namespace(),
        rule.policy_name(),
        rule.direction(),
        rule.index()
    )
}

impl Display for GressRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_gress_rule_heading(f, self)?;
        writeln!(f, " ip blocks:")?;
        for block in self.ip_blocks() {
            writeln!(f, "   {block}")?;
        }
        writeln!(f, " ports:")?;
        for port in self.port_policies() {
            writeln!(f, "   {port}")?;
        }
        match self.peer_address_set() {
            Some(peers) => write!(f, " {peers}"),
            None => writeln!(f, " address set {}: (not created)", self.peer_address_set_name()),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::config::CompilerConfig;
    use crate::gress::{GressRule, PolicyDirection};
    use crate::ipblock::IpBlock;
    use crate::l4::PortPolicy;
    use crate::peers::PodPeer;
    use addrset::FakeAddressSetFactory;

    #[test]
    fn test_display() {
        let factory = FakeAddressSetFactory::new();
        let mut rule = GressRule::new(
            PolicyDirection::Ingress,
            0,
            "ns1",
            "pol1",
            &CompilerConfig::default(),
        );
        rule.add_ip_block(IpBlock::new("0.0.0.0/0").except("10.1.0.0/16"));
        rule.add_port_policy(PortPolicy::new("TCP", 80, 0));
        rule.add_port_policy(PortPolicy::new("UDP", 1000, 1010));
        let text = rule.to_string();
        assert!(text.contains("ns1/pol1 ingress rule 0"));
        assert!(text.contains("0.0.0.0/0 except [10.1.0.0/16]"));
        assert!(text.contains("TCP/80"));
        assert!(text.contains("UDP/[1000-1010]"));
        assert!(text.contains("(not created)"));

        rule.ensure_peer_address_set(&factory).unwrap();
        let pod = PodPeer::new("ns1", "pod1", ["10.0.0.1".parse().unwrap()]);
        assert_eq!(pod.to_string(), "ns1/pod1 [10.0.0.1]");
        rule.add_peer_pods(&[pod]).unwrap();
        let text = rule.to_string();
        println!("{text}");
        assert!(text.contains("address set ns1.pol1.ingress.0:"));
        assert!(text.contains("ns1/pod1"));
    }
}
