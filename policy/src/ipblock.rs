// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IP block peers and their match expressions

use std::net::IpAddr;

/// An IP address family, as far as match expressions are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Tell the family of a CIDR literal. The literal is not validated: anything with a colon
    /// in it is taken to be IPv6.
    #[must_use]
    pub fn from_cidr(cidr: &str) -> Self {
        if cidr.contains(':') {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }

    #[must_use]
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    /// The layer-3 field prefix used in match expressions.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            IpFamily::V4 => "ip4",
            IpFamily::V6 => "ip6",
        }
    }

    /// The suffix that tells apart the per-family halves of an address set.
    #[must_use]
    pub fn address_set_suffix(self) -> &'static str {
        match self {
            IpFamily::V4 => "_v4",
            IpFamily::V6 => "_v6",
        }
    }

    /// The name of the half of address set `base` that holds this family's addresses.
    #[must_use]
    pub fn address_set_name(self, base: &str) -> String {
        format!("{base}{}", self.address_set_suffix())
    }
}

/// A CIDR peer of a rule, minus a list of excepted CIDRs.
///
/// All the `except` entries are expected to be of the same family as `cidr`, and all strings are
/// expected to be valid CIDRs: neither is checked here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IpBlock {
    pub cidr: String,
    pub except: Vec<String>,
}

impl IpBlock {
    #[must_use]
    pub fn new(cidr: &str) -> Self {
        Self {
            cidr: cidr.to_string(),
            except: Vec::new(),
        }
    }

    #[must_use]
    pub fn except(mut self, cidr: &str) -> Self {
        self.except.push(cidr.to_string());
        self
    }

    #[must_use]
    pub fn family(&self) -> IpFamily {
        IpFamily::from_cidr(&self.cidr)
    }

    /// The source-address part of the match for this block, e.g.
    /// `ip4.src == 0.0.0.0/0 && ip4.src != {10.1.0.0/16}`.
    #[must_use]
    pub fn l3_match(&self) -> String {
        let fam = self.family().token();
        let mut l3 = format!("{fam}.src == {}", self.cidr);
        if !self.except.is_empty() {
            l3.push_str(&format!(" && {fam}.src != {{{}}}", self.except.join(",")));
        }
        l3
    }
}

/// Build one match per block, in the order of `blocks`, joining each block's L3 match with the
/// `l4_match` and `lport_match` fragments. An empty fragment is left out rather than producing a
/// dangling `&&`.
#[must_use]
pub fn ip_block_match(blocks: &[IpBlock], lport_match: &str, l4_match: &str) -> Vec<String> {
    blocks
        .iter()
        .map(|block| {
            [block.l3_match().as_str(), l4_match, lport_match]
                .into_iter()
                .filter(|fragment| !fragment.is_empty())
                .collect::<Vec<_>>()
                .join(" && ")
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{IpBlock, IpFamily, ip_block_match};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_family() {
        assert_eq!(IpFamily::from_cidr("0.0.0.0/0"), IpFamily::V4);
        assert_eq!(IpFamily::from_cidr("::/0"), IpFamily::V6);
        assert_eq!(IpFamily::from_cidr("fd00:10:244:3::49/32"), IpFamily::V6);
        assert_eq!(IpFamily::of(&"10.0.0.1".parse().unwrap()), IpFamily::V4);
        assert_eq!(IpFamily::of(&"fd00::1".parse().unwrap()), IpFamily::V6);
        assert_eq!(IpFamily::V4.address_set_name("ns1.pol1.ingress.0"), "ns1.pol1.ingress.0_v4");
        assert_eq!(IpFamily::V6.address_set_name("ns1"), "ns1_v6");
    }

    #[test]
    fn test_l3_match() {
        let block = IpBlock::new("10.0.0.0/8")
            .except("10.1.0.0/16")
            .except("10.2.0.0/16");
        assert_eq!(
            block.l3_match(),
            "ip4.src == 10.0.0.0/8 && ip4.src != {10.1.0.0/16,10.2.0.0/16}"
        );
        let block = IpBlock::new("fd00::/8").except("fd00:1::/32");
        assert_eq!(
            block.l3_match(),
            "ip6.src == fd00::/8 && ip6.src != {fd00:1::/32}"
        );
    }

    #[test]
    fn test_empty_fragments_are_elided() {
        let blocks = [IpBlock::new("0.0.0.0/0")];
        assert_eq!(
            ip_block_match(&blocks, "fake", ""),
            vec!["ip4.src == 0.0.0.0/0 && fake"]
        );
        assert_eq!(
            ip_block_match(&blocks, "", "tcp"),
            vec!["ip4.src == 0.0.0.0/0 && tcp"]
        );
        assert_eq!(
            ip_block_match(&blocks, "", ""),
            vec!["ip4.src == 0.0.0.0/0"]
        );
    }

    #[test]
    fn test_no_blocks() {
        assert!(ip_block_match(&[], "fake", "input").is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let blocks = [IpBlock::new("10.0.0.0/8"), IpBlock::new("10.0.0.0/8")];
        assert_eq!(
            ip_block_match(&blocks, "fake", "input"),
            vec![
                "ip4.src == 10.0.0.0/8 && input && fake",
                "ip4.src == 10.0.0.0/8 && input && fake"
            ]
        );
    }
}
