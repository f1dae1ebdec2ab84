// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use k8s_openapi::api::networking::v1::IPBlock;

use crate::ipblock::IpBlock;

impl From<&IPBlock> for IpBlock {
    fn from(block: &IPBlock) -> Self {
        IpBlock {
            cidr: block.cidr.clone(),
            except: block.except.clone().unwrap_or_default(),
        }
    }
}
