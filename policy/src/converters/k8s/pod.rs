// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use k8s_openapi::api::core::v1::Pod;
use std::net::IpAddr;

use crate::converters::k8s::FromK8sConversionError;
use crate::peers::PodPeer;

fn parse_pod_ip(ip: &str) -> Result<IpAddr, FromK8sConversionError> {
    ip.parse::<IpAddr>()
        .map_err(|e| FromK8sConversionError::ParseError(format!("pod IP '{ip}': {e}")))
}

/// Convert a pod selected as a peer. Its addresses are taken from `status.podIPs`, or from
/// `status.podIP` on servers that only report one. A pod with no address yet converts to a peer
/// with no address.
impl TryFrom<&Pod> for PodPeer {
    type Error = FromK8sConversionError;

    fn try_from(pod: &Pod) -> Result<Self, Self::Error> {
        let namespace = pod
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| FromK8sConversionError::MissingData("pod namespace".to_string()))?;
        let name = pod
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| FromK8sConversionError::MissingData("pod name".to_string()))?;

        let mut ips = Vec::new();
        if let Some(status) = &pod.status {
            match &status.pod_ips {
                Some(pod_ips) if !pod_ips.is_empty() => {
                    for pod_ip in pod_ips {
                        ips.push(parse_pod_ip(&pod_ip.ip)?);
                    }
                }
                _ => {
                    if let Some(ip) = &status.pod_ip {
                        ips.push(parse_pod_ip(ip)?);
                    }
                }
            }
        }
        Ok(PodPeer::new(namespace, name, ips))
    }
}
