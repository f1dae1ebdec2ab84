// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use k8s_openapi::api::networking::v1::NetworkPolicyPort;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tracing::warn;

use crate::converters::k8s::FromK8sConversionError;
use crate::l4::PortPolicy;

// k8s defaults the protocol of a port to TCP
const DEFAULT_PROTOCOL: &str = "TCP";

fn port_number(value: i32, what: &str) -> Result<u16, FromK8sConversionError> {
    u16::try_from(value)
        .map_err(|_| FromK8sConversionError::Invalid(format!("{what} {value} is out of range")))
}

impl TryFrom<&NetworkPolicyPort> for PortPolicy {
    type Error = FromK8sConversionError;

    fn try_from(k8s_port: &NetworkPolicyPort) -> Result<Self, Self::Error> {
        let protocol = k8s_port.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL);
        let port = match &k8s_port.port {
            None => 0,
            Some(IntOrString::Int(port)) => port_number(*port, "port")?,
            Some(IntOrString::String(name)) => {
                // named ports resolve to a number per pod, which a single match cannot express
                warn!("Named {protocol} port '{name}' is not supported");
                return Err(FromK8sConversionError::Unsupported(format!(
                    "named {protocol} port '{name}'"
                )));
            }
        };
        let end_port = match k8s_port.end_port {
            None => 0,
            Some(end_port) => port_number(end_port, "endPort")?,
        };
        if end_port != 0 {
            if port == 0 {
                return Err(FromK8sConversionError::Invalid(format!(
                    "endPort {end_port} requires a numeric port"
                )));
            }
            if end_port < port {
                return Err(FromK8sConversionError::Invalid(format!(
                    "endPort {end_port} is lower than port {port}"
                )));
            }
        }
        Ok(PortPolicy::new(protocol, port, end_port))
    }
}

#[cfg(test)]
mod test {
    use crate::converters::k8s::FromK8sConversionError;
    use crate::l4::PortPolicy;
    use k8s_openapi::api::networking::v1::NetworkPolicyPort;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use tracing_test::traced_test;

    fn k8s_port(
        protocol: Option<&str>,
        port: Option<IntOrString>,
        end_port: Option<i32>,
    ) -> NetworkPolicyPort {
        NetworkPolicyPort {
            protocol: protocol.map(str::to_string),
            port,
            end_port,
        }
    }

    #[test]
    fn test_port_conversion() {
        let pp =
            PortPolicy::try_from(&k8s_port(Some("UDP"), Some(IntOrString::Int(53)), None)).unwrap();
        assert_eq!(pp, PortPolicy::new("UDP", 53, 0));
        assert_eq!(pp.l4_match(), "udp && udp.dst==53");

        let pp =
            PortPolicy::try_from(&k8s_port(None, Some(IntOrString::Int(300)), Some(310))).unwrap();
        assert_eq!(pp.l4_match(), "tcp && 300<=tcp.dst<=310");

        let pp = PortPolicy::try_from(&k8s_port(Some("SCTP"), None, None)).unwrap();
        assert_eq!(pp.l4_match(), "sctp");
    }

    #[test]
    #[traced_test]
    fn test_named_port() {
        let res = PortPolicy::try_from(&k8s_port(
            Some("TCP"),
            Some(IntOrString::String("http".to_string())),
            None,
        ));
        assert_eq!(
            res,
            Err(FromK8sConversionError::Unsupported(
                "named TCP port 'http'".to_string()
            ))
        );
        assert!(logs_contain("Named TCP port 'http' is not supported"));
    }

    #[test]
    fn test_invalid_ports() {
        assert!(matches!(
            PortPolicy::try_from(&k8s_port(None, Some(IntOrString::Int(70000)), None)),
            Err(FromK8sConversionError::Invalid(_))
        ));
        assert!(matches!(
            PortPolicy::try_from(&k8s_port(None, Some(IntOrString::Int(-1)), None)),
            Err(FromK8sConversionError::Invalid(_))
        ));
        assert!(matches!(
            PortPolicy::try_from(&k8s_port(None, None, Some(80))),
            Err(FromK8sConversionError::Invalid(_))
        ));
        assert!(matches!(
            PortPolicy::try_from(&k8s_port(None, Some(IntOrString::Int(310)), Some(300))),
            Err(FromK8sConversionError::Invalid(_))
        ));
    }
}
