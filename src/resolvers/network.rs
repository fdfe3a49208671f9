//! Ports, exposed ports, and network membership.
//!
//! `ports` entries win over `expose` entries for the same port number.

use crate::core::diagnostics::Diagnostics;
use crate::core::ir::{ContainerPort, PortForwarding, Protocol};
use crate::core::syntax::parse_port_range;
use crate::core::types::{NetworkDeclaration, PortConfig, ServiceNetwork};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Container ports and service forwardings for one service.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResolvedPorts {
    pub container_ports: Vec<ContainerPort>,
    pub forwardings: Vec<PortForwarding>,
}

/// Split an `expose` entry into its ports and protocol. Ranges expand.
fn parse_expose(entry: &str) -> Result<(Vec<u16>, Protocol), String> {
    let (number, protocol) = match entry.split_once('/') {
        Some((number, proto)) => (number, Protocol::from_name(proto)),
        None => (entry, Protocol::Tcp),
    };
    let (start, end) = parse_port_range(number)?;
    Ok(((start..=end).collect(), protocol))
}

/// Resolve `ports` and `expose` into container ports and forwardings.
///
/// A port without a published side forwards on its target number. Repeated
/// forwardings are kept; the service spec collapses them.
pub fn resolve_ports(
    ports: &[PortConfig],
    expose: &[String],
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> ResolvedPorts {
    let mut resolved = ResolvedPorts::default();
    let mut declared: HashSet<u16> = HashSet::new();

    for port in ports {
        declared.insert(port.target);
        let container_port = ContainerPort {
            container_port: port.target,
            protocol: Protocol::from_name(&port.protocol),
        };
        if !resolved.container_ports.contains(&container_port) {
            resolved.container_ports.push(container_port);
        }
        resolved.forwardings.push(PortForwarding {
            service_port: port.published.unwrap_or(port.target),
            pod_port: port.target,
        });
    }

    for entry in expose {
        let (numbers, protocol) = match parse_expose(entry) {
            Ok(parsed) => parsed,
            Err(e) => {
                diagnostics.warn(scope, format!("ignoring exposed port '{}': {}", entry, e));
                continue;
            }
        };
        for number in numbers {
            if !declared.insert(number) {
                continue;
            }
            resolved.container_ports.push(ContainerPort {
                container_port: number,
                protocol,
            });
            resolved.forwardings.push(PortForwarding {
                service_port: number,
                pod_port: number,
            });
        }
    }

    resolved
}

/// Resolve the networks a service joins. A declared `name:` wins over the key.
pub fn resolve_networks(
    attached: &IndexMap<String, ServiceNetwork>,
    declared: &IndexMap<String, NetworkDeclaration>,
) -> Vec<String> {
    attached
        .keys()
        .map(|key| {
            declared
                .get(key)
                .and_then(NetworkDeclaration::declared_name)
                .unwrap_or(key.as_str())
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::syntax::parse_port_spec;

    fn ports(specs: &[&str]) -> Vec<PortConfig> {
        specs.iter().flat_map(|s| parse_port_spec(s).unwrap()).collect()
    }

    fn expose(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ports_take_precedence_over_expose() {
        let mut d = Diagnostics::new();
        let r = resolve_ports(&ports(&["8080:80"]), &expose(&["80"]), "web", &mut d);
        assert_eq!(
            r.container_ports,
            vec![ContainerPort {
                container_port: 80,
                protocol: Protocol::Tcp
            }]
        );
        assert_eq!(
            r.forwardings,
            vec![PortForwarding {
                service_port: 8080,
                pod_port: 80
            }]
        );
    }

    #[test]
    fn test_expose_protocol_suffix_stripped_for_precedence() {
        let mut d = Diagnostics::new();
        let exposed = expose(&["90/udp", "91/udp"]);
        let r = resolve_ports(&ports(&["9000:90"]), &exposed, "web", &mut d);
        assert_eq!(r.container_ports.len(), 2);
        assert_eq!(r.container_ports[1].container_port, 91);
        assert_eq!(r.container_ports[1].protocol, Protocol::Udp);
        assert_eq!(r.forwardings[1].service_port, 91);
    }

    #[test]
    fn test_udp_only_when_explicit() {
        let mut d = Diagnostics::new();
        let r = resolve_ports(&ports(&["53:53/udp", "54:54/sctp"]), &[], "dns", &mut d);
        assert_eq!(r.container_ports[0].protocol, Protocol::Udp);
        assert_eq!(r.container_ports[1].protocol, Protocol::Tcp);
    }

    #[test]
    fn test_unpublished_port_forwards_on_target() {
        let mut d = Diagnostics::new();
        let r = resolve_ports(&ports(&["3000"]), &[], "web", &mut d);
        assert_eq!(r.forwardings[0].service_port, 3000);
        assert_eq!(r.forwardings[0].pod_port, 3000);
    }

    #[test]
    fn test_bad_expose_warns() {
        let mut d = Diagnostics::new();
        let r = resolve_ports(&[], &expose(&["http", "7000-7001"]), "web", &mut d);
        assert_eq!(r.container_ports.len(), 2);
        assert!(d.mentions("http"));
    }

    #[test]
    fn test_network_names() {
        let attached: IndexMap<String, ServiceNetwork> = ["front", "back", "loose"]
            .iter()
            .map(|n| (n.to_string(), ServiceNetwork::default()))
            .collect();
        let declared: IndexMap<String, NetworkDeclaration> =
            serde_yaml_ng::from_str("front:\n  name: edge-net\n  external: true\nback: {}\n")
                .unwrap();
        assert_eq!(resolve_networks(&attached, &declared), vec!["edge-net", "back", "loose"]);
    }
}
