use std::collections::{HashMap, HashSet};

use crate::models::*;

/// Reserved infrastructure subnets appended to every analysis, regardless of
/// observed traffic. Names follow the cloud provider's reserved conventions.
pub const GATEWAY_SUBNET_NAME: &str = "GatewaySubnet";
pub const BASTION_SUBNET_NAME: &str = "AzureBastionSubnet";

// ---------------------------------------------------------------------------
// IP helpers
// ---------------------------------------------------------------------------

/// Parse a dotted-quad address into octets. Rejects anything that is not
/// exactly four dot-separated numeric octets in 0-255.
fn parse_octets(ip: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = ip.split('.');
    for slot in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// First-three-octet prefix used as the /24-equivalent grouping key.
/// Returns None for malformed addresses.
///
/// This is an inherited heuristic: real subnets are not always /24, but the
/// input data carries no subnet masks, so the first three octets stand in
/// for the subnet boundary.
pub fn network_prefix(ip: &str) -> Option<String> {
    let o = parse_octets(ip)?;
    Some(format!("{}.{}.{}", o[0], o[1], o[2]))
}

/// RFC 1918 private ranges plus loopback. Addresses outside these ranges are
/// treated as external dependencies, not subnet material.
pub fn is_private_ip(ip: &str) -> bool {
    match parse_octets(ip) {
        Some([10, ..]) => true,
        Some([172, b, ..]) => (16..=31).contains(&b),
        Some([192, 168, ..]) => true,
        Some([127, ..]) => true,
        _ => false,
    }
}

/// A record participates in analysis only when both endpoints parse.
pub fn record_is_valid(record: &ConnectionRecord) -> bool {
    parse_octets(&record.source_ip).is_some() && parse_octets(&record.destination_ip).is_some()
}

// ---------------------------------------------------------------------------
// TopologyAnalyzer: prefix grouping into subnet candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TopologyOutcome {
    /// Derived candidates in first-seen prefix order, then the reserved
    /// gateway and bastion subnets.
    pub subnets: Vec<SubnetCandidate>,
    /// How many of `subnets` were derived from traffic (the rest are reserved).
    pub derived_count: usize,
    /// Distinct non-private prefixes, first-seen order.
    pub external_prefixes: Vec<String>,
    /// Records excluded because an endpoint failed to parse.
    pub malformed_records: usize,
}

pub struct TopologyAnalyzer;

impl TopologyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, records: &[ConnectionRecord]) -> TopologyOutcome {
        // Ordered mapping keyed by prefix: numbering in generated names is a
        // contract, so iteration order must follow first-seen input order,
        // never HashMap order.
        let mut prefix_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, PrefixGroup> = HashMap::new();
        let mut external_order: Vec<String> = Vec::new();
        let mut external_seen: HashSet<String> = HashSet::new();
        let mut malformed = 0usize;

        for record in records {
            if !record_is_valid(record) {
                malformed += 1;
                continue;
            }
            for ip in [record.source_ip.as_str(), record.destination_ip.as_str()] {
                let prefix = match network_prefix(ip) {
                    Some(p) => p,
                    None => continue,
                };
                if !is_private_ip(ip) {
                    if external_seen.insert(prefix.clone()) {
                        external_order.push(prefix);
                    }
                    continue;
                }
                let group = groups.entry(prefix.clone()).or_insert_with(|| {
                    prefix_order.push(prefix.clone());
                    PrefixGroup::default()
                });
                if group.member_seen.insert(ip.to_string()) {
                    group.member_ips.push(ip.to_string());
                }
                if let Some(app) = &record.application_name {
                    group.applications.insert(app.clone());
                }
            }
        }

        let mut subnets: Vec<SubnetCandidate> = Vec::with_capacity(prefix_order.len() + 2);
        for (i, prefix) in prefix_order.iter().enumerate() {
            let group = &groups[prefix];
            subnets.push(SubnetCandidate {
                network_prefix: prefix.clone(),
                member_ips: group.member_ips.clone(),
                service_count: group.applications.len(),
                suggested_name: format!("app-subnet-{}", i + 1),
                purpose: format!(
                    "Workload subnet for {}.0/24 ({} hosts, {} observed services)",
                    prefix,
                    group.member_ips.len(),
                    group.applications.len()
                ),
            });
        }
        let derived_count = subnets.len();

        // Minimum network hygiene: gateway and bastion subnets are always
        // recommended, even for empty input.
        subnets.push(reserved_subnet(
            GATEWAY_SUBNET_NAME,
            "Reserved subnet for VPN/ExpressRoute gateway connectivity",
        ));
        subnets.push(reserved_subnet(
            BASTION_SUBNET_NAME,
            "Reserved subnet for bastion-based administrative access",
        ));

        tracing::info!(
            derived = derived_count,
            external = external_order.len(),
            malformed,
            "topology grouping complete"
        );

        TopologyOutcome {
            subnets,
            derived_count,
            external_prefixes: external_order,
            malformed_records: malformed,
        }
    }
}

impl Default for TopologyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct PrefixGroup {
    member_ips: Vec<String>,
    member_seen: HashSet<String>,
    applications: HashSet<String>,
}

fn reserved_subnet(name: &str, purpose: &str) -> SubnetCandidate {
    SubnetCandidate {
        network_prefix: String::new(),
        member_ips: Vec::new(),
        service_count: 0,
        suggested_name: name.to_string(),
        purpose: purpose.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(src: &str, dst: &str, port: u16) -> ConnectionRecord {
        ConnectionRecord::new(src, dst, port)
    }

    #[test]
    fn test_prefix_parsing() {
        assert_eq!(network_prefix("10.0.1.5"), Some("10.0.1".to_string()));
        assert_eq!(network_prefix("bad"), None);
        assert_eq!(network_prefix("10.0.1"), None);
        assert_eq!(network_prefix("10.0.1.5.6"), None);
        assert_eq!(network_prefix("10.0.1.256"), None);
        assert_eq!(network_prefix("10.0.01a.5"), None);
        assert_eq!(network_prefix(""), None);
    }

    #[test]
    fn test_private_detection() {
        assert!(is_private_ip("10.200.3.4"));
        assert!(is_private_ip("172.16.0.1"));
        assert!(is_private_ip("172.31.255.255"));
        assert!(!is_private_ip("172.32.0.1"));
        assert!(is_private_ip("192.168.1.1"));
        assert!(is_private_ip("127.0.0.1"));
        assert!(!is_private_ip("8.8.8.8"));
        assert!(!is_private_ip("not-an-ip"));
    }

    #[test]
    fn test_reserved_subnets_always_present() {
        let outcome = TopologyAnalyzer::new().build(&[]);
        assert_eq!(outcome.subnets.len(), 2);
        assert_eq!(outcome.derived_count, 0);
        assert_eq!(outcome.subnets[0].suggested_name, GATEWAY_SUBNET_NAME);
        assert_eq!(outcome.subnets[1].suggested_name, BASTION_SUBNET_NAME);
    }

    #[test]
    fn test_grouping_first_seen_order() {
        let records = vec![
            rec("10.0.2.1", "10.0.1.9", 80),
            rec("10.0.3.1", "10.0.2.2", 443),
            rec("10.0.1.4", "10.0.3.7", 22),
        ];
        let outcome = TopologyAnalyzer::new().build(&records);
        let names: Vec<&str> = outcome.subnets[..outcome.derived_count]
            .iter()
            .map(|s| s.network_prefix.as_str())
            .collect();
        // source scanned before destination within a record
        assert_eq!(names, vec!["10.0.2", "10.0.1", "10.0.3"]);
        assert_eq!(outcome.subnets[0].suggested_name, "app-subnet-1");
        assert_eq!(outcome.subnets[2].suggested_name, "app-subnet-3");
    }

    #[test]
    fn test_naming_deterministic_across_runs() {
        let records = vec![
            rec("192.168.1.1", "10.0.1.2", 1521),
            rec("10.0.2.3", "192.168.1.9", 80),
        ];
        let a = TopologyAnalyzer::new().build(&records);
        let b = TopologyAnalyzer::new().build(&records);
        let names = |o: &TopologyOutcome| {
            o.subnets
                .iter()
                .map(|s| (s.network_prefix.clone(), s.suggested_name.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn test_service_count_distinct_applications() {
        let records = vec![
            rec("10.0.1.1", "10.0.1.2", 80).with_application("web-frontend"),
            rec("10.0.1.3", "10.0.1.2", 80).with_application("web-frontend"),
            rec("10.0.1.4", "10.0.1.2", 1521).with_application("erp-db"),
            rec("10.0.1.5", "10.0.1.2", 8100),
        ];
        let outcome = TopologyAnalyzer::new().build(&records);
        assert_eq!(outcome.derived_count, 1);
        // missing application_name does not count
        assert_eq!(outcome.subnets[0].service_count, 2);
        assert_eq!(outcome.subnets[0].member_ips.len(), 5);
    }

    #[test]
    fn test_malformed_records_counted_not_fatal() {
        let records = vec![
            rec("bad", "10.0.0.5", 80),
            rec("10.0.0.1", "10.0.0.5", 80),
            rec("10.0.0.2", "300.1.1.1", 443),
        ];
        let outcome = TopologyAnalyzer::new().build(&records);
        assert_eq!(outcome.malformed_records, 2);
        assert_eq!(outcome.derived_count, 1);
        assert_eq!(outcome.subnets[0].member_ips, vec!["10.0.0.1", "10.0.0.5"]);
    }

    #[test]
    fn test_public_prefixes_become_external() {
        let records = vec![
            rec("10.0.1.1", "52.239.160.10", 443),
            rec("10.0.1.2", "52.239.160.11", 443),
            rec("10.0.1.3", "40.90.4.1", 443),
        ];
        let outcome = TopologyAnalyzer::new().build(&records);
        assert_eq!(outcome.derived_count, 1);
        assert_eq!(outcome.external_prefixes, vec!["52.239.160", "40.90.4"]);
    }

    #[test]
    fn test_self_loop_kept_as_local_traffic() {
        let records = vec![rec("10.0.1.1", "10.0.1.1", 8100)];
        let outcome = TopologyAnalyzer::new().build(&records);
        assert_eq!(outcome.derived_count, 1);
        assert_eq!(outcome.subnets[0].member_ips, vec!["10.0.1.1"]);
    }
}
