use std::collections::HashSet;

use crate::catalog::{is_web_facing, ServiceCatalog};
use crate::models::*;
use crate::topology::record_is_valid;

// Data-derived rules are numbered from here upwards; the fixed baseline sits
// at the bottom of the evaluation order.
const FIRST_RULE_PRIORITY: u16 = 100;
const RULE_PRIORITY_STEP: u16 = 10;
const HEALTH_PROBE_PRIORITY: u16 = 4000;
const DENY_ALL_PRIORITY: u16 = 4096;
// Data-derived priorities never reach the baseline band.
const MAX_DERIVED_PRIORITY: u16 = HEALTH_PROBE_PRIORITY - RULE_PRIORITY_STEP;

// ---------------------------------------------------------------------------
// RuleSynthesizer: classified traffic -> perimeter rule candidates
// ---------------------------------------------------------------------------

pub struct RuleSynthesizer;

impl RuleSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// One rule per distinct (port, protocol, label) triple observed across
    /// the whole data set, not per connection. High-value services (database,
    /// RPC) are evaluated first; generic-port rules go last among the
    /// data-derived set, and the fixed baseline is always appended.
    pub fn synthesize(
        &self,
        records: &[ConnectionRecord],
        catalog: &ServiceCatalog,
    ) -> Vec<SecurityRuleCandidate> {
        let mut seen: HashSet<(u16, Protocol, String)> = HashSet::new();
        let mut high_value: Vec<(u16, Protocol, String)> = Vec::new();
        let mut standard: Vec<(u16, Protocol, String)> = Vec::new();
        let mut generic: Vec<(u16, Protocol, String)> = Vec::new();

        for record in records.iter().filter(|r| record_is_valid(r)) {
            let classification = catalog.classify(record);
            let key = (
                record.destination_port,
                record.protocol,
                classification.label.clone(),
            );
            if !seen.insert(key.clone()) {
                continue;
            }
            if classification.is_catalog_hit() && is_high_value_label(&key.2) {
                high_value.push(key);
            } else if classification.is_catalog_hit() {
                standard.push(key);
            } else {
                generic.push(key);
            }
        }

        let mut rules = Vec::new();
        let mut used_names: HashSet<String> = HashSet::new();
        let mut priority = FIRST_RULE_PRIORITY;

        for (port, protocol, label) in high_value
            .into_iter()
            .chain(standard)
            .chain(generic)
        {
            let name = unique_rule_name(&label, port, protocol, &mut used_names);
            let source_scope = if is_web_facing(port, &label) {
                "Internet".to_string()
            } else {
                "VirtualNetwork".to_string()
            };
            rules.push(SecurityRuleCandidate {
                name,
                direction: RuleDirection::Inbound,
                access: RuleAccess::Allow,
                port: Some(port),
                protocol,
                source_scope,
                destination_scope: "VirtualNetwork".to_string(),
                priority,
                label,
            });
            priority = priority
                .saturating_add(RULE_PRIORITY_STEP)
                .min(MAX_DERIVED_PRIORITY);
        }

        rules.extend(baseline_rules());

        tracing::info!(count = rules.len(), "rule synthesis complete");
        rules
    }
}

impl Default for RuleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_high_value_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("database") || lower.contains("oracle") || lower.contains("sql") || lower.contains("rpc")
}

/// Rule names are unique within a run. The base name comes from the service
/// label; collisions are disambiguated by appending the port, then the
/// protocol.
fn unique_rule_name(
    label: &str,
    port: u16,
    protocol: Protocol,
    used: &mut HashSet<String>,
) -> String {
    let base = format!("allow-{}", slug(label));
    if used.insert(base.clone()) {
        return base;
    }
    let with_port = format!("{}-{}", base, port);
    if used.insert(with_port.clone()) {
        return with_port;
    }
    let with_protocol = format!("{}-{}", with_port, slug(&protocol.to_string()));
    if used.insert(with_protocol.clone()) {
        return with_protocol;
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", with_protocol, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}

/// Standard hygiene rules appended after data-derived rules regardless of
/// observed traffic.
fn baseline_rules() -> Vec<SecurityRuleCandidate> {
    vec![
        SecurityRuleCandidate {
            name: "allow-health-probe".to_string(),
            direction: RuleDirection::Inbound,
            access: RuleAccess::Allow,
            port: None,
            protocol: Protocol::Unknown,
            source_scope: "AzureLoadBalancer".to_string(),
            destination_scope: "VirtualNetwork".to_string(),
            priority: HEALTH_PROBE_PRIORITY,
            label: "Load balancer health probe".to_string(),
        },
        SecurityRuleCandidate {
            name: "deny-all-inbound".to_string(),
            direction: RuleDirection::Inbound,
            access: RuleAccess::Deny,
            port: None,
            protocol: Protocol::Unknown,
            source_scope: "*".to_string(),
            destination_scope: "*".to_string(),
            priority: DENY_ALL_PRIORITY,
            label: "Default deny".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(port: u16, protocol: Protocol) -> ConnectionRecord {
        ConnectionRecord::new("10.0.0.1", "10.0.0.2", port).with_protocol(protocol)
    }

    #[test]
    fn test_one_rule_per_triple() {
        let records = vec![
            rec(1521, Protocol::Tcp),
            rec(1521, Protocol::Tcp),
            rec(1521, Protocol::Tcp),
            rec(80, Protocol::Tcp),
        ];
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        let derived: Vec<_> = rules.iter().filter(|r| r.port.is_some()).collect();
        assert_eq!(derived.len(), 2);
    }

    #[test]
    fn test_high_value_rules_evaluated_first() {
        let records = vec![
            rec(80, Protocol::Tcp),
            rec(8200, Protocol::Tcp),
            rec(1521, Protocol::Tcp),
            rec(111, Protocol::Tcp),
        ];
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        assert!(rules[0].label.contains("Oracle"));
        assert!(rules[1].label.contains("RPC"));
        assert_eq!(rules[0].priority, FIRST_RULE_PRIORITY);
        assert!(rules[0].priority < rules[2].priority);
        // generic-port rule lands after all catalog-labeled rules
        let generic_pos = rules.iter().position(|r| r.label == "Custom Port 8200").unwrap();
        let web_pos = rules.iter().position(|r| r.label == "HTTP Web").unwrap();
        assert!(generic_pos > web_pos);
    }

    #[test]
    fn test_baseline_always_appended() {
        let rules = RuleSynthesizer::new().synthesize(&[], &ServiceCatalog::builtin());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "allow-health-probe");
        assert_eq!(rules[1].name, "deny-all-inbound");
        assert_eq!(rules[1].access, RuleAccess::Deny);
        assert_eq!(rules[1].priority, DENY_ALL_PRIORITY);
    }

    #[test]
    fn test_rule_names_unique() {
        // same observed label on two ports slugs to the same base name
        let records = vec![
            rec(9000, Protocol::Tcp).with_application("Billing App"),
            rec(9001, Protocol::Tcp).with_application("Billing App"),
        ];
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        assert_eq!(rules[0].name, "allow-billing-app");
        assert_eq!(rules[1].name, "allow-billing-app-9001");
        let names: HashSet<_> = rules.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names.len(), rules.len());
    }

    #[test]
    fn test_rule_names_unique_under_deep_collision() {
        // four distinct labels on the same port and protocol, all slugging
        // to the same base name
        let records = vec![
            rec(9000, Protocol::Tcp).with_application("Billing App"),
            rec(9000, Protocol::Tcp).with_application("billing app"),
            rec(9000, Protocol::Tcp).with_application("Billing-App"),
            rec(9000, Protocol::Tcp).with_application("billing.app"),
        ];
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        let names: HashSet<_> = rules.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names.len(), rules.len());
        assert_eq!(rules[0].name, "allow-billing-app");
        assert_eq!(rules[1].name, "allow-billing-app-9000");
        assert_eq!(rules[2].name, "allow-billing-app-9000-tcp");
        assert_eq!(rules[3].name, "allow-billing-app-9000-tcp-2");
    }

    #[test]
    fn test_derived_priorities_stay_below_baseline() {
        let records: Vec<ConnectionRecord> = (0..400u16)
            .map(|i| rec(20000 + i, Protocol::Tcp))
            .collect();
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        let max_derived = rules
            .iter()
            .filter(|r| r.port.is_some())
            .map(|r| r.priority)
            .max()
            .unwrap();
        assert!(max_derived < HEALTH_PROBE_PRIORITY);
        // baseline keeps the last-evaluated slots
        assert_eq!(rules[rules.len() - 2].priority, HEALTH_PROBE_PRIORITY);
        assert_eq!(rules[rules.len() - 1].priority, DENY_ALL_PRIORITY);
    }

    #[test]
    fn test_web_rules_scoped_to_internet() {
        let records = vec![rec(443, Protocol::Tcp), rec(1521, Protocol::Tcp)];
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        let web = rules.iter().find(|r| r.port == Some(443)).unwrap();
        let db = rules.iter().find(|r| r.port == Some(1521)).unwrap();
        assert_eq!(web.source_scope, "Internet");
        assert_eq!(db.source_scope, "VirtualNetwork");
    }

    #[test]
    fn test_malformed_records_ignored() {
        let records = vec![ConnectionRecord::new("bad", "10.0.0.5", 1521)];
        let rules = RuleSynthesizer::new().synthesize(&records, &ServiceCatalog::builtin());
        assert!(rules.iter().all(|r| r.port.is_none()));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Oracle Database"), "oracle-database");
        assert_eq!(slug("HTTP Web (Alternate)"), "http-web-alternate");
        assert_eq!(slug("  "), "unnamed");
    }
}
