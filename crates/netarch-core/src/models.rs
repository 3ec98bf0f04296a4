use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Connection records: the input. One record per observed flow.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    #[default]
    Unknown,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Unknown => write!(f, "*"),
        }
    }
}

/// One observed network flow between two hosts. Immutable once parsed:
/// the analyzer only derives aggregate views, it never edits a record.
/// Self-loops (source == destination) are kept and treated as local traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub source_ip: String,
    pub destination_ip: String,
    pub destination_port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub application_name: Option<String>,
    #[serde(default)]
    pub process_name: Option<String>,
}

impl ConnectionRecord {
    pub fn new(
        source_ip: impl Into<String>,
        destination_ip: impl Into<String>,
        destination_port: u16,
    ) -> Self {
        Self {
            source_ip: source_ip.into(),
            destination_ip: destination_ip.into(),
            destination_port,
            protocol: Protocol::Unknown,
            application_name: None,
            process_name: None,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_application(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn with_process(mut self, name: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Evidence: every connectivity inference MUST point back at records.
// ---------------------------------------------------------------------------

/// Reference into the input record sequence, so a rendered report can cite
/// the exact flows that support an inference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRef {
    pub record_index: usize,
    pub description: String,
}

impl EvidenceRef {
    pub fn from_record(index: usize, record: &ConnectionRecord) -> Self {
        Self {
            record_index: index,
            description: format!(
                "{} -> {}:{} ({})",
                record.source_ip, record.destination_ip, record.destination_port, record.protocol
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived structures: subnet candidates, rules, placements, patterns
// ---------------------------------------------------------------------------

/// Heuristic grouping of hosts sharing a /24-equivalent prefix. Created once
/// per analysis run, never mutated afterwards. Numbering in `suggested_name`
/// follows first-seen prefix order in the input, which makes naming stable
/// across runs over the same data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetCandidate {
    /// First three octets of the member addresses, e.g. "10.0.1".
    pub network_prefix: String,
    /// Unique member addresses in first-seen order.
    pub member_ips: Vec<String>,
    /// Distinct application_name values observed among member traffic.
    pub service_count: usize,
    pub suggested_name: String,
    pub purpose: String,
}

/// Static knowledge linking a port to a human label. The catalog assembled
/// from these is read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortServiceMapping {
    pub port: u16,
    pub protocol: Protocol,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAccess {
    Allow,
    Deny,
}

/// One recommended perimeter (NSG) rule. Names are unique within a run;
/// lower priority ordinals are evaluated first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRuleCandidate {
    pub name: String,
    pub direction: RuleDirection,
    pub access: RuleAccess,
    /// None for wildcard rules (deny-all baseline).
    pub port: Option<u16>,
    pub protocol: Protocol,
    pub source_scope: String,
    pub destination_scope: String,
    pub priority: u16,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancerType {
    ApplicationGateway,
    InternalLoadBalancer,
}

/// One high-fan-in destination worth fronting with a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerRecommendation {
    pub destination_ip: String,
    pub distinct_source_count: usize,
    pub suggested_type: LoadBalancerType,
    /// The threshold/traffic observation that triggered the recommendation.
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Hybrid,
    ServiceToService,
    Internal,
}

/// A classified cross-boundary relationship. Never emitted without evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityPattern {
    pub category: PatternCategory,
    pub evidence: Vec<EvidenceRef>,
}

// ---------------------------------------------------------------------------
// The recommendation: top-level container, primary API contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityScore {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ComplexityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Counts surfaced for the caller to log. Malformed records and catalog
/// misses are metrics, never errors: the analysis always completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub total_records: usize,
    pub valid_records: usize,
    pub malformed_records: usize,
    pub catalog_misses: usize,
    pub external_dependency_count: usize,
    pub analysis_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub netarch_version: String,
    pub generated_at: DateTime<Utc>,
}

impl RunMetadata {
    pub fn new() -> Self {
        Self {
            run_id: format!("R-{}", Uuid::new_v4().as_simple()),
            netarch_version: crate::VERSION.to_string(),
            generated_at: Utc::now(),
        }
    }
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// The aggregate result. Owned and frozen by the aggregator; all four
/// sequences are always present (possibly empty) and complexity is always set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureRecommendation {
    pub metadata: RunMetadata,
    pub subnets: Vec<SubnetCandidate>,
    pub security_rules: Vec<SecurityRuleCandidate>,
    pub load_balancers: Vec<LoadBalancerRecommendation>,
    pub connectivity_patterns: Vec<ConnectivityPattern>,
    pub complexity_score: ComplexityScore,
    pub metrics: AnalysisMetrics,
}
