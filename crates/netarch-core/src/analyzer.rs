use std::time::Instant;

use crate::catalog::ServiceCatalog;
use crate::connectivity::ConnectivityDetector;
use crate::loadbalance::{LbAdvisor, DEFAULT_FAN_IN_THRESHOLD};
use crate::models::*;
use crate::rules::RuleSynthesizer;
use crate::topology::{record_is_valid, TopologyAnalyzer};

// ---------------------------------------------------------------------------
// AnalyzerConfig: heuristic thresholds, explicit rather than magic numbers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// A destination needs more distinct sources than this to earn a
    /// load-balancer recommendation.
    pub fan_in_threshold: usize,
    /// A valid-connection count at or above this forces at least High
    /// complexity, regardless of the composite score.
    pub high_traffic_connections: usize,
    /// Composite score (connections + subnets + external dependencies)
    /// floors for the Medium and High buckets.
    pub medium_complexity_floor: usize,
    pub high_complexity_floor: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fan_in_threshold: DEFAULT_FAN_IN_THRESHOLD,
            high_traffic_connections: 200,
            medium_complexity_floor: 40,
            high_complexity_floor: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// ArchitectureAnalyzer: runs the five stages and freezes the result
// ---------------------------------------------------------------------------

/// The aggregator. Owns the catalog and thresholds; every call to `analyze`
/// is a pure single pass over the record slice and always produces a
/// best-effort recommendation, whatever survives filtering.
pub struct ArchitectureAnalyzer {
    config: AnalyzerConfig,
    catalog: ServiceCatalog,
}

impl ArchitectureAnalyzer {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            catalog: ServiceCatalog::builtin(),
        }
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: ServiceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn analyze(&self, records: &[ConnectionRecord]) -> ArchitectureRecommendation {
        let started = Instant::now();

        let topology = TopologyAnalyzer::new().build(records);
        let security_rules = RuleSynthesizer::new().synthesize(records, &self.catalog);
        let load_balancers =
            LbAdvisor::new(self.config.fan_in_threshold).advise(records, &self.catalog);
        let connectivity_patterns =
            ConnectivityDetector::new().detect(records, &topology.subnets);

        let valid_records = records.iter().filter(|r| record_is_valid(r)).count();
        let catalog_misses = records
            .iter()
            .filter(|r| record_is_valid(r))
            .filter(|r| !self.catalog.classify(r).is_catalog_hit())
            .count();

        let complexity_score = self.score_complexity(
            valid_records,
            topology.subnets.len(),
            topology.external_prefixes.len(),
        );

        let metrics = AnalysisMetrics {
            total_records: records.len(),
            valid_records,
            malformed_records: topology.malformed_records,
            catalog_misses,
            external_dependency_count: topology.external_prefixes.len(),
            analysis_duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            subnets = topology.subnets.len(),
            rules = security_rules.len(),
            load_balancers = load_balancers.len(),
            patterns = connectivity_patterns.len(),
            complexity = %complexity_score,
            malformed = metrics.malformed_records,
            "analysis complete"
        );

        ArchitectureRecommendation {
            metadata: RunMetadata::new(),
            subnets: topology.subnets,
            security_rules,
            load_balancers,
            connectivity_patterns,
            complexity_score,
            metrics,
        }
    }

    fn score_complexity(
        &self,
        connections: usize,
        subnets: usize,
        externals: usize,
    ) -> ComplexityScore {
        if connections == 0 {
            return ComplexityScore::Low;
        }
        if connections >= self.config.high_traffic_connections {
            return ComplexityScore::High;
        }
        let composite = connections + subnets + externals;
        if composite >= self.config.high_complexity_floor {
            ComplexityScore::High
        } else if composite >= self.config.medium_complexity_floor {
            ComplexityScore::Medium
        } else {
            ComplexityScore::Low
        }
    }
}

impl Default for ArchitectureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
