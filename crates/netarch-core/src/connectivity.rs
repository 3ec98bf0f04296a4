use std::collections::HashSet;

use crate::models::*;
use crate::topology::{network_prefix, record_is_valid};

// ---------------------------------------------------------------------------
// ConnectivityDetector: cross-boundary flow classification
// ---------------------------------------------------------------------------

pub struct ConnectivityDetector;

impl ConnectivityDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify every valid record against the derived subnet groupings.
    ///
    /// An endpoint whose prefix appears in no subnet candidate sits outside
    /// the observed internal ranges and is evidence for a Hybrid pattern.
    /// Differing subnets are evidence for ServiceToService; same subnet
    /// (including self-loops) is Internal. A pattern is only emitted when it
    /// can cite evidence.
    pub fn detect(
        &self,
        records: &[ConnectionRecord],
        subnets: &[SubnetCandidate],
    ) -> Vec<ConnectivityPattern> {
        let known_prefixes: HashSet<&str> = subnets
            .iter()
            .filter(|s| !s.network_prefix.is_empty())
            .map(|s| s.network_prefix.as_str())
            .collect();

        let mut hybrid = Vec::new();
        let mut service_to_service = Vec::new();
        let mut internal = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if !record_is_valid(record) {
                continue;
            }
            let src = network_prefix(&record.source_ip).unwrap_or_default();
            let dst = network_prefix(&record.destination_ip).unwrap_or_default();
            let evidence = EvidenceRef::from_record(index, record);

            if !known_prefixes.contains(src.as_str()) || !known_prefixes.contains(dst.as_str()) {
                hybrid.push(evidence);
            } else if src != dst {
                service_to_service.push(evidence);
            } else {
                internal.push(evidence);
            }
        }

        let mut patterns = Vec::new();
        for (category, evidence) in [
            (PatternCategory::Hybrid, hybrid),
            (PatternCategory::ServiceToService, service_to_service),
            (PatternCategory::Internal, internal),
        ] {
            if !evidence.is_empty() {
                patterns.push(ConnectivityPattern { category, evidence });
            }
        }

        tracing::info!(count = patterns.len(), "connectivity classification complete");
        patterns
    }
}

impl Default for ConnectivityDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyAnalyzer;

    fn rec(src: &str, dst: &str, port: u16) -> ConnectionRecord {
        ConnectionRecord::new(src, dst, port)
    }

    fn detect(records: &[ConnectionRecord]) -> Vec<ConnectivityPattern> {
        let outcome = TopologyAnalyzer::new().build(records);
        ConnectivityDetector::new().detect(records, &outcome.subnets)
    }

    fn find(patterns: &[ConnectivityPattern], cat: PatternCategory) -> Option<&ConnectivityPattern> {
        patterns.iter().find(|p| p.category == cat)
    }

    #[test]
    fn test_cross_subnet_is_service_to_service() {
        let patterns = detect(&[rec("10.0.1.5", "10.0.2.5", 8100)]);
        let p = find(&patterns, PatternCategory::ServiceToService).unwrap();
        assert_eq!(p.evidence.len(), 1);
        assert_eq!(p.evidence[0].record_index, 0);
        assert!(find(&patterns, PatternCategory::Hybrid).is_none());
    }

    #[test]
    fn test_external_endpoint_is_hybrid() {
        let patterns = detect(&[
            rec("10.0.1.5", "52.239.160.10", 443),
            rec("10.0.1.5", "10.0.1.6", 445),
        ]);
        let hybrid = find(&patterns, PatternCategory::Hybrid).unwrap();
        assert_eq!(hybrid.evidence.len(), 1);
        assert_eq!(hybrid.evidence[0].record_index, 0);
        let internal = find(&patterns, PatternCategory::Internal).unwrap();
        assert_eq!(internal.evidence[0].record_index, 1);
    }

    #[test]
    fn test_self_loop_is_internal() {
        let patterns = detect(&[rec("10.0.1.5", "10.0.1.5", 8100)]);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].category, PatternCategory::Internal);
    }

    #[test]
    fn test_no_evidence_no_pattern() {
        assert!(detect(&[]).is_empty());
        // malformed-only input yields nothing rather than an empty pattern
        assert!(detect(&[rec("bad", "10.0.0.5", 80)]).is_empty());
    }
}
