use std::collections::{BTreeSet, HashMap, HashSet};

use crate::catalog::{is_web_facing, ServiceCatalog};
use crate::models::*;
use crate::topology::record_is_valid;

/// A destination seen from more than this many distinct sources gets a
/// load-balancer recommendation. Low on purpose: this is a fan-in detection
/// heuristic over traffic samples, not a statistical model.
pub const DEFAULT_FAN_IN_THRESHOLD: usize = 1;

// ---------------------------------------------------------------------------
// LbAdvisor: fan-in detection over destinations
// ---------------------------------------------------------------------------

pub struct LbAdvisor {
    fan_in_threshold: usize,
}

impl LbAdvisor {
    pub fn new(fan_in_threshold: usize) -> Self {
        Self { fan_in_threshold }
    }

    /// Recommend a load balancer for every destination whose distinct-source
    /// count exceeds the threshold. Ordered by descending fan-in; ties break
    /// on ascending destination_ip, compared lexically on the dotted-quad
    /// string (exact numeric IP ordering is not required for usefulness).
    pub fn advise(
        &self,
        records: &[ConnectionRecord],
        catalog: &ServiceCatalog,
    ) -> Vec<LoadBalancerRecommendation> {
        let mut destinations: HashMap<String, DestState> = HashMap::new();

        for record in records.iter().filter(|r| record_is_valid(r)) {
            let state = destinations
                .entry(record.destination_ip.clone())
                .or_default();
            state.sources.insert(record.source_ip.clone());
            state.ports.insert(record.destination_port);
            let classification = catalog.classify(record);
            if is_web_facing(record.destination_port, &classification.label) {
                state.web_facing = true;
            }
        }

        let mut recs: Vec<LoadBalancerRecommendation> = destinations
            .into_iter()
            .filter(|(_, state)| state.sources.len() > self.fan_in_threshold)
            .map(|(destination_ip, state)| {
                let ports: Vec<String> = state.ports.iter().map(|p| p.to_string()).collect();
                let suggested_type = if state.web_facing {
                    LoadBalancerType::ApplicationGateway
                } else {
                    LoadBalancerType::InternalLoadBalancer
                };
                LoadBalancerRecommendation {
                    rationale: format!(
                        "{} distinct sources (threshold {}) across port(s) {}",
                        state.sources.len(),
                        self.fan_in_threshold,
                        ports.join(", ")
                    ),
                    distinct_source_count: state.sources.len(),
                    destination_ip,
                    suggested_type,
                }
            })
            .collect();

        recs.sort_by(|a, b| {
            b.distinct_source_count
                .cmp(&a.distinct_source_count)
                .then_with(|| a.destination_ip.cmp(&b.destination_ip))
        });

        tracing::info!(count = recs.len(), "load-balancing pass complete");
        recs
    }
}

impl Default for LbAdvisor {
    fn default() -> Self {
        Self::new(DEFAULT_FAN_IN_THRESHOLD)
    }
}

#[derive(Default)]
struct DestState {
    sources: HashSet<String>,
    ports: BTreeSet<u16>,
    web_facing: bool,
}
