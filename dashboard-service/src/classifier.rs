//! Engine classifier.
//!
//! Decides where the database logs of a target endpoint live. Decisions are
//! made by an ordered rule list; the first rule that returns a decision wins.
//! The cluster address pattern is only consulted when correlation already
//! produced a cluster id, so an address alone never selects a cluster log
//! group.

use regex::Regex;

use common::errors::{AppError, AppResult};
use common::models::EngineFamily;

use crate::templates::{template_for, LogSource};

const REGION: &str = r"[a-z]{2}(?:-gov)?-(?:north|south|central|east|west)(?:east|west)?-[1-9]";

/// What the classifier is asked about.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    /// Full server address of the endpoint.
    pub server_name: &'a str,
    /// Leading label of the server address.
    pub label: &'a str,
    /// Cluster id from correlation, if any.
    pub cluster_id: Option<&'a str>,
    pub family: EngineFamily,
}

/// Outcome of classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Query the log group of `source`.
    Logs(LogSource),
    /// The engine family has no database log template.
    NotLogCapable,
    /// The address matches no known endpoint form (custom DNS alias, ...).
    Unclassifiable,
}

/// Rules in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    LogCapableFamily,
    /// Known cluster, address is the cluster (reader or writer) endpoint.
    ClusterEndpoint,
    /// Known cluster, address is a member instance endpoint.
    ClusterMember,
    /// Known cluster, address matches neither endpoint form.
    ClusterAlias,
    StandaloneInstance,
    UnrecognizedAddress,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::LogCapableFamily => "log-capable-family",
            Rule::ClusterEndpoint => "cluster-endpoint",
            Rule::ClusterMember => "cluster-member",
            Rule::ClusterAlias => "cluster-alias",
            Rule::StandaloneInstance => "standalone-instance",
            Rule::UnrecognizedAddress => "unrecognized-address",
        }
    }
}

/// A decision and the rule that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub rule: Rule,
    pub decision: Decision,
}

type RuleFn = fn(&AddressPatterns, &ClassifierInput<'_>) -> Option<Decision>;

const RULES: [(Rule, RuleFn); 6] = [
    (Rule::LogCapableFamily, log_capable_family),
    (Rule::ClusterEndpoint, cluster_endpoint),
    (Rule::ClusterMember, cluster_member),
    (Rule::ClusterAlias, cluster_alias),
    (Rule::StandaloneInstance, standalone_instance),
    (Rule::UnrecognizedAddress, unrecognized_address),
];

struct AddressPatterns {
    instance: Regex,
    cluster: Regex,
}

fn cluster_logs(cluster_id: &str) -> Decision {
    Decision::Logs(LogSource::Cluster {
        cluster_id: cluster_id.to_string(),
    })
}

fn log_capable_family(_: &AddressPatterns, input: &ClassifierInput<'_>) -> Option<Decision> {
    template_for(input.family)
        .is_none()
        .then_some(Decision::NotLogCapable)
}

fn cluster_endpoint(patterns: &AddressPatterns, input: &ClassifierInput<'_>) -> Option<Decision> {
    let cluster_id = input.cluster_id?;
    patterns
        .cluster
        .is_match(input.server_name)
        .then(|| cluster_logs(cluster_id))
}

fn cluster_member(patterns: &AddressPatterns, input: &ClassifierInput<'_>) -> Option<Decision> {
    let cluster_id = input.cluster_id?;
    patterns
        .instance
        .is_match(input.server_name)
        .then(|| cluster_logs(cluster_id))
}

// Correlation matched the leading label, so the cluster is trusted even
// though the address is not a managed endpoint.
fn cluster_alias(_: &AddressPatterns, input: &ClassifierInput<'_>) -> Option<Decision> {
    input.cluster_id.map(cluster_logs)
}

fn standalone_instance(patterns: &AddressPatterns, input: &ClassifierInput<'_>) -> Option<Decision> {
    patterns.instance.is_match(input.server_name).then(|| {
        Decision::Logs(LogSource::Instance {
            instance_id: input.label.to_string(),
        })
    })
}

fn unrecognized_address(_: &AddressPatterns, _: &ClassifierInput<'_>) -> Option<Decision> {
    Some(Decision::Unclassifiable)
}

/// Classifies endpoints of managed databases under one service domain.
pub struct EngineClassifier {
    patterns: AddressPatterns,
}

impl EngineClassifier {
    /// Builds the address patterns for `service_domain` (e.g. `rds.amazonaws.com`).
    pub fn new(service_domain: &str) -> AppResult<Self> {
        let domain = regex::escape(service_domain.trim_matches('.'));
        let compile = |pattern: String| {
            Regex::new(&pattern)
                .map_err(|e| AppError::Config(format!("invalid endpoint pattern for {service_domain}: {e}")))
        };
        Ok(Self {
            patterns: AddressPatterns {
                instance: compile(format!(
                    r"^[0-9A-Za-z-]{{1,63}}\.[A-Za-z0-9]+\.{REGION}\.{domain}$"
                ))?,
                cluster: compile(format!(
                    r"^[0-9A-Za-z-]{{1,63}}\.cluster-(?:ro-)?[A-Za-z0-9]+\.{REGION}\.{domain}$"
                ))?,
            },
        })
    }

    pub fn classify(&self, input: &ClassifierInput<'_>) -> Classification {
        for (rule, decide) in RULES {
            if let Some(decision) = decide(&self.patterns, input) {
                return Classification { rule, decision };
            }
        }
        // The last rule always decides.
        Classification {
            rule: Rule::UnrecognizedAddress,
            decision: Decision::Unclassifiable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> EngineClassifier {
        EngineClassifier::new("rds.example").unwrap()
    }

    fn input<'a>(server: &'a str, cluster: Option<&'a str>, family: EngineFamily) -> ClassifierInput<'a> {
        ClassifierInput {
            server_name: server,
            label: server.split('.').next().unwrap(),
            cluster_id: cluster,
            family,
        }
    }

    #[test]
    fn test_standalone_instance_selects_instance_logs() {
        let c = classifier().classify(&input(
            "mydb.abcde12345.us-east-1.rds.example",
            None,
            EngineFamily::RelationalMysql,
        ));
        assert_eq!(c.rule, Rule::StandaloneInstance);
        assert_eq!(c.decision, Decision::Logs(LogSource::Instance { instance_id: "mydb".into() }));
    }

    #[test]
    fn test_known_cluster_selects_cluster_logs() {
        let c = classifier().classify(&input(
            "mydb.abcde12345.us-east-1.rds.example",
            Some("mycluster"),
            EngineFamily::RelationalMysql,
        ));
        assert_eq!(c.rule, Rule::ClusterMember);
        assert_eq!(c.decision, Decision::Logs(LogSource::Cluster { cluster_id: "mycluster".into() }));
    }

    #[test]
    fn test_cluster_endpoint_with_known_cluster() {
        let c = classifier().classify(&input(
            "mycluster.cluster-abcde12345.eu-west-2.rds.example",
            Some("mycluster"),
            EngineFamily::ClusterPostgres,
        ));
        assert_eq!(c.rule, Rule::ClusterEndpoint);
    }

    #[test]
    fn test_known_cluster_behind_alias_is_flagged() {
        let c = classifier().classify(&input(
            "orders-db.internal.corp",
            Some("mycluster"),
            EngineFamily::ClusterMysql,
        ));
        assert_eq!(c.rule, Rule::ClusterAlias);
        assert_eq!(c.decision, Decision::Logs(LogSource::Cluster { cluster_id: "mycluster".into() }));
    }

    #[test]
    fn test_cluster_address_without_known_cluster_is_unclassifiable() {
        let c = classifier().classify(&input(
            "mycluster.cluster-abcde12345.us-east-1.rds.example",
            None,
            EngineFamily::ClusterMysql,
        ));
        assert_eq!(c.decision, Decision::Unclassifiable);
    }

    #[test]
    fn test_unrecognized_suffix_is_unclassifiable() {
        let c = classifier().classify(&input(
            "mydb.abcde12345.us-east-1.db.internal.corp",
            None,
            EngineFamily::RelationalPostgres,
        ));
        assert_eq!(c.rule, Rule::UnrecognizedAddress);
        assert_eq!(c.decision, Decision::Unclassifiable);
    }

    #[test]
    fn test_streaming_never_gets_logs() {
        for server in ["mydb.abcde12345.us-east-1.rds.example", "stream.example"] {
            let c = classifier().classify(&input(server, Some("mycluster"), EngineFamily::Streaming));
            assert_eq!(c.decision, Decision::NotLogCapable);
        }
    }

    #[test]
    fn test_patterns_are_mutually_exclusive() {
        let c = classifier();
        let instance = "mydb.abcde12345.us-east-1.rds.example";
        let cluster = "mydb.cluster-abcde12345.us-east-1.rds.example";
        assert!(c.patterns.instance.is_match(instance));
        assert!(!c.patterns.cluster.is_match(instance));
        assert!(c.patterns.cluster.is_match(cluster));
        assert!(!c.patterns.instance.is_match(cluster));
    }
}
