//! Resource graph construction.
//!
//! Resolves the monitored replication instance into the tasks shown on the
//! dashboard, their target endpoints, and the cluster membership of the
//! managed databases behind those endpoints. Missing pieces degrade the
//! graph; only discovery call failures abort the build.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use common::errors::AppResult;
use common::models::{DbInstanceFilter, Endpoint, ReplicationInstance, ReplicationTask};

use crate::discovery::ReplicationDiscovery;

/// Everything discovered about one replication instance.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    /// The instance, `None` when it could not be found.
    pub instance: Option<ReplicationInstance>,
    /// Selected tasks, newest first.
    pub tasks: Vec<ReplicationTask>,
    /// Target endpoints of the selected tasks, by ARN.
    pub endpoints: BTreeMap<String, Endpoint>,
    /// Database instance id to owning cluster id.
    pub cluster_map: BTreeMap<String, String>,
    /// Informational records of everything that was skipped or degraded.
    pub notes: Vec<String>,
}

impl ResourceGraph {
    /// Cluster known for an endpoint address label.
    ///
    /// The label is either a member instance id (mapped to its cluster) or
    /// the cluster id itself when the endpoint points at the cluster.
    pub fn known_cluster(&self, label: &str) -> Option<&str> {
        if let Some(cluster) = self.cluster_map.get(label) {
            return Some(cluster);
        }
        self.cluster_map
            .values()
            .find(|cluster| cluster.as_str() == label)
            .map(String::as_str)
    }

    fn note(&mut self, message: String) {
        tracing::info!(note = %message, "resource graph");
        self.notes.push(message);
    }
}

/// Newest first; a task without a creation date is treated as the newest.
fn newest_first(a: &ReplicationTask, b: &ReplicationTask) -> Ordering {
    match (&a.created_at, &b.created_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(a),
    }
}

/// Builds a [`ResourceGraph`] through a discovery backend.
pub struct ResourceGraphBuilder<'a> {
    discovery: &'a dyn ReplicationDiscovery,
    num_tasks: usize,
    max_task_records: u32,
}

impl<'a> ResourceGraphBuilder<'a> {
    pub fn new(discovery: &'a dyn ReplicationDiscovery, num_tasks: u32, max_task_records: u32) -> Self {
        Self {
            discovery,
            num_tasks: num_tasks as usize,
            max_task_records,
        }
    }

    /// Resolves `instance_arn` into a graph.
    pub async fn build(&self, instance_arn: &str) -> AppResult<ResourceGraph> {
        let mut graph = ResourceGraph::default();

        match self.discovery.find_replication_instance(instance_arn).await? {
            Some(record) => {
                let instance = ReplicationInstance::from(record);
                tracing::info!(
                    instance = %instance.identifier,
                    ips = instance.ip_addresses.len(),
                    "replication instance found"
                );
                graph.instance = Some(instance);
            }
            None => {
                // Tasks are not listed: every section needs the instance id.
                graph.note(format!("replication instance {instance_arn} not found"));
                return Ok(graph);
            }
        }

        graph.tasks = self.select_tasks(instance_arn).await?;
        if graph.tasks.is_empty() {
            graph.note(format!("no replication tasks found on {instance_arn}"));
            return Ok(graph);
        }

        self.resolve_endpoints(&mut graph).await?;
        self.correlate_clusters(&mut graph).await?;
        Ok(graph)
    }

    async fn select_tasks(&self, instance_arn: &str) -> AppResult<Vec<ReplicationTask>> {
        let mut tasks: Vec<ReplicationTask> = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let remaining = self.max_task_records.saturating_sub(tasks.len() as u32);
            if remaining == 0 {
                break;
            }
            let page = self
                .discovery
                .list_replication_tasks(instance_arn, remaining, marker.as_deref())
                .await?;
            let page_was_empty = page.tasks.is_empty();
            tasks.extend(
                page.tasks
                    .into_iter()
                    .take(remaining as usize)
                    .map(ReplicationTask::from),
            );
            marker = page.marker;
            if marker.is_none() || page_was_empty {
                break;
            }
        }

        let discovered = tasks.len();
        tasks.sort_by(newest_first);
        tasks.truncate(self.num_tasks);
        tracing::info!(discovered, selected = tasks.len(), "replication tasks selected");
        Ok(tasks)
    }

    async fn resolve_endpoints(&self, graph: &mut ResourceGraph) -> AppResult<()> {
        let mut seen = HashSet::new();
        let arns: Vec<String> = graph
            .tasks
            .iter()
            .map(|task| task.target_endpoint_arn.clone())
            .filter(|arn| seen.insert(arn.clone()))
            .collect();

        for record in self.discovery.describe_endpoints(&arns).await? {
            let endpoint = Endpoint::from(record);
            if endpoint.connection.is_none() {
                graph.note(format!(
                    "endpoint {} has no server address (credentials resolved indirectly); \
                     database logs are not correlated",
                    endpoint.arn
                ));
            }
            graph.endpoints.insert(endpoint.arn.clone(), endpoint);
        }

        for arn in &arns {
            if !graph.endpoints.contains_key(arn) {
                graph.note(format!("target endpoint {arn} could not be described"));
            }
        }
        Ok(())
    }

    async fn correlate_clusters(&self, graph: &mut ResourceGraph) -> AppResult<()> {
        let labels: Vec<String> = graph
            .endpoints
            .values()
            .filter(|endpoint| endpoint.family.is_relational())
            .filter_map(|endpoint| endpoint.connection.as_ref())
            .map(|connection| connection.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if labels.is_empty() {
            return Ok(());
        }

        // Instance endpoints first, then cluster endpoints. Later writes win.
        for filter in [DbInstanceFilter::InstanceId, DbInstanceFilter::ClusterId] {
            let instances = self.discovery.describe_db_instances(filter, &labels).await?;
            if instances.is_empty() {
                graph.note(format!("no managed databases matched {filter} {labels:?}"));
                continue;
            }
            for db in instances {
                let Some(cluster) = db.db_cluster_identifier else {
                    continue;
                };
                match graph.cluster_map.insert(db.db_instance_identifier.clone(), cluster.clone()) {
                    Some(previous) if previous != cluster => {
                        tracing::warn!(
                            instance = %db.db_instance_identifier,
                            previous = %previous,
                            current = %cluster,
                            "conflicting cluster membership, keeping the later lookup"
                        );
                        graph.note(format!(
                            "database {} reported in cluster {previous} and {cluster}; using {cluster}",
                            db.db_instance_identifier
                        ));
                    }
                    _ => {}
                }
            }
        }

        tracing::info!(clusters = ?graph.cluster_map, "cluster membership correlated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{db, endpoint, instance, task, InMemoryDiscovery};

    #[tokio::test]
    async fn test_missing_instance_degrades() {
        let discovery = InMemoryDiscovery {
            tasks: vec![task("t1", Some(1), "ep-1")],
            endpoints: vec![endpoint("ep-1", "mysql", Some("db1.abc.us-east-1.rds.amazonaws.com"))],
            ..Default::default()
        };
        let graph = ResourceGraphBuilder::new(&discovery, 3, 100)
            .build("arn:missing")
            .await
            .unwrap();
        assert!(graph.instance.is_none());
        assert!(graph.tasks.is_empty());
        assert!(graph.endpoints.is_empty());
        assert_eq!(graph.notes.len(), 1);
        assert!(discovery.db_lookups().is_empty());
    }

    #[tokio::test]
    async fn test_tasks_sorted_newest_first_and_truncated() {
        let mut discovery = InMemoryDiscovery::with_instance(instance("ri-1", &["10.0.0.5"]));
        discovery.tasks = vec![
            task("old", Some(1), "ep-1"),
            task("newest", Some(30), "ep-1"),
            task("mid", Some(20), "ep-1"),
            task("pending", None, "ep-1"),
        ];
        discovery.endpoints = vec![endpoint("ep-1", "mysql", Some("db1.abc.us-east-1.rds.example"))];

        let graph = ResourceGraphBuilder::new(&discovery, 3, 100)
            .build("arn:ri-1")
            .await
            .unwrap();
        let ids: Vec<_> = graph.tasks.iter().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, vec!["pending", "newest", "mid"]);
    }

    #[tokio::test]
    async fn test_pagination_bounded_by_max_records() {
        let mut discovery = InMemoryDiscovery::with_instance(instance("ri-1", &[]));
        discovery.page_size = 2;
        discovery.tasks = (0..7).map(|i| task(&format!("t{i}"), Some(i), "ep-1")).collect();

        let graph = ResourceGraphBuilder::new(&discovery, 30, 5)
            .build("arn:ri-1")
            .await
            .unwrap();
        assert_eq!(graph.tasks.len(), 5);
        assert_eq!(graph.tasks[0].external_id, "t4");
    }

    #[tokio::test]
    async fn test_unresolvable_and_missing_endpoints_noted() {
        let mut discovery = InMemoryDiscovery::with_instance(instance("ri-1", &[]));
        discovery.tasks = vec![task("t1", Some(2), "ep-secret"), task("t2", Some(1), "ep-gone")];
        discovery.endpoints = vec![endpoint("ep-secret", "postgres", None)];

        let graph = ResourceGraphBuilder::new(&discovery, 3, 100)
            .build("arn:ri-1")
            .await
            .unwrap();
        assert!(graph.endpoints["ep-secret"].connection.is_none());
        assert!(!graph.endpoints.contains_key("ep-gone"));
        assert!(graph.notes.iter().any(|n| n.contains("ep-secret")));
        assert!(graph.notes.iter().any(|n| n.contains("ep-gone")));
        assert!(discovery.db_lookups().is_empty());
    }

    #[tokio::test]
    async fn test_cluster_lookups_merge_in_order() {
        let mut discovery = InMemoryDiscovery::with_instance(instance("ri-1", &[]));
        discovery.tasks = vec![
            task("t1", Some(3), "ep-member"),
            task("t2", Some(2), "ep-cluster"),
            task("t3", Some(1), "ep-stream"),
        ];
        discovery.endpoints = vec![
            endpoint("ep-member", "aurora", Some("writer-1.abc.us-east-1.rds.example")),
            endpoint("ep-cluster", "aurora-postgresql", Some("pgc.cluster-abc.us-east-1.rds.example")),
            endpoint("ep-stream", "kinesis", Some("stream.example")),
        ];
        discovery.db_by_instance = vec![db("writer-1", Some("mysqlc"))];
        discovery.db_by_cluster = vec![db("pgc-1", Some("pgc")), db("writer-1", Some("other"))];

        let graph = ResourceGraphBuilder::new(&discovery, 3, 100)
            .build("arn:ri-1")
            .await
            .unwrap();

        let lookups = discovery.db_lookups();
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[0].0, DbInstanceFilter::InstanceId);
        assert_eq!(lookups[1].0, DbInstanceFilter::ClusterId);
        assert_eq!(lookups[0].1, vec!["pgc".to_string(), "writer-1".to_string()]);

        assert_eq!(graph.cluster_map["writer-1"], "other");
        assert!(graph.notes.iter().any(|n| n.contains("writer-1") && n.contains("other")));
        assert_eq!(graph.known_cluster("pgc"), Some("pgc"));
        assert_eq!(graph.known_cluster("writer-1"), Some("other"));
        assert_eq!(graph.known_cluster("standalone"), None);
    }
}
