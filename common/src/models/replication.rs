//! Replication resource models.
//!
//! `*Record` types mirror what the discovery service returns on the wire.
//! The remaining types are the normalized view the dashboard composer works
//! with.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Replication instance as returned by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationInstanceRecord {
    /// Instance identifier.
    pub replication_instance_identifier: String,
    /// Public addresses; entries may be null.
    #[serde(default)]
    pub public_ip_addresses: Vec<Option<String>>,
    /// Private addresses; entries may be null.
    #[serde(default)]
    pub private_ip_addresses: Vec<Option<String>>,
}

/// Replication task as returned by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationTaskRecord {
    /// Full task ARN.
    pub replication_task_arn: String,
    /// Creation time, absent for tasks that are still being created.
    #[serde(default)]
    pub replication_task_creation_date: Option<DateTime<Utc>>,
    /// ARN of the task's target endpoint.
    pub target_endpoint_arn: String,
}

/// One page of tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPage {
    /// Tasks on this page.
    #[serde(default)]
    pub tasks: Vec<ReplicationTaskRecord>,
    /// Continuation marker, absent on the last page.
    #[serde(default)]
    pub marker: Option<String>,
}

/// Replication endpoint as returned by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Endpoint ARN.
    pub endpoint_arn: String,
    /// Engine name, e.g. `mysql`, `aurora-postgresql`, `kinesis`.
    pub engine_name: String,
    /// Server address; absent when the connection is resolved through a secret store.
    #[serde(default)]
    pub server_name: Option<String>,
    /// Connection user name.
    #[serde(default)]
    pub username: Option<String>,
}

/// Managed database instance as returned by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbInstanceRecord {
    /// Database instance identifier.
    pub db_instance_identifier: String,
    /// Owning cluster, if the instance is a cluster member.
    #[serde(default)]
    pub db_cluster_identifier: Option<String>,
}

/// Filter used when looking up database instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbInstanceFilter {
    /// Match on the instance identifier.
    #[serde(rename = "db-instance-id")]
    InstanceId,
    /// Match on the owning cluster identifier.
    #[serde(rename = "db-cluster-id")]
    ClusterId,
}

impl std::fmt::Display for DbInstanceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbInstanceFilter::InstanceId => write!(f, "db-instance-id"),
            DbInstanceFilter::ClusterId => write!(f, "db-cluster-id"),
        }
    }
}

/// The monitored replication instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationInstance {
    /// Instance identifier.
    pub identifier: String,
    /// Public and private addresses, deduplicated, in discovery order.
    pub ip_addresses: Vec<String>,
}

impl From<ReplicationInstanceRecord> for ReplicationInstance {
    fn from(record: ReplicationInstanceRecord) -> Self {
        let mut seen = HashSet::new();
        let ip_addresses = record
            .public_ip_addresses
            .into_iter()
            .chain(record.private_ip_addresses)
            .flatten()
            .filter(|ip| !ip.is_empty() && seen.insert(ip.clone()))
            .collect();
        Self {
            identifier: record.replication_instance_identifier,
            ip_addresses,
        }
    }
}

/// A replication task selected for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationTask {
    /// Resource id used as the metric dimension value.
    pub external_id: String,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// ARN of the target endpoint.
    pub target_endpoint_arn: String,
}

impl From<ReplicationTaskRecord> for ReplicationTask {
    fn from(record: ReplicationTaskRecord) -> Self {
        Self {
            external_id: external_id_of(&record.replication_task_arn).to_string(),
            created_at: record.replication_task_creation_date,
            target_endpoint_arn: record.target_endpoint_arn,
        }
    }
}

/// Returns the trailing resource id of an ARN.
pub fn external_id_of(arn: &str) -> &str {
    arn.rsplit(':').next().unwrap_or(arn)
}

/// Category of target database technology behind an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineFamily {
    /// `mysql`, `mariadb`.
    RelationalMysql,
    /// `postgres`.
    RelationalPostgres,
    /// `aurora`.
    ClusterMysql,
    /// `aurora-postgresql`.
    ClusterPostgres,
    /// `kinesis`.
    Streaming,
    /// Any other engine.
    Unsupported,
}

impl EngineFamily {
    /// Maps an endpoint engine name to its family.
    pub fn from_engine_name(engine_name: &str) -> Self {
        match engine_name.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => EngineFamily::RelationalMysql,
            "postgres" => EngineFamily::RelationalPostgres,
            "aurora" => EngineFamily::ClusterMysql,
            "aurora-postgresql" => EngineFamily::ClusterPostgres,
            "kinesis" => EngineFamily::Streaming,
            _ => EngineFamily::Unsupported,
        }
    }

    /// Whether the family is backed by a managed relational database, and so
    /// takes part in cluster correlation.
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            EngineFamily::RelationalMysql
                | EngineFamily::RelationalPostgres
                | EngineFamily::ClusterMysql
                | EngineFamily::ClusterPostgres
        )
    }
}

impl std::fmt::Display for EngineFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineFamily::RelationalMysql => "relational-mysql",
            EngineFamily::RelationalPostgres => "relational-postgres",
            EngineFamily::ClusterMysql => "cluster-mysql",
            EngineFamily::ClusterPostgres => "cluster-postgres",
            EngineFamily::Streaming => "streaming",
            EngineFamily::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Connection details present directly on an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectConnection {
    /// Server address.
    pub server_name: String,
    /// Connection user name.
    pub username: Option<String>,
    /// Leading DNS label of the server address.
    pub label: String,
}

/// A target endpoint referenced by at least one selected task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Endpoint ARN.
    pub arn: String,
    /// Engine family derived from the engine name.
    pub family: EngineFamily,
    /// Direct connection details; `None` marks the endpoint unresolvable.
    pub connection: Option<DirectConnection>,
}

impl From<EndpointRecord> for Endpoint {
    fn from(record: EndpointRecord) -> Self {
        let connection = record
            .server_name
            .filter(|s| !s.trim().is_empty())
            .map(|server_name| DirectConnection {
                label: leading_label(&server_name).to_string(),
                username: record.username,
                server_name,
            });
        Self {
            family: EngineFamily::from_engine_name(&record.engine_name),
            arn: record.endpoint_arn,
            connection,
        }
    }
}

/// Returns the first DNS label of a server address.
pub fn leading_label(server_name: &str) -> &str {
    server_name.split('.').next().unwrap_or(server_name)
}
