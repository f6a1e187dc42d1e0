//! In-memory collaborators for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::errors::{AppError, AppResult};
use common::models::{
    DbInstanceFilter, DbInstanceRecord, EndpointRecord, ReplicationInstanceRecord,
    ReplicationTaskRecord, TaskPage,
};

use crate::discovery::ReplicationDiscovery;
use crate::publisher::{DashboardPublisher, PublishOutcome};

pub fn instance(id: &str, ips: &[&str]) -> ReplicationInstanceRecord {
    ReplicationInstanceRecord {
        replication_instance_identifier: id.to_string(),
        public_ip_addresses: vec![None],
        private_ip_addresses: ips.iter().map(|ip| Some(ip.to_string())).collect(),
    }
}

pub fn task(id: &str, created_secs: Option<i64>, endpoint_arn: &str) -> ReplicationTaskRecord {
    ReplicationTaskRecord {
        replication_task_arn: format!("arn:aws:dms:us-east-1:123456789012:task:{id}"),
        replication_task_creation_date: created_secs
            .and_then(|secs| DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0)),
        target_endpoint_arn: endpoint_arn.to_string(),
    }
}

pub fn endpoint(arn: &str, engine: &str, server: Option<&str>) -> EndpointRecord {
    EndpointRecord {
        endpoint_arn: arn.to_string(),
        engine_name: engine.to_string(),
        server_name: server.map(String::from),
        username: server.map(|_| "dms_user".to_string()),
    }
}

pub fn db(id: &str, cluster: Option<&str>) -> DbInstanceRecord {
    DbInstanceRecord {
        db_instance_identifier: id.to_string(),
        db_cluster_identifier: cluster.map(String::from),
    }
}

/// Discovery serving canned records. Database lookups return the list
/// configured for the filter regardless of the requested values, and are
/// recorded for inspection.
#[derive(Default)]
pub struct InMemoryDiscovery {
    pub instance: Option<ReplicationInstanceRecord>,
    pub tasks: Vec<ReplicationTaskRecord>,
    /// Tasks per page; 0 serves everything on one page.
    pub page_size: usize,
    pub endpoints: Vec<EndpointRecord>,
    pub db_by_instance: Vec<DbInstanceRecord>,
    pub db_by_cluster: Vec<DbInstanceRecord>,
    pub fail_endpoints: bool,
    pub(crate) lookups: Mutex<Vec<(DbInstanceFilter, Vec<String>)>>,
}

impl InMemoryDiscovery {
    pub fn with_instance(record: ReplicationInstanceRecord) -> Self {
        Self {
            instance: Some(record),
            ..Default::default()
        }
    }

    pub fn db_lookups(&self) -> Vec<(DbInstanceFilter, Vec<String>)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplicationDiscovery for InMemoryDiscovery {
    async fn find_replication_instance(
        &self,
        _instance_arn: &str,
    ) -> AppResult<Option<ReplicationInstanceRecord>> {
        Ok(self.instance.clone())
    }

    async fn list_replication_tasks(
        &self,
        _instance_arn: &str,
        max_records: u32,
        marker: Option<&str>,
    ) -> AppResult<TaskPage> {
        let start: usize = marker.map(|m| m.parse().unwrap()).unwrap_or(0);
        let page_size = if self.page_size == 0 { self.tasks.len() } else { self.page_size };
        let end = (start + page_size.min(max_records as usize)).min(self.tasks.len());
        Ok(TaskPage {
            tasks: self.tasks[start..end].to_vec(),
            marker: (end < self.tasks.len()).then(|| end.to_string()),
        })
    }

    async fn describe_endpoints(&self, endpoint_arns: &[String]) -> AppResult<Vec<EndpointRecord>> {
        if self.fail_endpoints {
            return Err(AppError::ExternalService("AccessDenied".into()));
        }
        Ok(self
            .endpoints
            .iter()
            .filter(|e| endpoint_arns.contains(&e.endpoint_arn))
            .cloned()
            .collect())
    }

    async fn describe_db_instances(
        &self,
        filter: DbInstanceFilter,
        values: &[String],
    ) -> AppResult<Vec<DbInstanceRecord>> {
        self.lookups.lock().unwrap().push((filter, values.to_vec()));
        Ok(match filter {
            DbInstanceFilter::InstanceId => self.db_by_instance.clone(),
            DbInstanceFilter::ClusterId => self.db_by_cluster.clone(),
        })
    }
}

/// Publisher that keeps every published document.
#[derive(Default)]
pub struct RecordingPublisher {
    pub validation_messages: Vec<String>,
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn with_messages(messages: &[&str]) -> Self {
        Self {
            validation_messages: messages.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl DashboardPublisher for RecordingPublisher {
    async fn put_dashboard(&self, name: &str, body: &str) -> AppResult<PublishOutcome> {
        self.published
            .lock()
            .unwrap()
            .push((name.to_string(), body.to_string()));
        Ok(PublishOutcome {
            validation_messages: self.validation_messages.clone(),
        })
    }
}
