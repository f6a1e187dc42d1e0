//! 资源发现客户端
//!
//! Read-only lookups of replication instances, tasks, endpoints and the
//! managed databases behind them. Calls are made one at a time; failures other
//! than "not found" are returned as `AppError::ExternalService` and never
//! retried here.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use common::errors::{AppError, AppResult};
use common::models::{
    DbInstanceFilter, DbInstanceRecord, EndpointRecord, ReplicationInstanceRecord, TaskPage,
};

/// Discovery of the resources a dashboard is built from.
#[async_trait]
pub trait ReplicationDiscovery: Send + Sync {
    /// Looks up a replication instance by ARN. `Ok(None)` when it does not exist.
    async fn find_replication_instance(
        &self,
        instance_arn: &str,
    ) -> AppResult<Option<ReplicationInstanceRecord>>;

    /// Reads one page of tasks running on the instance.
    async fn list_replication_tasks(
        &self,
        instance_arn: &str,
        max_records: u32,
        marker: Option<&str>,
    ) -> AppResult<TaskPage>;

    /// Describes the given endpoints. Unknown ARNs are simply absent from the result.
    async fn describe_endpoints(&self, endpoint_arns: &[String]) -> AppResult<Vec<EndpointRecord>>;

    /// Describes managed database instances matching any of `values` under `filter`.
    async fn describe_db_instances(
        &self,
        filter: DbInstanceFilter,
        values: &[String],
    ) -> AppResult<Vec<DbInstanceRecord>>;
}

#[derive(Serialize)]
struct DescribeEndpointsRequest<'a> {
    endpoint_arns: &'a [String],
}

#[derive(Deserialize)]
struct DescribeEndpointsResponse {
    #[serde(default)]
    endpoints: Vec<EndpointRecord>,
}

#[derive(Serialize)]
struct DescribeDbInstancesRequest<'a> {
    filter: DbInstanceFilter,
    values: &'a [String],
}

#[derive(Deserialize)]
struct DescribeDbInstancesResponse {
    #[serde(default)]
    db_instances: Vec<DbInstanceRecord>,
}

/// Discovery backed by the discovery service HTTP API.
pub struct HttpDiscoveryClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpDiscoveryClient {
    /// 创建新的发现客户端
    pub fn new(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn request_failed(what: &str, e: reqwest::Error) -> AppError {
    AppError::ExternalService(format!("无法连接到发现服务 ({what}): {e}"))
}

async fn decode<T: serde::de::DeserializeOwned>(
    what: &str,
    response: reqwest::Response,
) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::ExternalService(format!(
            "发现服务返回错误 ({what}): HTTP {status} {body}"
        )));
    }
    response
        .json()
        .await
        .map_err(|e| AppError::ExternalService(format!("发现服务返回无效响应 ({what}): {e}")))
}

#[async_trait]
impl ReplicationDiscovery for HttpDiscoveryClient {
    async fn find_replication_instance(
        &self,
        instance_arn: &str,
    ) -> AppResult<Option<ReplicationInstanceRecord>> {
        let response = self
            .http_client
            .get(self.url("/replication-instances"))
            .query(&[("arn", instance_arn)])
            .send()
            .await
            .map_err(|e| request_failed("replication-instances", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode("replication-instances", response).await.map(Some)
    }

    async fn list_replication_tasks(
        &self,
        instance_arn: &str,
        max_records: u32,
        marker: Option<&str>,
    ) -> AppResult<TaskPage> {
        let max_records = max_records.to_string();
        let mut query = vec![
            ("replication_instance_arn", instance_arn),
            ("max_records", max_records.as_str()),
        ];
        if let Some(marker) = marker {
            query.push(("marker", marker));
        }

        let response = self
            .http_client
            .get(self.url("/replication-tasks"))
            .query(&query)
            .send()
            .await
            .map_err(|e| request_failed("replication-tasks", e))?;

        // An instance that vanished between calls has no tasks.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(TaskPage::default());
        }
        decode("replication-tasks", response).await
    }

    async fn describe_endpoints(&self, endpoint_arns: &[String]) -> AppResult<Vec<EndpointRecord>> {
        let response = self
            .http_client
            .post(self.url("/endpoints/describe"))
            .json(&DescribeEndpointsRequest { endpoint_arns })
            .send()
            .await
            .map_err(|e| request_failed("endpoints", e))?;

        let body: DescribeEndpointsResponse = decode("endpoints", response).await?;
        Ok(body.endpoints)
    }

    async fn describe_db_instances(
        &self,
        filter: DbInstanceFilter,
        values: &[String],
    ) -> AppResult<Vec<DbInstanceRecord>> {
        let response = self
            .http_client
            .post(self.url("/db-instances/describe"))
            .json(&DescribeDbInstancesRequest { filter, values })
            .send()
            .await
            .map_err(|e| request_failed("db-instances", e))?;

        let body: DescribeDbInstancesResponse = decode("db-instances", response).await?;
        Ok(body.db_instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpDiscoveryClient::new("http://discovery:9000/", reqwest::Client::new());
        assert_eq!(client.url("/endpoints/describe"), "http://discovery:9000/endpoints/describe");
    }

    #[test]
    fn test_db_instance_request_wire_shape() {
        let values = vec!["db1".to_string()];
        let body = serde_json::to_value(DescribeDbInstancesRequest {
            filter: DbInstanceFilter::ClusterId,
            values: &values,
        })
        .unwrap();
        assert_eq!(body["filter"], "db-cluster-id");
        assert_eq!(body["values"][0], "db1");
    }
}
