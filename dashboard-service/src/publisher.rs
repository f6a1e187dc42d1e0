//! 仪表盘发布客户端

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::errors::{AppError, AppResult};

/// Outcome of a publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublishOutcome {
    /// Warnings raised by the dashboard store. These do not fail the publish.
    #[serde(default)]
    pub validation_messages: Vec<String>,
}

/// Destination of composed dashboards.
#[async_trait]
pub trait DashboardPublisher: Send + Sync {
    /// Creates or replaces the dashboard `name` with `body`.
    async fn put_dashboard(&self, name: &str, body: &str) -> AppResult<PublishOutcome>;
}

#[derive(Serialize)]
struct PutDashboardRequest<'a> {
    dashboard_body: &'a str,
}

/// Publisher backed by the dashboard store HTTP API.
pub struct HttpDashboardPublisher {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpDashboardPublisher {
    pub fn new(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl DashboardPublisher for HttpDashboardPublisher {
    async fn put_dashboard(&self, name: &str, body: &str) -> AppResult<PublishOutcome> {
        let url = format!("{}/dashboards/{}", self.base_url, name);

        let response = self
            .http_client
            .put(&url)
            .json(&PutDashboardRequest {
                dashboard_body: body,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("无法连接到仪表盘存储: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "仪表盘发布失败: HTTP {} {}",
                status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("仪表盘存储返回无效响应: {}", e)))
    }
}
