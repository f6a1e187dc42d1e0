//! 仪表盘生成服务模块

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use common::config::DashboardSettings;
use common::errors::AppResult;

use crate::assembler::{ComposedDashboard, DashboardAssembler};
use crate::classifier::EngineClassifier;
use crate::discovery::ReplicationDiscovery;
use crate::publisher::DashboardPublisher;
use crate::resource_graph::ResourceGraphBuilder;

/// 仪表盘生成请求，未指定的字段使用服务配置
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct DashboardRequest {
    /// 覆盖监控的复制实例 ARN
    #[validate(length(min = 1, message = "replication_instance_arn must not be empty"))]
    pub replication_instance_arn: Option<String>,
    /// 覆盖展示的任务数量 (1..=30)
    #[validate(range(min = 1, max = 30, message = "num_tasks must be between 1 and 30"))]
    pub num_tasks: Option<u32>,
}

/// 发布结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublishedDashboard {
    /// 仪表盘名称
    pub name: String,
    /// 组件数量
    pub widget_count: usize,
    /// 生成过程中跳过或降级的记录
    pub notes: Vec<String>,
    /// 仪表盘存储返回的校验信息
    pub validation_messages: Vec<String>,
}

/// 资源生命周期事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// 资源生命周期事件
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DashboardEvent {
    /// 事件类型
    pub request_type: RequestType,
    /// 生成参数
    #[serde(default)]
    pub properties: DashboardRequest,
}

/// 生命周期事件处理结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventOutcome {
    pub request_type: RequestType,
    /// 发布的仪表盘 (Delete 事件为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<PublishedDashboard>,
}

/// 仪表盘生成服务
pub struct DashboardService {
    discovery: Arc<dyn ReplicationDiscovery>,
    publisher: Arc<dyn DashboardPublisher>,
    assembler: DashboardAssembler,
    settings: DashboardSettings,
}

impl DashboardService {
    /// 创建服务实例
    pub fn new(
        discovery: Arc<dyn ReplicationDiscovery>,
        publisher: Arc<dyn DashboardPublisher>,
        settings: DashboardSettings,
    ) -> AppResult<Self> {
        let classifier = EngineClassifier::new(&settings.rds_domain)?;
        Ok(Self {
            discovery,
            publisher,
            assembler: DashboardAssembler::new(classifier, settings.region.clone()),
            settings,
        })
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// 生成并校验仪表盘，不发布
    pub async fn compose(&self, req: &DashboardRequest) -> AppResult<ComposedDashboard> {
        let settings = self.effective_settings(req)?;
        tracing::info!(
            instance = %settings.replication_instance_arn,
            num_tasks = settings.num_tasks,
            "composing dashboard"
        );

        let graph = ResourceGraphBuilder::new(
            self.discovery.as_ref(),
            settings.num_tasks,
            settings.max_task_records,
        )
        .build(&settings.replication_instance_arn)
        .await?;

        self.assembler.assemble(&settings.dashboard_name(), &graph)
    }

    /// 生成、校验并发布仪表盘
    pub async fn publish(&self, req: &DashboardRequest) -> AppResult<PublishedDashboard> {
        let composed = self.compose(req).await?;
        let outcome = self
            .publisher
            .put_dashboard(&composed.name, &composed.body)
            .await?;

        for message in &outcome.validation_messages {
            tracing::warn!(dashboard = %composed.name, message = %message, "仪表盘存储校验信息");
        }
        tracing::info!(dashboard = %composed.name, widgets = composed.widget_count, "仪表盘已发布");

        Ok(PublishedDashboard {
            name: composed.name,
            widget_count: composed.widget_count,
            notes: composed.notes,
            validation_messages: outcome.validation_messages,
        })
    }

    /// 处理资源生命周期事件: Create/Update 重新生成并发布, Delete 不做任何操作
    pub async fn handle_event(&self, event: &DashboardEvent) -> AppResult<EventOutcome> {
        let dashboard = match event.request_type {
            RequestType::Create | RequestType::Update => Some(self.publish(&event.properties).await?),
            RequestType::Delete => {
                tracing::info!("删除事件，无需操作");
                None
            }
        };
        Ok(EventOutcome {
            request_type: event.request_type,
            dashboard,
        })
    }

    fn effective_settings(&self, req: &DashboardRequest) -> AppResult<DashboardSettings> {
        req.validate()?;
        let mut settings = self.settings.clone();
        if let Some(arn) = &req.replication_instance_arn {
            settings.replication_instance_arn = arn.clone();
        }
        if let Some(num_tasks) = req.num_tasks {
            settings.num_tasks = num_tasks;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use common::errors::AppError;
    use crate::testing::{endpoint, instance, task, InMemoryDiscovery, RecordingPublisher};

    pub(crate) fn settings() -> DashboardSettings {
        DashboardSettings {
            replication_instance_arn: "arn:aws:dms:us-east-1:123456789012:rep:ri-1".to_string(),
            num_tasks: 3,
            max_task_records: 100,
            stack_name: "demo".to_string(),
            region: "us-east-1".to_string(),
            rds_domain: "rds.example".to_string(),
        }
    }

    pub(crate) fn discovery() -> InMemoryDiscovery {
        let mut discovery = InMemoryDiscovery::with_instance(instance("ri-1", &["10.0.0.5"]));
        discovery.tasks = vec![task("t1", Some(2), "ep-1"), task("t2", Some(1), "ep-1")];
        discovery.endpoints = vec![endpoint("ep-1", "mysql", Some("db1.xxxxx.us-east-1.rds.example"))];
        discovery
    }

    fn service(publisher: Arc<RecordingPublisher>) -> DashboardService {
        DashboardService::new(Arc::new(discovery()), publisher, settings()).unwrap()
    }

    #[tokio::test]
    async fn test_publish_sends_composed_body() {
        let publisher = Arc::new(RecordingPublisher::with_messages(&["widget 3: unknown metric"]));
        let published = service(publisher.clone())
            .publish(&DashboardRequest::default())
            .await
            .unwrap();

        assert_eq!(published.name, "CFN-demo-DMS-Dashboard");
        assert_eq!(published.validation_messages, vec!["widget 3: unknown metric"]);

        let sent = publisher.published();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "CFN-demo-DMS-Dashboard");
        let document: serde_json::Value = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(document["widgets"].as_array().unwrap().len(), published.widget_count);
    }

    #[tokio::test]
    async fn test_num_tasks_override_is_validated() {
        let publisher = Arc::new(RecordingPublisher::default());
        let req = DashboardRequest {
            num_tasks: Some(31),
            ..Default::default()
        };
        let err = service(publisher.clone()).publish(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_num_tasks_override_limits_tasks() {
        let req = DashboardRequest {
            num_tasks: Some(1),
            ..Default::default()
        };
        let composed = service(Arc::new(RecordingPublisher::default()))
            .compose(&req)
            .await
            .unwrap();
        assert!(composed.body.contains("Error history: t1"));
        assert!(!composed.body.contains("Error history: t2"));
    }

    #[tokio::test]
    async fn test_delete_event_publishes_nothing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let outcome = service(publisher.clone())
            .handle_event(&DashboardEvent {
                request_type: RequestType::Delete,
                properties: DashboardRequest::default(),
            })
            .await
            .unwrap();
        assert!(outcome.dashboard.is_none());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_update_event_republishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let outcome = service(publisher.clone())
            .handle_event(&DashboardEvent {
                request_type: RequestType::Update,
                properties: DashboardRequest::default(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.dashboard.unwrap().name, "CFN-demo-DMS-Dashboard");
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_propagates() {
        let mut discovery = discovery();
        discovery.fail_endpoints = true;
        let publisher = Arc::new(RecordingPublisher::default());
        let service = DashboardService::new(Arc::new(discovery), publisher.clone(), settings()).unwrap();

        let err = service.publish(&DashboardRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert!(publisher.published().is_empty());
    }
}
