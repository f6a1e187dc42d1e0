//! Handler模块

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::RequestId;
use common::response::ApiResponse;

use crate::assembler::ComposedDashboard;
use crate::service::{DashboardEvent, DashboardRequest, EventOutcome, PublishedDashboard};
use crate::state::AppState;

/// 生成仪表盘预览（不发布）
#[utoipa::path(
    post,
    path = "/api/dashboards/preview",
    tag = "dashboards",
    request_body = DashboardRequest,
    responses(
        (status = 200, description = "仪表盘文档", body = ApiResponse<ComposedDashboard>),
        (status = 400, description = "参数校验失败"),
        (status = 422, description = "未发现任何可展示的资源"),
        (status = 502, description = "资源发现服务调用失败")
    )
)]
pub async fn preview_dashboard(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<DashboardRequest>,
) -> Result<Json<ApiResponse<ComposedDashboard>>, AppError> {
    let data = state.dashboards.compose(&req).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, &state.config.service_name).with_request_id(request_id.as_str()),
    ))
}

/// 生成并发布仪表盘
#[utoipa::path(
    post,
    path = "/api/dashboards",
    tag = "dashboards",
    request_body = DashboardRequest,
    responses(
        (status = 200, description = "仪表盘已发布", body = ApiResponse<PublishedDashboard>),
        (status = 400, description = "参数校验失败"),
        (status = 422, description = "未发现任何可展示的资源"),
        (status = 502, description = "外部服务调用失败")
    )
)]
pub async fn publish_dashboard(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<DashboardRequest>,
) -> Result<Json<ApiResponse<PublishedDashboard>>, AppError> {
    let data = state.dashboards.publish(&req).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, &state.config.service_name).with_request_id(request_id.as_str()),
    ))
}

/// 资源生命周期事件（Create / Update / Delete）
#[utoipa::path(
    post,
    path = "/api/dashboards/events",
    tag = "dashboards",
    request_body = DashboardEvent,
    responses(
        (status = 200, description = "事件已处理", body = ApiResponse<EventOutcome>),
        (status = 400, description = "参数校验失败")
    )
)]
pub async fn dashboard_event(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(event): Json<DashboardEvent>,
) -> Result<Json<ApiResponse<EventOutcome>>, AppError> {
    tracing::info!(request_type = ?event.request_type, "收到生命周期事件");
    let data = state.dashboards.handle_event(&event).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, &state.config.service_name).with_request_id(request_id.as_str()),
    ))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let settings = state.dashboards.settings();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        replication_instance_arn: settings.replication_instance_arn.clone(),
        dashboard_name: settings.dashboard_name(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 监控的复制实例
    pub replication_instance_arn: String,
    /// 发布的仪表盘名称
    pub dashboard_name: String,
}
