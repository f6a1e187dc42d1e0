//! 仪表盘服务路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{dashboard_event, health_check, preview_dashboard, publish_dashboard};
use crate::state::AppState;

/// 创建仪表盘路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboards", post(publish_dashboard))
        .route("/api/dashboards/preview", post(preview_dashboard))
        .route("/api/dashboards/events", post(dashboard_event))
        .route("/api/health", get(health_check))
}
