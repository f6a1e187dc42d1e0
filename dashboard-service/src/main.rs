//! 复制任务监控仪表盘服务
//!
//! 提供监控仪表盘生成功能，包括：
//! - 复制实例、任务、目标端点与数据库集群的资源发现
//! - 按目标数据库引擎选择日志查询模板
//! - 仪表盘组件布局、结构校验与发布

mod assembler;
mod classifier;
mod discovery;
mod handlers;
mod layout;
mod publisher;
mod resource_graph;
mod routes;
mod service;
mod state;
mod templates;
mod widgets;

#[cfg(test)]
mod testing;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "dashboard-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "仪表盘服务 API",
        version = "0.1.0",
        description = "复制任务监控仪表盘生成微服务"
    ),
    paths(
        handlers::preview_dashboard,
        handlers::publish_dashboard,
        handlers::dashboard_event,
        handlers::health_check,
    ),
    components(schemas(
        assembler::ComposedDashboard,
        service::DashboardRequest,
        service::DashboardEvent,
        service::RequestType,
        service::EventOutcome,
        service::PublishedDashboard,
        handlers::HealthResponse,
    )),
    tags(
        (name = "dashboards", description = "仪表盘生成端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 创建应用状态（资源发现与仪表盘存储客户端）
    let state = AppState::new(config.clone())
        .context("初始化应用状态失败 (检查 RI_ARN / STACK_NAME / REGION)")?;

    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr).await.context("绑定地址失败")?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            // Only set if not already set by the environment
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}
