//! Application state for dashboard service.

use std::sync::Arc;
use std::time::Duration;

use common::config::{AppConfig, DashboardSettings, ServiceUrls};
use common::errors::{AppError, AppResult};

use crate::discovery::HttpDiscoveryClient;
use crate::publisher::HttpDashboardPublisher;
use crate::service::DashboardService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub dashboards: Arc<DashboardService>,
}

impl AppState {
    /// Creates the state from the environment, wiring the HTTP collaborators.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let settings = DashboardSettings::load()?;
        let urls = ServiceUrls::load();
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        let service = DashboardService::new(
            Arc::new(HttpDiscoveryClient::new(urls.discovery_service, http_client.clone())),
            Arc::new(HttpDashboardPublisher::new(urls.dashboard_store, http_client)),
            settings,
        )?;
        Ok(Self::with_service(config, service))
    }

    /// Creates the state around an existing service.
    pub fn with_service(config: AppConfig, service: DashboardService) -> Self {
        Self {
            config,
            dashboards: Arc::new(service),
        }
    }
}
