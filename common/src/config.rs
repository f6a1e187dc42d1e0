//! Service configuration.
//!
//! All values come from the process environment. Binaries load a `.env`
//! file first (see `dashboard-service`), so local overrides work the same
//! way as deployed environment variables.

use serde::Serialize;
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Default number of recent tasks shown on the dashboard.
pub const DEFAULT_NUM_TASKS: u32 = 3;

/// Default upper bound on task records read from discovery.
pub const DEFAULT_MAX_TASK_RECORDS: u32 = 100;

/// Default DNS suffix of managed relational database endpoints.
pub const DEFAULT_RDS_DOMAIN: &str = "rds.amazonaws.com";

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the running service.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Timeout applied to outbound HTTP calls.
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Loads the server configuration for a named service.
    pub fn load_with_service(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    fn from_lookup(service_name: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8083),
            request_timeout_secs: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Base URLs of the collaborating services.
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    /// Resource discovery service (replication instances, tasks, endpoints, databases).
    pub discovery_service: String,
    /// Dashboard store that receives the published document.
    pub dashboard_store: String,
}

impl ServiceUrls {
    /// Loads service URLs from the environment.
    pub fn load() -> Self {
        Self {
            discovery_service: std::env::var("DISCOVERY_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            dashboard_store: std::env::var("DASHBOARD_STORE_URL")
                .unwrap_or_else(|_| "http://localhost:9001".to_string()),
        }
    }
}

/// Settings that drive dashboard composition for one deployment.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct DashboardSettings {
    /// ARN of the replication instance being monitored.
    #[validate(length(min = 1, message = "RI_ARN must not be empty"))]
    pub replication_instance_arn: String,
    /// Number of most recently created tasks to include.
    #[validate(range(min = 1, max = 30, message = "NUM_TASKS must be between 1 and 30"))]
    pub num_tasks: u32,
    /// Upper bound on task records read from discovery.
    #[validate(range(min = 1, message = "MAX_TASK_RECORDS must be positive"))]
    pub max_task_records: u32,
    /// Deployment stack name, used to derive the dashboard name.
    #[validate(length(min = 1, message = "STACK_NAME must not be empty"))]
    pub stack_name: String,
    /// Region interpolated into every widget query.
    #[validate(length(min = 1, message = "REGION must not be empty"))]
    pub region: String,
    /// DNS suffix of managed database endpoints.
    #[validate(length(min = 1, message = "RDS_DOMAIN must not be empty"))]
    pub rds_domain: String,
}

impl DashboardSettings {
    /// Loads and validates settings from the environment.
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads and validates settings through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| AppError::Config(format!("{key} is not set")))
        };
        let number = |key: &str, default: u32| -> AppResult<u32> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::Config(format!("{key} must be an integer, got {raw:?}"))),
                None => Ok(default),
            }
        };

        let settings = Self {
            replication_instance_arn: required("RI_ARN")?,
            num_tasks: number("NUM_TASKS", DEFAULT_NUM_TASKS)?,
            max_task_records: number("MAX_TASK_RECORDS", DEFAULT_MAX_TASK_RECORDS)?,
            stack_name: required("STACK_NAME")?,
            region: required("REGION")?,
            rds_domain: lookup("RDS_DOMAIN").unwrap_or_else(|| DEFAULT_RDS_DOMAIN.to_string()),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Name under which the dashboard is published.
    pub fn dashboard_name(&self) -> String {
        format!("CFN-{}-DMS-Dashboard", self.stack_name)
    }
}
