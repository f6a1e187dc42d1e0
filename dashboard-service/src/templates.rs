//! Log query templates.
//!
//! Each log-capable engine family maps to exactly one template function.
//! Streaming and unsupported families have no entry, which is how the
//! classifier decides that no database log panel applies.

use common::models::EngineFamily;

/// Where database logs are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// Log group of a single database instance.
    Instance { instance_id: String },
    /// Log group shared by all members of a cluster.
    Cluster { cluster_id: String },
}

impl LogSource {
    fn log_group(&self, stream: &str) -> String {
        match self {
            LogSource::Instance { instance_id } => format!("/aws/rds/instance/{instance_id}/{stream}"),
            LogSource::Cluster { cluster_id } => format!("/aws/rds/cluster/{cluster_id}/{stream}"),
        }
    }

    fn stream_filter(&self) -> Option<String> {
        match self {
            LogSource::Instance { instance_id } => {
                Some(format!("| filter @logStream like {}\n", quoted(instance_id)))
            }
            LogSource::Cluster { .. } => None,
        }
    }
}

/// Double-quoted Logs Insights string literal.
fn quoted(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            literal.push('\\');
        }
        literal.push(c);
    }
    literal.push('"');
    literal
}

/// Narrowing applied to database log queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFilters<'a> {
    /// Replication user connecting to the target database.
    pub username: Option<&'a str>,
    /// Addresses of the replication instance.
    pub ip_addresses: &'a [String],
}

/// Renders a Logs Insights query for a log source.
pub type TemplateFn = fn(&LogSource, &LogFilters<'_>) -> String;

const DATABASE_LOG_TEMPLATES: [(EngineFamily, TemplateFn); 4] = [
    (EngineFamily::RelationalMysql, mysql_error_log),
    (EngineFamily::ClusterMysql, mysql_error_log),
    (EngineFamily::RelationalPostgres, postgres_log),
    (EngineFamily::ClusterPostgres, postgres_log),
];

/// Template for an engine family, if its database logs can be queried.
pub fn template_for(family: EngineFamily) -> Option<TemplateFn> {
    DATABASE_LOG_TEMPLATES
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, template)| *template)
}

/// Severity-tagged MySQL error log lines.
fn mysql_error_log(source: &LogSource, _filters: &LogFilters<'_>) -> String {
    let mut query = format!("SOURCE '{}' | fields @message\n", source.log_group("error"));
    if let Some(stream) = source.stream_filter() {
        query.push_str(&stream);
    }
    query.push_str("| filter @message like \"[Error]\" or @message like \"[Warning]\"\n");
    query.push_str("| sort @timestamp desc\n| limit 20");
    query
}

/// PostgreSQL log lines parsed on the `log_line_prefix` layout
/// `%t:%r:%u@%d:[%p]:`. Instance sources are further restricted to
/// connections from the replication instance.
fn postgres_log(source: &LogSource, filters: &LogFilters<'_>) -> String {
    let mut query = format!("SOURCE '{}' | fields @message\n", source.log_group("postgresql"));
    if let Some(stream) = source.stream_filter() {
        query.push_str(&stream);
    }
    query.push_str(
        "| parse @message \"* UTC:*(*):*@*:[*]:*: *\" as @timestamp_utc, @ip, @port, @db_user, @db, @pid, @severity, @info\n",
    );
    query.push_str("| filter @severity in [\"ERROR\",\"WARNING\",\"FATAL\",\"PANIC\"]\n");
    if let Some(user) = filters.username {
        query.push_str(&format!("| filter @db_user={}\n", quoted(user)));
    }
    if matches!(source, LogSource::Instance { .. }) && !filters.ip_addresses.is_empty() {
        let ips = filters
            .ip_addresses
            .iter()
            .map(|ip| quoted(ip))
            .collect::<Vec<_>>()
            .join(",");
        query.push_str(&format!("| filter @ip in [{ips}]\n"));
    }
    query.push_str("| sort @timestamp desc\n| display @message\n| limit 20");
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips() -> Vec<String> {
        vec!["10.0.0.5".to_string(), "54.1.2.3".to_string()]
    }

    #[test]
    fn test_streaming_and_unsupported_have_no_template() {
        assert!(template_for(EngineFamily::Streaming).is_none());
        assert!(template_for(EngineFamily::Unsupported).is_none());
        assert!(template_for(EngineFamily::ClusterPostgres).is_some());
    }

    #[test]
    fn test_mysql_instance_query() {
        let source = LogSource::Instance { instance_id: "db1".into() };
        let query = template_for(EngineFamily::RelationalMysql).unwrap()(&source, &LogFilters::default());
        assert!(query.starts_with("SOURCE '/aws/rds/instance/db1/error'"));
        assert!(query.contains("@logStream like \"db1\""));
        assert!(query.contains("[Error]"));
    }

    #[test]
    fn test_postgres_instance_query_filters_user_and_ips() {
        let source = LogSource::Instance { instance_id: "pg1".into() };
        let ips = ips();
        let filters = LogFilters { username: Some("dms_user"), ip_addresses: &ips };
        let query = template_for(EngineFamily::RelationalPostgres).unwrap()(&source, &filters);
        assert!(query.starts_with("SOURCE '/aws/rds/instance/pg1/postgresql'"));
        assert!(query.contains("@db_user=\"dms_user\""));
        assert!(query.contains("@ip in [\"10.0.0.5\",\"54.1.2.3\"]"));
    }

    #[test]
    fn test_postgres_cluster_query_has_no_ip_or_stream_filter() {
        let source = LogSource::Cluster { cluster_id: "pgc".into() };
        let ips = ips();
        let filters = LogFilters { username: Some("dms_user"), ip_addresses: &ips };
        let query = template_for(EngineFamily::ClusterPostgres).unwrap()(&source, &filters);
        assert!(query.starts_with("SOURCE '/aws/rds/cluster/pgc/postgresql'"));
        assert!(query.contains("@db_user=\"dms_user\""));
        assert!(!query.contains("@ip in"));
        assert!(!query.contains("@logStream"));
    }

    #[test]
    fn test_username_quotes_and_backslashes_are_escaped() {
        let source = LogSource::Cluster { cluster_id: "pgc".into() };
        let filters = LogFilters { username: Some(r#"dms"\user"#), ip_addresses: &[] };
        let query = postgres_log(&source, &filters);
        assert!(query.contains(r#"| filter @db_user="dms\"\\user""#));
    }
}
