//! Dashboard sections.
//!
//! Every generator is a pure function of a starting cursor and its inputs,
//! returning the section's widgets and the cursor below them.

use common::models::{LogProperties, MetricLine, MetricProperties, Widget};

use crate::layout::{Cursor, Section};

const DMS_NAMESPACE: &str = "AWS/DMS";
const INSTANCE_DIMENSION: &str = "ReplicationInstanceIdentifier";
const TASK_DIMENSION: &str = "ReplicationTaskIdentifier";

/// Title of every target database log panel.
pub const DATABASE_LOG_TITLE: &str = "Target Database Error Log";

/// Inputs shared by every section.
#[derive(Debug, Clone, Copy)]
pub struct SectionContext<'a> {
    pub instance_id: &'a str,
    pub region: &'a str,
}

impl SectionContext<'_> {
    fn task_log_group(&self) -> String {
        format!("dms-tasks-{}", self.instance_id)
    }

    fn instance_metric(&self, name: &str) -> MetricLine {
        MetricLine::metric(DMS_NAMESPACE, name, &[(INSTANCE_DIMENSION, self.instance_id)])
    }

    fn task_metric(&self, name: &str, task_id: &str) -> MetricLine {
        MetricLine::metric(
            DMS_NAMESPACE,
            name,
            &[(INSTANCE_DIMENSION, self.instance_id), (TASK_DIMENSION, task_id)],
        )
    }
}

/// One row of the per-task log section.
#[derive(Debug, Clone, Copy)]
pub struct TaskLogInput<'a> {
    pub task_id: &'a str,
    /// Target database log query, when the endpoint was classified.
    pub database_log_query: Option<&'a str>,
}

const INSTANCE_OVERVIEW: &str = "## Replication Instance Metrics \n\
- Instance Class Scaling Up (Out): high CPU, low freeable memory and high swap usage (swap usage > 0) \n\
- Storage Scaling Up (Out): low free storage and high disk queue depth, especially when migrating or \
replicating more data (more network receive or transmit throughput).";

pub fn instance_metrics(cursor: Cursor, ctx: &SectionContext<'_>) -> (Vec<Widget>, Cursor) {
    let mut section = Section::start(cursor);
    section.row(|row| {
        row.text(
            24,
            3,
            format!(
                "# DMS Dashboard for Replication Instance {} \n{INSTANCE_OVERVIEW}",
                ctx.instance_id
            ),
        );
    });
    section.row(|row| {
        row.place(6, 6, |rect| {
            Widget::metric(
                rect,
                MetricProperties::time_series(
                    "RI CPU Utilization",
                    ctx.region,
                    300,
                    vec![ctx.instance_metric("CPUUtilization")],
                ),
            )
        });
        row.place(6, 6, |rect| {
            Widget::metric(
                rect,
                MetricProperties::time_series(
                    "RI Memory Utilization",
                    ctx.region,
                    300,
                    vec![
                        ctx.instance_metric("FreeableMemory"),
                        ctx.instance_metric("SwapUsage").on_right_axis(),
                    ],
                ),
            )
        });
        row.place(6, 6, |rect| {
            Widget::metric(
                rect,
                MetricProperties::time_series(
                    "RI Free Storage",
                    ctx.region,
                    300,
                    vec![ctx.instance_metric("FreeStorageSpace")],
                ),
            )
        });
        row.place(6, 6, |rect| {
            Widget::metric(
                rect,
                MetricProperties::time_series(
                    "Migration Workloads",
                    ctx.region,
                    60,
                    vec![
                        ctx.instance_metric("NetworkTransmitThroughput"),
                        ctx.instance_metric("NetworkReceiveThroughput"),
                        ctx.instance_metric("DiskQueueDepth").on_right_axis(),
                    ],
                ),
            )
        });
    });
    section.finish()
}

const METRICS_INSIGHTS_NOTE: &str = "in the most recent three hours \
([CloudWatch Metrics Insights currently allow only 3 hours]\
(https://docs.aws.amazon.com/AmazonCloudWatch/latest/monitoring/cloudwatch-metrics-insights-limits.html)).";

/// Published counter name, panel title and panel width.
const VALIDATION_COUNTERS: [(&str, &str, u32); 9] = [
    ("Table completed", "Tables Completed", 2),
    ("Validated", "Validated", 2),
    ("Table error", "Table error", 2),
    ("Pending records", "Pending Records", 3),
    ("No primary Key", "Validation Missing PK", 3),
    ("Not enabled", "Validation Not Enabled", 3),
    ("ValidationSuspendedRecords", "ValidationSuspendedRecords", 3),
    ("ValidationFailedRecords", "ValidationFailedRecords", 3),
    ("ValidationPendingRecords", "ValidationPendingRecords", 3),
];

fn validation_counter_query(counter: &str, instance_id: &str) -> String {
    format!(
        "SELECT SUM(\"{counter}\")\n  FROM SCHEMA(\"CustomMetrics/DMS\", {INSTANCE_DIMENSION}, {TASK_DIMENSION})\n \
         WHERE {INSTANCE_DIMENSION} = '{instance_id}'\n GROUP BY {INSTANCE_DIMENSION}"
    )
}

pub fn validation_metrics(cursor: Cursor, ctx: &SectionContext<'_>) -> (Vec<Widget>, Cursor) {
    let mut section = Section::start(cursor);
    section.row(|row| {
        row.text(
            15,
            2,
            format!(
                "## Table Counts per Validation State\nNumber of tables in varied validation state {METRICS_INSIGHTS_NOTE}"
            ),
        );
        row.text(
            9,
            2,
            format!(
                "## Record Counts per Validation State\nTotal number of records for all tables in varied validation state {METRICS_INSIGHTS_NOTE}"
            ),
        );
    });
    section.row(|row| {
        for (counter, title, width) in VALIDATION_COUNTERS {
            row.place(width, 3, |rect| {
                Widget::metric(
                    rect,
                    MetricProperties::single_value(
                        title,
                        ctx.region,
                        vec![MetricLine::expression(
                            "q1",
                            validation_counter_query(counter, ctx.instance_id),
                            ctx.region,
                        )],
                    ),
                )
            });
        }
    });
    section.finish()
}

const TASK_METRICS_OVERVIEW: &str = "## Task Metrics \n\
**CDC Latency Definition**\n\
- CDC Source Latency: Latency between source and replication instance.\n\
- CDC Target Latency: Latency between source and target. Thus, CDC Target Latency >= CDC Source Latency\n\n\
**Identify CDC Latency**\n\
- CDC Source Latency >> 0 and CDC Source Latency = CDC Target Latency : focus on **source** latency\n\
  - [Mitigate CDC Source Latency](https://aws.amazon.com/premiumsupport/knowledge-center/dms-high-source-latency/)\n\
- CDC Source Latency = 0 and CDC Target Latency >> 0: focus on **target** latency\n\
  - Incoming changes spikes together with CDC Target Latency\n\
  - CDCChangesTargetDisk spikes as CDC changes queued up and are saved to disk\n\
  - [Mitigate CDC target latency](https://aws.amazon.com/premiumsupport/knowledge-center/dms-high-target-latency/)\n\n\
**Task Recovery**\n\n\
Task repeatedly recovers indicates that some issue is not able to self heal and needs manual intervention. \
Situations like source or target database downtime, connectivity issue, etc.";

/// Aggregate task metrics followed by the per-task latency grid.
pub fn task_metrics(cursor: Cursor, ctx: &SectionContext<'_>, task_ids: &[&str]) -> (Vec<Widget>, Cursor) {
    if task_ids.is_empty() {
        return (Vec::new(), cursor);
    }

    let per_task = |names: &[&str]| -> Vec<MetricLine> {
        task_ids
            .iter()
            .flat_map(|task_id| names.iter().map(move |name| ctx.task_metric(name, task_id)))
            .collect()
    };

    let mut section = Section::start(cursor);
    section.row(|row| row.text(24, 8, TASK_METRICS_OVERVIEW));
    section.row(|row| {
        let aggregates: [(&str, &[&str]); 4] = [
            ("CPU Utilization by Tasks", &["CPUUtilization"]),
            ("Memory Usage by Tasks", &["MemoryUsageBytes"]),
            ("Task RecoveryCount", &["RecoveryCount"]),
            (
                "Validation Issue",
                &["ValidationFailedOverallCount", "ValidationPendingOverallCount"],
            ),
        ];
        for (title, names) in aggregates {
            row.place(6, 6, |rect| {
                Widget::metric(
                    rect,
                    MetricProperties::time_series(title, ctx.region, 60, per_task(names)),
                )
            });
        }
    });
    section.row(|row| {
        row.place(24, 6, |rect| {
            Widget::metric(
                rect,
                MetricProperties::time_series(
                    "CDC Latency",
                    ctx.region,
                    60,
                    per_task(&["CDCLatencySource", "CDCLatencyTarget"]),
                ),
            )
        });
    });
    let (mut widgets, next) = section.finish();

    let (grid, next) = task_latency_grid(next, ctx, task_ids);
    widgets.extend(grid);
    (widgets, next)
}

/// One 6x6 latency panel per task, four per row.
pub fn task_latency_grid(cursor: Cursor, ctx: &SectionContext<'_>, task_ids: &[&str]) -> (Vec<Widget>, Cursor) {
    let mut section = Section::start(cursor);
    section.grid(
        6,
        6,
        task_ids.iter().map(|task_id| {
            move |rect| {
                Widget::metric(
                    rect,
                    MetricProperties::time_series(
                        format!("CDC Latency {task_id}"),
                        ctx.region,
                        60,
                        vec![
                            ctx.task_metric("CDCLatencySource", task_id),
                            ctx.task_metric("CDCLatencyTarget", task_id),
                            ctx.task_metric("CDCIncomingChanges", task_id).on_right_axis(),
                            ctx.task_metric("CDCChangesDiskTarget", task_id).on_right_axis(),
                            ctx.task_metric("CDCChangesDiskSource", task_id).on_right_axis(),
                        ],
                    ),
                )
            }
        }),
    );
    section.finish()
}

const TASK_ERRORS_LEGEND: &str = "## Task Errors \n\n\
**Logging Level**\n\
- T: Trace messages are written to the log.\n\
- D: Debug messages are written to the log.\n\
- I: Informational messages are written to the log.\n\
- W: Warnings are written to the log.\n\
- E: Error messages are written to the log.\n\n\
**Logging Components**\n\
- **FILE_FACTORY**: manages files used for batch apply and batch load, and manages Amazon S3 endpoints.\n\
- **METADATA_MANAGER**: manages source and target metadata, partitioning, and table state during replication.\n\
- **SORTER**: receives incoming events from SOURCE_CAPTURE, batches them in transactions and passes them to \
TARGET_APPLY. Backlogged events are cached to disk, a common cause of replication instances running out of storage.\n\
- **SOURCE_CAPTURE**: ongoing replication (CDC) data captured from the source and passed to the SORTER.\n\
- **SOURCE_UNLOAD**: data unloaded from the source during Full Load.\n\
- **TABLES_MANAGER**: tracks captured tables, orders table migration and collects table statistics.\n\
- **TARGET_APPLY**: data and DDL statements applied to the target database.\n\
- **TARGET_LOAD**: data loaded into the target database.\n\
- **TASK_MANAGER**: manages running tasks and breaks them down into sub-tasks for parallel processing.\n\
- **TRANSFORMATION**: table-mapping transformation events.\n\
- **VALIDATOR/ VALIDATOR_EXT**: verifies that data was migrated accurately from the source to the target.\n\n\
[More details](https://docs.aws.amazon.com/dms/latest/userguide/CHAP_Tasks.CustomizingTasks.TaskSettings.Logging.html)";

pub fn task_error_summary(cursor: Cursor, ctx: &SectionContext<'_>) -> (Vec<Widget>, Cursor) {
    let log_group = ctx.task_log_group();
    let query = format!(
        "SOURCE '{log_group}' | fields @logStream, @message\n\
         | filter @message like /]E:/\n\
         | filter @message not like /DATA_STRUCTURE/\n\
         | parse @message \"* [* ]*\" as timestamp, logComponent, error\n\
         | stats count(*) as countLogComponent by @logStream,logComponent\n\
         | sort @logStream\n"
    );

    let mut section = Section::start(cursor);
    section.row(|row| row.text(24, 12, TASK_ERRORS_LEGEND));
    section.row(|row| {
        row.place(24, 6, |rect| {
            Widget::log(
                rect,
                LogProperties::table(format!("Error by log component: {log_group}"), ctx.region, query),
            )
        });
    });
    section.finish()
}

/// Body of a `/.../` pattern matching `value` literally.
fn literal_pattern(value: &str) -> String {
    regex::escape(value).replace('/', "\\/")
}

/// Heading, error history and, when available, the target database log of
/// each task.
pub fn task_log_groups(cursor: Cursor, ctx: &SectionContext<'_>, tasks: &[TaskLogInput<'_>]) -> (Vec<Widget>, Cursor) {
    let log_group = ctx.task_log_group();
    let mut section = Section::start(cursor);

    for task in tasks {
        section.row(|row| row.text(24, 1, format!("## Task {}\n", task.task_id)));
        section.row(|row| {
            row.place(24, 9, |rect| {
                Widget::log(
                    rect,
                    LogProperties::table(
                        format!("Error history: {}", task.task_id),
                        ctx.region,
                        format!(
                            "SOURCE '{log_group}' | fields @message\n\
                             | filter @logStream like /{}/\n\
                             | filter @message like /]E:/ or @message like /]W:/\n\
                             | filter @message not like /DATA_STRUCTURE/",
                            literal_pattern(task.task_id)
                        ),
                    ),
                )
            });
        });
        if let Some(query) = task.database_log_query {
            section.row(|row| {
                row.place(24, 6, |rect| {
                    Widget::log(rect, LogProperties::table(DATABASE_LOG_TITLE, ctx.region, query))
                });
            });
        }
    }
    section.finish()
}
