//! Dashboard assembly.
//!
//! Runs the section generators in a fixed order over a [`ResourceGraph`],
//! serializes the document once and validates the serialized form before it
//! is handed to a publisher.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use common::errors::{AppError, AppResult};
use common::models::{Dashboard, Endpoint, Rect, Widget, GRID_COLUMNS};

use crate::classifier::{ClassifierInput, Decision, EngineClassifier, Rule};
use crate::layout::Cursor;
use crate::resource_graph::ResourceGraph;
use crate::templates::{template_for, LogFilters};
use crate::widgets::{self, SectionContext, TaskLogInput};

const REQUIRED_WIDGET_KEYS: [&str; 6] = ["type", "x", "y", "width", "height", "properties"];

/// A validated dashboard document ready to publish.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComposedDashboard {
    pub name: String,
    /// Serialized `{"widgets": [...]}` document.
    pub body: String,
    pub widget_count: usize,
    /// Everything skipped or degraded while composing.
    pub notes: Vec<String>,
}

pub struct DashboardAssembler {
    classifier: EngineClassifier,
    region: String,
}

struct Composition {
    widgets: Vec<Widget>,
    cursor: Cursor,
}

impl Composition {
    fn append(&mut self, (widgets, next): (Vec<Widget>, Cursor)) {
        self.widgets.extend(widgets);
        self.cursor = next;
    }
}

impl DashboardAssembler {
    pub fn new(classifier: EngineClassifier, region: impl Into<String>) -> Self {
        Self {
            classifier,
            region: region.into(),
        }
    }

    /// Composes the dashboard `name` for `graph`.
    pub fn assemble(&self, name: &str, graph: &ResourceGraph) -> AppResult<ComposedDashboard> {
        let mut notes = graph.notes.clone();
        let mut composition = Composition {
            widgets: Vec::new(),
            cursor: Cursor::TOP,
        };

        if let Some(instance) = &graph.instance {
            let ctx = SectionContext {
                instance_id: &instance.identifier,
                region: &self.region,
            };
            let queries = self.database_log_queries(graph, &mut notes);
            let task_ids: Vec<&str> = graph.tasks.iter().map(|t| t.external_id.as_str()).collect();
            let task_logs: Vec<TaskLogInput<'_>> = graph
                .tasks
                .iter()
                .map(|task| TaskLogInput {
                    task_id: &task.external_id,
                    database_log_query: queries.get(&task.target_endpoint_arn).map(String::as_str),
                })
                .collect();

            composition.append(widgets::instance_metrics(composition.cursor, &ctx));
            composition.append(widgets::validation_metrics(composition.cursor, &ctx));
            composition.append(widgets::task_metrics(composition.cursor, &ctx, &task_ids));
            composition.append(widgets::task_error_summary(composition.cursor, &ctx));
            composition.append(widgets::task_log_groups(composition.cursor, &ctx, &task_logs));
        }

        let dashboard = Dashboard::new(composition.widgets);
        if dashboard.is_empty() {
            return Err(AppError::EmptyDashboard(format!("{name} ({})", notes.join("; "))));
        }

        let body = serde_json::to_string(&dashboard)?;
        let widget_count = validate_document(&body)?;
        tracing::info!(
            dashboard = %name,
            widgets = widget_count,
            rows = composition.cursor.y(),
            notes = notes.len(),
            "dashboard composed"
        );

        Ok(ComposedDashboard {
            name: name.to_string(),
            body,
            widget_count,
            notes,
        })
    }

    /// Database log query per target endpoint ARN. Each endpoint is
    /// classified once; every task targeting it reuses the query.
    fn database_log_queries(&self, graph: &ResourceGraph, notes: &mut Vec<String>) -> BTreeMap<String, String> {
        let ip_addresses = graph
            .instance
            .as_ref()
            .map(|instance| instance.ip_addresses.as_slice())
            .unwrap_or_default();

        let mut queries = BTreeMap::new();
        for endpoint in graph.endpoints.values() {
            let Some(connection) = &endpoint.connection else {
                continue;
            };
            let classification = self.classifier.classify(&ClassifierInput {
                server_name: &connection.server_name,
                label: &connection.label,
                cluster_id: graph.known_cluster(&connection.label),
                family: endpoint.family,
            });
            tracing::debug!(
                endpoint = %endpoint.arn,
                rule = classification.rule.as_str(),
                "endpoint classified"
            );

            if classification.rule == Rule::ClusterAlias {
                note(
                    notes,
                    format!(
                        "{} address {} is not a managed endpoint; assuming cluster logs",
                        describe(endpoint),
                        connection.server_name
                    ),
                );
            }
            match classification.decision {
                Decision::Logs(source) => {
                    if let Some(template) = template_for(endpoint.family) {
                        let filters = LogFilters {
                            username: connection.username.as_deref(),
                            ip_addresses,
                        };
                        queries.insert(endpoint.arn.clone(), template(&source, &filters));
                    }
                }
                Decision::NotLogCapable => {
                    note(notes, format!("{} has no database log panel", describe(endpoint)));
                }
                Decision::Unclassifiable => {
                    note(
                        notes,
                        format!(
                            "{} address {} is not a recognized database endpoint; database log skipped",
                            describe(endpoint),
                            connection.server_name
                        ),
                    );
                }
            }
        }
        queries
    }
}

fn describe(endpoint: &Endpoint) -> String {
    format!("endpoint {} ({})", endpoint.arn, endpoint.family)
}

fn note(notes: &mut Vec<String>, message: String) {
    tracing::info!(note = %message, "dashboard assembly");
    notes.push(message);
}

/// Checks a serialized document: every widget carries its layout keys,
/// stays on the grid and overlaps no other widget. Returns the widget count.
fn validate_document(body: &str) -> AppResult<usize> {
    let document: Value = serde_json::from_str(body)?;
    let widgets = document
        .get("widgets")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Structural("document has no widgets array".into()))?;

    let mut rects: Vec<Rect> = Vec::with_capacity(widgets.len());
    for (index, widget) in widgets.iter().enumerate() {
        let fields = widget
            .as_object()
            .ok_or_else(|| AppError::Structural(format!("widget {index} is not an object")))?;
        if let Some(missing) = REQUIRED_WIDGET_KEYS.iter().find(|key| !fields.contains_key(**key)) {
            return Err(AppError::Structural(format!("widget {index} has no {missing}")));
        }

        let dimension = |key: &str| -> AppResult<u32> {
            fields
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| AppError::Structural(format!("widget {index} has an invalid {key}")))
        };
        let rect = Rect::new(dimension("x")?, dimension("y")?, dimension("width")?, dimension("height")?);
        if rect.width == 0 || rect.height == 0 || rect.right() > GRID_COLUMNS {
            return Err(AppError::Structural(format!(
                "widget {index} at {rect:?} does not fit the {GRID_COLUMNS}-column grid"
            )));
        }
        if let Some(other) = rects.iter().position(|placed| placed.overlaps(&rect)) {
            return Err(AppError::Structural(format!("widgets {other} and {index} overlap")));
        }
        rects.push(rect);
    }
    Ok(rects.len())
}
