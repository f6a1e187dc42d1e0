//! Dashboard document models.
//!
//! A dashboard is an ordered list of widgets on a 24-column grid. Widgets are
//! built through the typed constructors below and serialized once, when the
//! whole document is assembled.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Number of columns in the dashboard grid.
pub const GRID_COLUMNS: u32 = 24;

/// Position and size of a widget in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether two rectangles share any grid cell.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let x_disjoint = self.right() <= other.x || other.right() <= self.x;
        let y_disjoint = self.bottom() <= other.y || other.bottom() <= self.y;
        !(x_disjoint || y_disjoint)
    }
}

/// Wire-level widget type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Text,
    Metric,
    Log,
}

/// How a metric widget renders its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricView {
    #[serde(rename = "timeSeries")]
    TimeSeries,
    #[serde(rename = "singleValue")]
    SingleValue,
}

/// Y axis a metric series is drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxisSide {
    Left,
    Right,
}

/// One line of a metric widget: either a metric with dimensions or a
/// Metrics Insights expression.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricLine {
    Metric {
        namespace: String,
        name: String,
        dimensions: Vec<(String, String)>,
        y_axis: Option<YAxisSide>,
    },
    Expression {
        id: String,
        expression: String,
        region: String,
    },
}

impl MetricLine {
    /// A metric with the given dimensions on the left axis.
    pub fn metric(namespace: &str, name: &str, dimensions: &[(&str, &str)]) -> Self {
        MetricLine::Metric {
            namespace: namespace.to_string(),
            name: name.to_string(),
            dimensions: dimensions
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            y_axis: None,
        }
    }

    /// Moves a metric line to the right axis. Expressions are left untouched.
    pub fn on_right_axis(mut self) -> Self {
        if let MetricLine::Metric { y_axis, .. } = &mut self {
            *y_axis = Some(YAxisSide::Right);
        }
        self
    }

    /// A Metrics Insights query expression.
    pub fn expression(id: &str, expression: impl Into<String>, region: &str) -> Self {
        MetricLine::Expression {
            id: id.to_string(),
            expression: expression.into(),
            region: region.to_string(),
        }
    }
}

struct RenderOptions {
    y_axis: YAxisSide,
}

impl Serialize for RenderOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("yAxis", &self.y_axis)?;
        map.end()
    }
}

struct ExpressionEntry<'a> {
    id: &'a str,
    expression: &'a str,
    region: &'a str,
}

impl Serialize for ExpressionEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("expression", self.expression)?;
        map.serialize_entry("label", "")?;
        map.serialize_entry("id", self.id)?;
        map.serialize_entry("region", self.region)?;
        map.end()
    }
}

// Metric lines use the dashboard array form:
// [namespace, name, dim1, value1, ..., {options}] or [{expression...}].
impl Serialize for MetricLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricLine::Metric {
                namespace,
                name,
                dimensions,
                y_axis,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(namespace)?;
                seq.serialize_element(name)?;
                for (key, value) in dimensions {
                    seq.serialize_element(key)?;
                    seq.serialize_element(value)?;
                }
                if let Some(y_axis) = y_axis {
                    seq.serialize_element(&RenderOptions { y_axis: *y_axis })?;
                }
                seq.end()
            }
            MetricLine::Expression {
                id,
                expression,
                region,
            } => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(&ExpressionEntry {
                    id,
                    expression,
                    region,
                })?;
                seq.end()
            }
        }
    }
}

/// Left axis label of a single-value widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub label: String,
    #[serde(rename = "showUnits")]
    pub show_units: bool,
}

/// Y axis configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YAxis {
    pub left: AxisLabel,
}

/// Properties of a text widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextProperties {
    pub markdown: String,
}

/// Properties of a metric widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricProperties {
    pub metrics: Vec<MetricLine>,
    pub view: MetricView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacked: Option<bool>,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    pub title: String,
    #[serde(rename = "yAxis", skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<YAxis>,
}

impl MetricProperties {
    /// Time series averaged over `period` seconds.
    pub fn time_series(title: impl Into<String>, region: &str, period: u32, metrics: Vec<MetricLine>) -> Self {
        Self {
            metrics,
            view: MetricView::TimeSeries,
            stacked: Some(false),
            region: region.to_string(),
            stat: Some("Average".to_string()),
            period: Some(period),
            title: title.into(),
            y_axis: None,
        }
    }

    /// Single value counter labelled "Count".
    pub fn single_value(title: impl Into<String>, region: &str, metrics: Vec<MetricLine>) -> Self {
        Self {
            metrics,
            view: MetricView::SingleValue,
            stacked: None,
            region: region.to_string(),
            stat: Some("Average".to_string()),
            period: Some(300),
            title: title.into(),
            y_axis: Some(YAxis {
                left: AxisLabel {
                    label: "Count".to_string(),
                    show_units: false,
                },
            }),
        }
    }
}

/// Properties of a log query widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogProperties {
    pub query: String,
    pub region: String,
    pub stacked: bool,
    pub title: String,
    pub view: String,
}

impl LogProperties {
    /// Log query rendered as a table.
    pub fn table(title: impl Into<String>, region: &str, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            region: region.to_string(),
            stacked: false,
            title: title.into(),
            view: "table".to_string(),
        }
    }
}

/// Type specific widget payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WidgetProperties {
    Text(TextProperties),
    Metric(MetricProperties),
    Log(LogProperties),
}

/// One placed dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    #[serde(rename = "type")]
    widget_type: WidgetType,
    #[serde(flatten)]
    rect: Rect,
    properties: WidgetProperties,
}

impl Widget {
    pub fn text(rect: Rect, markdown: impl Into<String>) -> Self {
        Self {
            widget_type: WidgetType::Text,
            rect,
            properties: WidgetProperties::Text(TextProperties {
                markdown: markdown.into(),
            }),
        }
    }

    pub fn metric(rect: Rect, properties: MetricProperties) -> Self {
        Self {
            widget_type: WidgetType::Metric,
            rect,
            properties: WidgetProperties::Metric(properties),
        }
    }

    pub fn log(rect: Rect, properties: LogProperties) -> Self {
        Self {
            widget_type: WidgetType::Log,
            rect,
            properties: WidgetProperties::Log(properties),
        }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn properties(&self) -> &WidgetProperties {
        &self.properties
    }

    /// Title of metric and log widgets.
    pub fn title(&self) -> Option<&str> {
        match &self.properties {
            WidgetProperties::Text(_) => None,
            WidgetProperties::Metric(p) => Some(&p.title),
            WidgetProperties::Log(p) => Some(&p.title),
        }
    }
}

/// The complete dashboard document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub widgets: Vec<Widget>,
}

impl Dashboard {
    pub fn new(widgets: Vec<Widget>) -> Self {
        Self { widgets }
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}
