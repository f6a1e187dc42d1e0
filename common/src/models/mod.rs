//! Shared data models.

pub mod dashboard;
pub mod replication;

pub use dashboard::{
    Dashboard, LogProperties, MetricLine, MetricProperties, Rect, Widget, WidgetProperties,
    GRID_COLUMNS,
};
pub use replication::{
    DbInstanceFilter, DbInstanceRecord, DirectConnection, Endpoint, EndpointRecord, EngineFamily,
    ReplicationInstance, ReplicationInstanceRecord, ReplicationTask, ReplicationTaskRecord,
    TaskPage,
};
