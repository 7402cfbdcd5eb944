//! Domain vocabulary shared by every imgbench crate: canonical run
//! statuses, the task-type table, local catalog/run shapes, and the
//! built-in catalog entries.

pub mod builtin;
pub mod display;
pub mod error;
pub mod metric_names;
pub mod models;
pub mod params;
pub mod status;
pub mod task_type;
pub mod types;
