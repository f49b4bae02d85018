//! Task snapshot pipeline: schema check, date coercion, derived fields,
//! filtering and aggregation for project-timeline views.

pub mod cache;
pub mod config;
pub mod derive;
pub mod error;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;

pub use cache::{Loaded, PipelineCache, Session};
pub use error::{ConfigError, PipelineError, SchemaError};
pub use filter::{apply, DateRange, FilterSpec, Filtered, Selection};
pub use types::{CompletionStatus, Dimension, Measure, Task, TaskBatch};
