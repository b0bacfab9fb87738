//! eventlog - schema-ordered, tab-delimited event logging
//!
//! Register event types with an ordered field schema, then log events by id
//! with named values. Lines always follow the schema order, values are
//! escaped, and every schema is declared once in a companion layout file.

pub mod config;
pub mod emitter;
pub mod error;
pub mod escape;
pub mod fields;
pub mod registry;
pub mod sink;
pub mod stress;

pub use config::EventlogConfig;
pub use emitter::{render_event, Eventlog, FLOW_ID_PLACEHOLDER};
pub use error::{EventlogError, FixSuggestion, Result};
pub use escape::{escape, escape_str};
pub use fields::Fields;
pub use registry::{render_layout, EventId, EventRegistry, EventSpec, EventType, SchemaFile};
pub use sink::{LineSink, MemorySink, RotatingFileSink, RotationInterval, RotationPolicy};
