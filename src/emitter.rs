//! Event emission: schema lookup, reordering, escaping, one line per call
//!
//! `Eventlog` owns the process registry together with the event sink, so the
//! "register in this process before logging" contract is visible in one type.

use std::sync::Arc;

use crate::config::EventlogConfig;
use crate::error::{EventlogError, Result};
use crate::escape::escape_str;
use crate::fields::Fields;
use crate::registry::{EventId, EventRegistry, EventSpec, EventType, SchemaFile};
use crate::sink::{LineSink, RotatingFileSink};

/// Reserved correlation column; a single space until flow ids exist
pub const FLOW_ID_PLACEHOLDER: &str = " ";

/// Event line body: `<flow-id> <hex id>` then `\t<value>` for every schema
/// field the caller supplied, in schema order.
///
/// Supplied names outside the schema are ignored; schema fields that were not
/// supplied are left out entirely.
pub fn render_event(event_type: &EventType, fields: &Fields) -> String {
    let mut line = format!("{} {:x}", FLOW_ID_PLACEHOLDER, event_type.id());
    for name in event_type.fields() {
        if let Some(value) = fields.get(name) {
            line.push('\t');
            line.push_str(&escape_str(value));
        }
    }
    line
}

/// Registry + event/layout sinks for one process
pub struct Eventlog {
    registry: EventRegistry,
    events: Arc<dyn LineSink>,
}

impl Eventlog {
    /// Wire up arbitrary sinks (in-memory sinks in tests)
    pub fn with_sinks(events: Arc<dyn LineSink>, layout: Arc<dyn LineSink>) -> Self {
        Self {
            registry: EventRegistry::new(layout),
            events,
        }
    }

    /// Open the rotating event and layout files described by `config`
    pub fn open(config: &EventlogConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.log_dir)?;

        let events = RotatingFileSink::open(
            config.event_path(),
            config.rotation,
            config.backup_count,
        )?;
        let layout = RotatingFileSink::open(
            config.layout_path(),
            config.rotation,
            config.backup_count,
        )?;

        tracing::debug!(
            events = %events.path().display(),
            layout = %layout.path().display(),
            "eventlog opened"
        );

        Ok(Self::with_sinks(Arc::new(events), Arc::new(layout)))
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// See [`EventRegistry::register`]
    pub fn register<S: AsRef<str>>(
        &self,
        id: impl Into<EventId>,
        name: &str,
        fields: &[S],
    ) -> Result<Arc<EventType>> {
        self.registry.register(id, name, fields)
    }

    /// See [`EventRegistry::register_all`]
    pub fn register_all<N, I>(&self, entries: I) -> Result<()>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, EventSpec)>,
    {
        self.registry.register_all(entries)
    }

    /// Register every event declared in a schema file, in file order
    pub fn register_schema(&self, schema: &SchemaFile) -> Result<()> {
        self.registry.register_all(
            schema
                .events
                .iter()
                .map(|(name, spec)| (name.as_str(), spec.clone())),
        )
    }

    /// Log one event; argument order in `fields` does not matter.
    ///
    /// ```ignore
    /// log.register(0x62001u64, "SOME_PAYMENT", &["first", "second", "third"])?;
    /// log.log(0x62001u64, &Fields::new().with("third", "DE").with("first", "PAYMENT"))?;
    /// ```
    pub fn log(&self, id: impl Into<EventId>, fields: &Fields) -> Result<()> {
        let id = id.into();
        let event_type = self
            .registry
            .get(id)
            .ok_or(EventlogError::UnregisteredEventId { id: id.get() })?;

        let line = render_event(&event_type, fields);
        tracing::trace!(event_id = %id, values = fields.len(), "emit");

        self.events.write_line(&line)?;
        Ok(())
    }
}

impl std::fmt::Debug for Eventlog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eventlog")
            .field("registry", &self.registry)
            .finish()
    }
}
