//! Event type registry
//!
//! Insert-only map from event id to an immutable, ordered field schema. Every
//! successful registration writes exactly one layout record. Each process owns
//! its own registry and must register its types before logging them.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::Deserialize;

use crate::error::{EventlogError, Result};
use crate::sink::LineSink;

/// Uppercase letter/digit runs separated by single underscores
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+(_[A-Z0-9]+)*$").unwrap());

/// camelCase, first letter lowercase, no separators
static FIELD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap());

pub fn is_valid_event_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

pub fn is_valid_field_name(field: &str) -> bool {
    FIELD_PATTERN.is_match(field)
}

// ═══════════════════════════════════════════════════════════════
// EventId
// ═══════════════════════════════════════════════════════════════

/// Non-negative event id, rendered as bare lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<u32> for EventId {
    fn from(id: u32) -> Self {
        Self(u64::from(id))
    }
}

impl TryFrom<i64> for EventId {
    type Error = EventlogError;

    fn try_from(id: i64) -> Result<Self> {
        u64::try_from(id)
            .map(Self)
            .map_err(|_| EventlogError::InvalidEventId { id: id.to_string() })
    }
}

impl FromStr for EventId {
    type Err = EventlogError;

    /// Accepts decimal (`398472`) or `0x`-prefixed hex (`0x61488`)
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(Self)
            .map_err(|_| EventlogError::InvalidEventId { id: s.to_string() })
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::LowerHex for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

// ═══════════════════════════════════════════════════════════════
// EventType
// ═══════════════════════════════════════════════════════════════

/// A registered event type (immutable)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventType {
    id: EventId,
    name: String,
    fields: Vec<String>,
}

impl EventType {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names in registration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Layout record body: `<hex id>\t<NAME>\t<field1>...\t<fieldN>`
pub fn render_layout(event_type: &EventType) -> String {
    let mut line = format!("{:x}\t{}", event_type.id, event_type.name);
    for field in &event_type.fields {
        line.push('\t');
        line.push_str(field);
    }
    line
}

// ═══════════════════════════════════════════════════════════════
// Bulk registration input
// ═══════════════════════════════════════════════════════════════

/// Id + ordered fields for one entry of a bulk registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    pub id: EventId,
    pub fields: Vec<String>,
}

impl EventSpec {
    pub fn new<S: Into<String>>(
        id: impl Into<EventId>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            id: id.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
struct RawSpec {
    id: serde_yaml::Value,
    #[serde(default)]
    fields: Vec<String>,
}

/// Event schemas declared in YAML, in file order:
///
/// ```yaml
/// TEST_PASSED:
///   id: 0x303d
///   fields: [userName, amount]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFile {
    pub events: Vec<(String, EventSpec)>,
}

impl SchemaFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml)?;
        let mut events = Vec::with_capacity(mapping.len());

        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(EventlogError::InvalidEventName {
                        name: format!("{other:?}"),
                    })
                }
            };
            let raw: RawSpec = serde_yaml::from_value(value)?;
            let id = parse_yaml_id(&raw.id)?;
            events.push((name, EventSpec { id, fields: raw.fields }));
        }

        Ok(Self { events })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}

fn parse_yaml_id(value: &serde_yaml::Value) -> Result<EventId> {
    match value {
        serde_yaml::Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(id), _) => Ok(EventId(id)),
            (None, Some(id)) => EventId::try_from(id),
            _ => Err(EventlogError::InvalidEventId { id: n.to_string() }),
        },
        serde_yaml::Value::String(s) => s.parse(),
        other => Err(EventlogError::InvalidEventId {
            id: format!("{other:?}"),
        }),
    }
}

// ═══════════════════════════════════════════════════════════════
// EventRegistry
// ═══════════════════════════════════════════════════════════════

/// Insert-only registry of event types (one per process)
pub struct EventRegistry {
    types: RwLock<HashMap<EventId, Arc<EventType>>>,
    layout: Arc<dyn LineSink>,
}

impl EventRegistry {
    /// Create an empty registry that declares layouts to `layout`
    pub fn new(layout: Arc<dyn LineSink>) -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
            layout,
        }
    }

    /// Register a new event type.
    ///
    /// Field order matters: events are later logged in exactly this order.
    /// Checks run name, duplicate id, then fields; the first failure wins and
    /// nothing is stored or written.
    pub fn register<S: AsRef<str>>(
        &self,
        id: impl Into<EventId>,
        name: &str,
        fields: &[S],
    ) -> Result<Arc<EventType>> {
        let id = id.into();

        if !is_valid_event_name(name) {
            return Err(EventlogError::InvalidEventName {
                name: name.to_string(),
            });
        }

        // Held across the layout write so each id is declared exactly once
        let mut types = self.types.write();

        if types.contains_key(&id) {
            return Err(EventlogError::DuplicateEventId { id: id.get() });
        }

        for field in fields {
            let field = field.as_ref();
            if !is_valid_field_name(field) {
                return Err(EventlogError::InvalidFieldName {
                    field: field.to_string(),
                });
            }
        }

        let event_type = Arc::new(EventType {
            id,
            name: name.to_string(),
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
        });

        self.layout.write_line(&render_layout(&event_type))?;
        types.insert(id, Arc::clone(&event_type));

        tracing::debug!(
            event_id = %id,
            name = %event_type.name,
            fields = event_type.fields.len(),
            "registered event type"
        );

        Ok(event_type)
    }

    /// Register every entry in iteration order, stopping at the first error.
    ///
    /// Order only affects the layout stream; logging is keyed by id.
    pub fn register_all<N, I>(&self, entries: I) -> Result<()>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, EventSpec)>,
    {
        for (name, spec) in entries {
            self.register(spec.id, name.as_ref(), &spec.fields)?;
        }
        Ok(())
    }

    pub fn get(&self, id: impl Into<EventId>) -> Option<Arc<EventType>> {
        self.types.read().get(&id.into()).cloned()
    }

    pub fn contains(&self, id: impl Into<EventId>) -> bool {
        self.types.read().contains_key(&id.into())
    }

    /// All registered types, sorted by id
    pub fn event_types(&self) -> Vec<Arc<EventType>> {
        let mut all: Vec<_> = self.types.read().values().cloned().collect();
        all.sort_by_key(|t| t.id);
        all
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("len", &self.len())
            .finish()
    }
}
