//! What can be observed, and which events it fires.

use crate::dom::ComponentId;
use crate::resolver::ResolverId;

/// Something that fires events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Observable {
    /// The data source registry.
    Registry,
    /// The record list of one data source.
    Records(String),
    /// One record.
    Record { source: String, record: String },
    /// A normalized data path (`ds.record.field.0`).
    Path(String),
    /// A resolver's own configuration.
    Resolver(ResolverId),
    /// A component: field writes fire `Change`, child list edits fire
    /// `Add`/`Remove`/`Reset`.
    Component(ComponentId),
}

/// Resolver configuration fields that fire `PropChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverField {
    Path,
    DefaultValue,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Remove,
    Reset,
    Change,
    PropChange(ResolverField),
}

/// An (observable, event) pair: the unit of subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub observable: Observable,
    pub event: EventKind,
}

impl Topic {
    pub fn new(observable: Observable, event: EventKind) -> Self {
        Self { observable, event }
    }

    pub fn registry(event: EventKind) -> Self {
        Self::new(Observable::Registry, event)
    }

    pub fn records(source: impl Into<String>, event: EventKind) -> Self {
        Self::new(Observable::Records(source.into()), event)
    }

    pub fn record(source: impl Into<String>, record: impl Into<String>) -> Self {
        Self::new(
            Observable::Record {
                source: source.into(),
                record: record.into(),
            },
            EventKind::Change,
        )
    }

    /// Path change topic. The path is normalized.
    pub fn path(path: &str) -> Self {
        Self::new(
            Observable::Path(crate::data::normalize_path(path)),
            EventKind::Change,
        )
    }

    pub fn resolver(id: ResolverId, field: ResolverField) -> Self {
        Self::new(Observable::Resolver(id), EventKind::PropChange(field))
    }

    pub fn component(id: ComponentId, event: EventKind) -> Self {
        Self::new(Observable::Component(id), event)
    }

    /// Whether this topic belongs to data source `source` (its records,
    /// one of its records, or a path inside it).
    pub fn is_within_source(&self, source: &str) -> bool {
        match &self.observable {
            Observable::Records(s) | Observable::Record { source: s, .. } => s == source,
            Observable::Path(p) => p == source || p.strip_prefix(source).is_some_and(|rest| rest.starts_with('.')),
            _ => false,
        }
    }
}
