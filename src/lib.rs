//! # databind
//!
//! A reactive data-binding engine for component trees.
//!
//! Component properties, attributes, styles and trait values can hold
//! *resolver definitions* instead of literal values. The editor keeps every
//! bound field in sync with the data it depends on, repeats templates over
//! collections, and keeps linked component copies (symbols) consistent.
//!
//! ## Core Systems
//!
//! - **[`data`]** — Named data sources of records, addressed by dotted paths
//! - **[`condition`]** — Operator families and nested condition evaluation
//! - **[`resolver`]** — Data variables, conditions and collection variables, plus their listeners
//! - **[`collection`]** — Collection configuration, item planning and live expansion
//! - **[`dom`]** — Slotmap-backed component arena and symbol links
//! - **[`binding`]** — Side-tables tying component fields to resolver listeners
//! - **[`event`]** — Observable topics and the synchronous event bus
//! - **[`editor`]** — The owning context every mutation goes through
//! - **[`project`]** — Saving and loading project data
//!
//! ## Example
//!
//! ```
//! use databind::{ComponentDef, DataRecord, DataSourceDef, Editor};
//! use serde_json::json;
//!
//! let mut editor = Editor::new();
//! editor.add_data_source(DataSourceDef::new("site").with_record(DataRecord::new("meta").with_field("title", "Hello")));
//!
//! let def = ComponentDef::new("heading").with_prop("title", json!({ "type": "data-variable", "path": "site.meta.title" }));
//! let heading = editor.add_component(def).unwrap();
//! assert_eq!(editor.component(heading).unwrap().prop("title"), Some(&json!("Hello")));
//!
//! editor.set_value("site.meta.title", "World").unwrap();
//! assert_eq!(editor.component(heading).unwrap().prop("title"), Some(&json!("World")));
//! ```

// Foundation
pub mod error;
pub mod logging;

// Data and evaluation
pub mod condition;
pub mod data;
pub mod resolver;

// Components
pub mod binding;
pub mod collection;
pub mod dom;

// Events and the owning context
pub mod editor;
pub mod event;
pub mod project;

pub use binding::Field;
pub use collection::{
    CollectionDataSource, CollectionState, CollectionStateMap, CollectionStateVariableType, DataCollectionConfig,
    DataCollectionDef,
};
pub use condition::{ConditionProps, GenericOperator, LogicalOperator, NumberOperator, StringOperator};
pub use data::{DataRecord, DataSource, DataSourceDef, DataSources, Transformers};
pub use dom::{Component, ComponentDef, ComponentId, SymbolOverride, TraitDef, TraitProps};
pub use editor::{Editor, EditorConfig, RecordMut, SetOptions};
pub use error::{ConditionError, DataError, EditorError, ResolverError, Result};
pub use event::{EventKind, Observable, ResolverField, SubscriptionId, Topic};
pub use logging::{Channel, ErrorLog, LogEntry};
pub use project::ProjectData;
pub use resolver::{
    DataCollectionVariableProps, DataConditionProps, DataVariableProps, ListenerId, ListenerState, Resolver,
    ResolverId, ResolverProps,
};
