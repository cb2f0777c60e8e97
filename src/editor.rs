//! Editor: the owning context for data sources, components, resolvers and
//! the event bus.
//!
//! Every mutation goes through [`Editor`]. It applies the change, then
//! emits the matching [`Topic`] synchronously; resolver listeners react by
//! writing resolved values back into components, which may emit further
//! events. Dispatch is depth-first and bounded by
//! [`EditorConfig::max_emit_depth`].

use serde_json::{Map, Value};
use slotmap::SlotMap;

use crate::binding::{is_resolver_component, Bindings, ComponentWatchers, Field};
use crate::binding::watcher::resolver_component_keys;
use crate::collection::CollectionStateMap;
use crate::data::path::string_to_path;
use crate::data::{DataRecord, DataSource, DataSources};
use crate::dom::symbol::SymbolChange;
use crate::dom::{Component, ComponentDef, ComponentId, ComponentTree, DATA_COLLECTION_TYPE, DEFAULT_TYPE};
use crate::error::{DataError, EditorError, Result};
use crate::event::{EventBus, EventKind, SubscriptionId, Topic};
use crate::logging::{targets, Channel, ErrorLog};
use crate::resolver::{ListenerId, Resolver, ResolverId, ResolverListener};

// ---------------------------------------------------------------------------
// EditorConfig
// ---------------------------------------------------------------------------

/// Configuration for the editor.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Nesting limit for synchronous event dispatch. Deeper emissions are
    /// dropped and logged.
    pub max_emit_depth: usize,
    /// Whether project data includes data sources.
    pub store_data_sources: bool,
    /// Component type of the root wrapper.
    pub wrapper_type: String,
    /// Entries kept by the host error log. Older ones are dropped first.
    pub max_logged_errors: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_emit_depth: 64,
            store_data_sources: true,
            wrapper_type: crate::dom::WRAPPER_TYPE.to_owned(),
            max_logged_errors: ErrorLog::DEFAULT_CAPACITY,
        }
    }
}

impl EditorConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the emit depth limit (builder).
    pub fn with_max_emit_depth(mut self, depth: usize) -> Self {
        self.max_emit_depth = depth;
        self
    }

    /// Set whether data sources are stored with the project (builder).
    pub fn with_store_data_sources(mut self, store: bool) -> Self {
        self.store_data_sources = store;
        self
    }

    /// Set the wrapper component type (builder).
    pub fn with_wrapper_type(mut self, wrapper_type: impl Into<String>) -> Self {
        self.wrapper_type = wrapper_type.into();
        self
    }

    /// Set how many errors the host error log keeps (builder).
    pub fn with_max_logged_errors(mut self, max: usize) -> Self {
        self.max_logged_errors = max;
        self
    }
}

// ---------------------------------------------------------------------------
// SetOptions
// ---------------------------------------------------------------------------

/// Options for component mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// The value was produced by a data source write-back: it is stored as
    /// is, never rebound, and never propagated to symbol instances.
    pub from_data_source: bool,
    /// The change is being propagated from this symbol member; do not
    /// propagate it again.
    pub from_instance: Option<ComponentId>,
    /// Skip symbol propagation entirely.
    pub no_propagate: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data_source() -> Self {
        Self {
            from_data_source: true,
            ..Self::default()
        }
    }

    pub fn from_instance(id: ComponentId) -> Self {
        Self {
            from_instance: Some(id),
            ..Self::default()
        }
    }

    /// No symbol propagation.
    pub fn silent() -> Self {
        Self {
            no_propagate: true,
            ..Self::default()
        }
    }

    /// Whether symbol propagation may happen under these options.
    pub fn propagates(&self) -> bool {
        !self.from_data_source && self.from_instance.is_none() && !self.no_propagate
    }
}

/// Saved symbol references of a component, resolved once the whole tree
/// they point into exists.
#[derive(Debug)]
pub(crate) struct PendingSymbolRefs {
    pub id: ComponentId,
    pub symbol: Option<String>,
    pub symbols: Vec<String>,
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// The editor context.
///
/// Owns the data sources, the component tree (rooted at a wrapper
/// component), the resolver and listener arenas, the binding side-tables and
/// the event bus.
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    pub(crate) data: DataSources,
    pub(crate) tree: ComponentTree,
    pub(crate) wrapper: ComponentId,
    pub(crate) bus: EventBus<Editor>,
    pub(crate) resolvers: SlotMap<ResolverId, Resolver>,
    pub(crate) listeners: SlotMap<ListenerId, ResolverListener>,
    pub(crate) bindings: Bindings,
    pub(crate) log: ErrorLog,
    pub(crate) pending_symbol_refs: Vec<PendingSymbolRefs>,
    emit_depth: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Create an editor with the default config.
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        let mut tree = ComponentTree::new();
        let wrapper = tree.insert(Component::new(config.wrapper_type.clone()), None);
        let mut bindings = Bindings::default();
        bindings.watchers.insert(wrapper, ComponentWatchers::default());
        let log = ErrorLog::with_capacity(config.max_logged_errors);
        Self {
            config,
            data: DataSources::new(),
            tree,
            wrapper,
            bus: EventBus::new(),
            resolvers: SlotMap::with_key(),
            listeners: SlotMap::with_key(),
            bindings,
            log,
            pending_symbol_refs: Vec::new(),
            emit_depth: 0,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Errors logged on the host error channel, oldest first.
    pub fn logged_errors(&self) -> Vec<String> {
        self.log.messages()
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.log
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Subscribe to a topic.
    pub fn on(&mut self, topic: Topic, handler: impl Fn(&mut Editor) + 'static) -> SubscriptionId {
        self.bus.subscribe(topic, std::rc::Rc::new(handler))
    }

    /// Unsubscribe. Returns `false` if already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Run every handler of `topic`, in registration order.
    pub fn emit(&mut self, topic: Topic) {
        let handlers = self.bus.handlers(&topic);
        if handlers.is_empty() {
            return;
        }
        if self.emit_depth >= self.config.max_emit_depth {
            self.log.error(
                Channel::Event,
                format!(
                    "event depth limit of {} reached; dropped {topic:?}",
                    self.config.max_emit_depth
                ),
            );
            return;
        }
        tracing::trace!(target: targets::EVENT, ?topic, handlers = handlers.len(), "emit");
        self.emit_depth += 1;
        for (subscription, handler) in handlers {
            if self.bus.is_subscribed(subscription) {
                handler(self);
            }
        }
        self.emit_depth -= 1;
    }

    // ── Data sources ─────────────────────────────────────────────────

    pub fn data_sources(&self) -> &DataSources {
        &self.data
    }

    /// Register a data source. An existing source with the same id has its
    /// content replaced and fires a records reset.
    pub fn add_data_source(&mut self, source: impl Into<DataSource>) {
        let source = source.into();
        let id = source.id().to_owned();
        if self.data.add(source) {
            tracing::debug!(target: targets::DATA, source = %id, "data source added");
            self.emit(Topic::registry(EventKind::Add));
        } else {
            tracing::debug!(target: targets::DATA, source = %id, "data source replaced");
            self.emit(Topic::records(id, EventKind::Reset));
        }
    }

    /// Remove a data source. Subscriptions on its records and paths are
    /// dropped.
    pub fn remove_data_source(&mut self, id: &str) -> Option<DataSource> {
        let removed = self.data.remove(id)?;
        let purged = self.bus.purge(|topic| topic.is_within_source(id));
        tracing::debug!(target: targets::DATA, source = %id, purged, "data source removed");
        self.emit(Topic::registry(EventKind::Remove));
        Some(removed)
    }

    fn source_mut(&mut self, id: &str) -> Result<&mut DataSource, DataError> {
        self.data
            .get_mut(id)
            .ok_or_else(|| DataError::SourceNotFound(id.to_owned()))
    }

    pub fn add_record(&mut self, source: &str, record: DataRecord) -> Result<()> {
        self.source_mut(source)?.add_record(record)?;
        self.emit(Topic::records(source, EventKind::Add));
        Ok(())
    }

    /// Remove a mutable record.
    pub fn remove_record(&mut self, source: &str, record: &str) -> Result<DataRecord> {
        self.remove_record_with(source, record, false)
    }

    /// Remove a record even if it is immutable.
    pub fn remove_record_dangerously(&mut self, source: &str, record: &str) -> Result<DataRecord> {
        self.remove_record_with(source, record, true)
    }

    fn remove_record_with(&mut self, source: &str, record: &str, dangerously: bool) -> Result<DataRecord> {
        let removed = self.source_mut(source)?.remove_record(record, dangerously)?;
        self.emit(Topic::records(source, EventKind::Remove));
        Ok(removed)
    }

    /// Replace all records of a source.
    pub fn set_records(&mut self, source: &str, records: Vec<DataRecord>) -> Result<()> {
        self.source_mut(source)?.set_records(records);
        self.emit(Topic::records(source, EventKind::Reset));
        Ok(())
    }

    /// Handle for writing the fields of one record.
    pub fn record_mut(&mut self, source: &str, record: &str) -> Option<RecordMut<'_>> {
        self.data.get(source)?.get_record(record)?;
        Some(RecordMut {
            editor: self,
            source: source.to_owned(),
            record: record.to_owned(),
        })
    }

    /// Write `key` (a field or a path below the record) of a record.
    pub fn set_record_value(&mut self, source: &str, record: &str, key: &str, value: Value) -> Result<()> {
        self.source_mut(source)?.set_record_value(record, key, value)?;
        tracing::trace!(target: targets::DATA, source, record, key, "record value set");
        self.emit(Topic::record(source, record));
        self.notify_path(&format!("{source}.{record}.{key}"));
        Ok(())
    }

    /// Path-addressed write: `source.record.field...`.
    pub fn set_value(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = string_to_path(path);
        match segments.as_slice() {
            [source, record, rest @ ..] if !rest.is_empty() => {
                self.set_record_value(source, record, &rest.join("."), value.into())
            }
            _ => Err(DataError::InvalidPath(path.to_owned()).into()),
        }
    }

    /// Fire the path notification for `path` and each ancestor path down to
    /// the record.
    pub fn notify_path(&mut self, path: &str) {
        let segments = string_to_path(path);
        let floor = segments.len().min(2);
        for len in (floor.max(1)..=segments.len()).rev() {
            self.emit(Topic::path(&segments[..len].join(".")));
        }
    }

    /// Resolve a data path, falling back to `default`.
    pub fn get_value(&self, path: &str, default: &Value) -> Value {
        self.data.get_value(path, default)
    }

    // ── Component tree ───────────────────────────────────────────────

    /// The root wrapper component.
    pub fn wrapper(&self) -> ComponentId {
        self.wrapper
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.tree.get(id)
    }

    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.tree.children(id)
    }

    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.tree.parent(id)
    }

    /// Collection state seen by `id`, if it sits inside a collection item.
    pub fn collection_state_map(&self, id: ComponentId) -> Option<&CollectionStateMap> {
        self.bindings.state_maps.get(id)
    }

    fn ensure(&self, id: ComponentId) -> Result<()> {
        if self.tree.contains(id) {
            Ok(())
        } else {
            Err(EditorError::ComponentNotFound(id))
        }
    }

    /// Append a component to the wrapper.
    pub fn add_component(&mut self, def: ComponentDef) -> Result<ComponentId> {
        self.append(self.wrapper, def)
    }

    pub fn append(&mut self, parent: ComponentId, def: ComponentDef) -> Result<ComponentId> {
        self.insert_with(parent, None, def, SetOptions::default())
    }

    /// Append a component given as JSON.
    pub fn append_json(&mut self, parent: ComponentId, value: Value) -> Result<ComponentId> {
        let def = ComponentDef::from_value(value)?;
        self.append(parent, def)
    }

    pub fn insert(&mut self, parent: ComponentId, index: usize, def: ComponentDef) -> Result<ComponentId> {
        self.insert_with(parent, Some(index), def, SetOptions::default())
    }

    pub fn insert_with(
        &mut self,
        parent: ComponentId,
        index: Option<usize>,
        def: ComponentDef,
        opts: SetOptions,
    ) -> Result<ComponentId> {
        self.ensure(parent)?;
        let scope = self.bindings.inherited_scope(parent);
        let id = self.build(def, parent, index, scope)?;
        self.resolve_symbol_refs();
        for node in self.tree.descendants(id) {
            self.update_symbol_override(node);
        }
        self.emit(Topic::component(parent, EventKind::Add));
        if opts.propagates() {
            self.propagate_add(parent, id)?;
        }
        Ok(id)
    }

    /// Remove a component and its subtree.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        self.remove_with(id, SetOptions::default())
    }

    pub fn remove_with(&mut self, id: ComponentId, opts: SetOptions) -> bool {
        if id == self.wrapper || !self.tree.contains(id) {
            return false;
        }
        let parent = self.tree.parent(id);
        if let Some(parent) = parent.filter(|_| opts.propagates()) {
            self.propagate_remove(parent, id);
        }
        self.teardown(id);
        self.tree.remove(id);
        if let Some(parent) = parent {
            self.emit(Topic::component(parent, EventKind::Remove));
        }
        true
    }

    /// Replace the children of `parent`.
    pub fn reset_children(&mut self, parent: ComponentId, defs: Vec<ComponentDef>) -> Result<Vec<ComponentId>> {
        self.reset_children_with(parent, defs, SetOptions::default())
    }

    pub fn reset_children_with(
        &mut self,
        parent: ComponentId,
        defs: Vec<ComponentDef>,
        opts: SetOptions,
    ) -> Result<Vec<ComponentId>> {
        self.ensure(parent)?;
        for child in self.tree.children(parent).to_vec() {
            self.teardown(child);
            self.tree.remove(child);
        }
        let scope = self.bindings.inherited_scope(parent);
        let mut ids = Vec::with_capacity(defs.len());
        for def in defs {
            ids.push(self.build(def, parent, None, scope.clone())?);
        }
        self.resolve_symbol_refs();
        for &id in &ids {
            for node in self.tree.descendants(id) {
                self.update_symbol_override(node);
            }
        }
        self.emit(Topic::component(parent, EventKind::Reset));
        if opts.propagates() {
            self.propagate_reset(parent)?;
        }
        Ok(ids)
    }

    /// Destroy every binding in the subtree of `id` and unlink its symbols.
    pub(crate) fn teardown(&mut self, id: ComponentId) {
        let nodes = self.tree.descendants(id);
        for &node in &nodes {
            let listeners = self
                .bindings
                .watchers
                .remove(node)
                .map(|mut watchers| watchers.take_all())
                .unwrap_or_default();
            for listener in listeners {
                self.destroy_listener(listener);
            }
            if let Some(Some(listener)) = self.bindings.collections.remove(node) {
                self.destroy_listener(listener);
            }
            self.bindings.state_maps.remove(node);
            self.bindings.scopes.remove(node);
        }
        for &node in &nodes {
            self.unlink_symbol(node);
        }
    }

    /// Create a component (and its subtree) from a definition.
    pub(crate) fn build(
        &mut self,
        def: ComponentDef,
        parent: ComponentId,
        index: Option<usize>,
        scope: Option<CollectionStateMap>,
    ) -> Result<ComponentId> {
        let ComponentDef {
            component_type,
            tag_name,
            attributes,
            style,
            classes,
            traits,
            draggable,
            droppable,
            collection_def,
            components,
            uid,
            symbol,
            symbols,
            symbol_override,
            props,
        } = def;

        let mut component = Component::new(component_type.unwrap_or_else(|| DEFAULT_TYPE.to_owned()));
        component.tag_name = tag_name;
        component.classes = classes;
        component.traits = traits;
        component.draggable = draggable;
        component.droppable = droppable;
        component.collection_def = collection_def;
        component.symbol_override = symbol_override;
        if component.component_type == DATA_COLLECTION_TYPE {
            component.droppable = Some(false);
        }

        let id = self
            .tree
            .insert_child(parent, index, component, uid)
            .ok_or(EditorError::ComponentNotFound(parent))?;
        self.bindings.watchers.insert(id, ComponentWatchers::default());
        if let Some(scope) = scope.clone() {
            self.bindings.attach_scope(id, scope);
        }
        if symbol.is_some() || !symbols.is_empty() {
            self.pending_symbol_refs.push(PendingSymbolRefs { id, symbol, symbols });
        }

        if let Err(err) = self.populate(id, props, attributes, style, components, scope) {
            self.teardown(id);
            self.tree.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    fn populate(
        &mut self,
        id: ComponentId,
        props: Map<String, Value>,
        attributes: Map<String, Value>,
        style: Map<String, Value>,
        components: Vec<ComponentDef>,
        scope: Option<CollectionStateMap>,
    ) -> Result<()> {
        let kind = self
            .tree
            .get(id)
            .map(|c| c.component_type.clone())
            .unwrap_or_default();
        let reserved = resolver_component_keys(&kind);

        for (key, value) in props {
            let value = if reserved.contains(&key.as_str()) {
                value
            } else {
                self.bind_value(id, Field::Prop, &key, value)?
            };
            self.store_field(id, Field::Prop, &key, value);
        }
        for (key, value) in attributes {
            let value = self.bind_value(id, Field::Attribute, &key, value)?;
            self.store_field(id, Field::Attribute, &key, value);
        }
        for (key, value) in style {
            let value = self.bind_value(id, Field::Style, &key, value)?;
            self.store_field(id, Field::Style, &key, value);
        }
        self.bind_traits(id)?;

        if kind == DATA_COLLECTION_TYPE {
            self.init_collection(id)?;
        } else if is_resolver_component(&kind) {
            self.bind_content(id)?;
        } else {
            for child in components {
                self.build(child, id, None, scope.clone())?;
            }
        }
        Ok(())
    }

    // ── Component fields ─────────────────────────────────────────────

    /// Set one prop.
    pub fn set_prop(&mut self, id: ComponentId, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let mut props = Map::new();
        props.insert(key.into(), value.into());
        self.set_props(id, props, SetOptions::default())
    }

    /// Set several props. Resolver definitions are bound; static values
    /// replace any binding. The change propagates to symbol members unless
    /// `opts` says otherwise.
    pub fn set_props(&mut self, id: ComponentId, props: Map<String, Value>, opts: SetOptions) -> Result<()> {
        self.ensure(id)?;
        let kind = self
            .tree
            .get(id)
            .map(|c| c.component_type.clone())
            .unwrap_or_default();
        let reserved = resolver_component_keys(&kind);
        let mut content_changed = false;
        for (key, value) in &props {
            let is_reserved = reserved.contains(&key.as_str());
            content_changed |= is_reserved;
            let resolved = if opts.from_data_source || is_reserved {
                value.clone()
            } else {
                self.bind_value(id, Field::Prop, key, value.clone())?
            };
            self.store_field(id, Field::Prop, key, resolved);
        }
        if content_changed {
            self.bind_content(id)?;
        }
        self.emit(Topic::component(id, EventKind::Change));
        if !opts.from_data_source {
            self.update_symbol_override(id);
            self.propagate(id, SymbolChange::Props(props), opts)?;
        }
        Ok(())
    }

    pub fn unset_prop(&mut self, id: ComponentId, key: &str) -> Result<()> {
        self.unset_prop_with(id, key, SetOptions::default())
    }

    pub fn unset_prop_with(&mut self, id: ComponentId, key: &str, opts: SetOptions) -> Result<()> {
        self.ensure(id)?;
        self.unbind_value(id, Field::Prop, key);
        if let Some(component) = self.tree.get_mut(id) {
            component.props.remove(key);
        }
        self.emit(Topic::component(id, EventKind::Change));
        self.update_symbol_override(id);
        self.propagate(id, SymbolChange::Unset(key.to_owned()), opts)
    }

    /// Replace all attributes.
    pub fn set_attributes(&mut self, id: ComponentId, attributes: Map<String, Value>) -> Result<()> {
        self.set_attributes_with(id, attributes, SetOptions::default())
    }

    pub fn set_attributes_with(
        &mut self,
        id: ComponentId,
        attributes: Map<String, Value>,
        opts: SetOptions,
    ) -> Result<()> {
        self.ensure(id)?;
        let mut resolved = self.bind_map(id, Field::Attribute, &attributes, opts)?;
        // Attributes written by a bound trait stay until the trait changes.
        if let Some(component) = self.tree.get(id) {
            for (key, value) in &component.attributes {
                if !resolved.contains_key(key) && self.bound_resolver(id, Field::Trait, key).is_some() {
                    resolved.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(component) = self.tree.get_mut(id) {
            component.attributes = resolved;
        }
        self.emit(Topic::component(id, EventKind::Change));
        if !opts.from_data_source {
            self.update_symbol_override(id);
            self.propagate(id, SymbolChange::Attributes(attributes), opts)?;
        }
        Ok(())
    }

    /// Merge attributes into the current ones.
    pub fn add_attributes(&mut self, id: ComponentId, attributes: Map<String, Value>) -> Result<()> {
        let mut merged = self.field_defs(id, Field::Attribute);
        merged.extend(attributes);
        self.set_attributes(id, merged)
    }

    pub fn remove_attribute(&mut self, id: ComponentId, key: &str) -> Result<()> {
        let mut remaining = self.field_defs(id, Field::Attribute);
        remaining.remove(key);
        self.set_attributes(id, remaining)
    }

    /// Replace the inline style.
    pub fn set_style(&mut self, id: ComponentId, style: Map<String, Value>) -> Result<()> {
        self.set_style_with(id, style, SetOptions::default())
    }

    pub fn set_style_with(&mut self, id: ComponentId, style: Map<String, Value>, opts: SetOptions) -> Result<()> {
        self.ensure(id)?;
        let resolved = self.bind_map(id, Field::Style, &style, opts)?;
        if let Some(component) = self.tree.get_mut(id) {
            component.style = resolved;
        }
        self.emit(Topic::component(id, EventKind::Change));
        if !opts.from_data_source {
            self.update_symbol_override(id);
            self.propagate(id, SymbolChange::Style(style), opts)?;
        }
        Ok(())
    }

    /// Merge style properties into the current style.
    pub fn add_style(&mut self, id: ComponentId, style: Map<String, Value>) -> Result<()> {
        let mut merged = self.field_defs(id, Field::Style);
        merged.extend(style);
        self.set_style(id, merged)
    }

    pub fn remove_style(&mut self, id: ComponentId, property: &str) -> Result<()> {
        let mut remaining = self.field_defs(id, Field::Style);
        remaining.remove(property);
        self.set_style(id, remaining)
    }

    pub fn set_classes(&mut self, id: ComponentId, classes: Vec<String>) -> Result<()> {
        self.set_classes_with(id, classes, SetOptions::default())
    }

    pub fn set_classes_with(&mut self, id: ComponentId, classes: Vec<String>, opts: SetOptions) -> Result<()> {
        self.ensure(id)?;
        if let Some(component) = self.tree.get_mut(id) {
            component.classes = classes.clone();
        }
        self.emit(Topic::component(id, EventKind::Change));
        self.propagate(id, SymbolChange::Classes(classes), opts)
    }

    /// Set a trait's value. A resolver definition is bound and its value
    /// written to the trait's target.
    pub fn set_trait_value(&mut self, id: ComponentId, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure(id)?;
        let value = value.into();
        if let Some(component) = self.tree.get_mut(id) {
            match component.traits.iter_mut().find(|t| t.name() == name) {
                Some(def) => def.set_value(value.clone()),
                None => {
                    let mut def = crate::dom::TraitDef::Name(name.to_owned());
                    def.set_value(value.clone());
                    component.traits.push(def);
                }
            }
        }
        let resolved = self.bind_value(id, Field::Trait, name, value)?;
        self.store_field(id, Field::Trait, name, resolved);
        self.emit(Topic::component(id, EventKind::Change));
        Ok(())
    }

    /// Bind every entry of a field map, dropping bindings of keys no longer
    /// present. Data source write-backs are stored unbound.
    fn bind_map(
        &mut self,
        id: ComponentId,
        field: Field,
        values: &Map<String, Value>,
        opts: SetOptions,
    ) -> Result<Map<String, Value>> {
        if opts.from_data_source {
            return Ok(values.clone());
        }
        self.unbind_field(id, field);
        let mut resolved = Map::new();
        for (key, value) in values {
            resolved.insert(key.clone(), self.bind_value(id, field, key, value.clone())?);
        }
        Ok(resolved)
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Definition of `id` and its subtree, resolver definitions included.
    pub fn to_def(&self, id: ComponentId) -> Option<ComponentDef> {
        self.serialize(id, true)
    }

    pub fn to_json(&self, id: ComponentId) -> Value {
        self.to_def(id).map(|def| def.to_value()).unwrap_or(Value::Null)
    }

    /// Serialize a subtree. `with_symbols` adds symbol references for
    /// components linked to a symbol group.
    pub(crate) fn serialize(&self, id: ComponentId, with_symbols: bool) -> Option<ComponentDef> {
        let component = self.tree.get(id)?;
        let mut def = ComponentDef {
            component_type: (component.component_type != DEFAULT_TYPE).then(|| component.component_type.clone()),
            tag_name: component.tag_name.clone(),
            attributes: self.field_defs(id, Field::Attribute),
            style: self.field_defs(id, Field::Style),
            classes: component.classes.clone(),
            traits: component.traits.clone(),
            draggable: component.draggable,
            props: self.field_defs(id, Field::Prop),
            ..ComponentDef::default()
        };

        if component.is_collection() {
            def.collection_def = component.collection_def.clone().map(|mut collection| {
                if let Some(template) = self.collection_template(id) {
                    collection.component_def = Some(Box::new(template));
                }
                collection
            });
        } else {
            def.droppable = component.droppable;
            def.collection_def = component.collection_def.clone();
            if !is_resolver_component(&component.component_type) {
                def.components = self
                    .tree
                    .children(id)
                    .iter()
                    .filter_map(|&child| self.serialize(child, with_symbols))
                    .collect();
            }
        }

        if with_symbols {
            let main = component.symbol.filter(|&main| self.tree.contains(main));
            let instances: Vec<String> = component
                .symbols
                .iter()
                .filter_map(|&instance| self.tree.get(instance))
                .filter(|instance| instance.symbol == Some(id))
                .map(|instance| instance.uid.clone())
                .collect();
            if main.is_some() || !instances.is_empty() {
                def.uid = Some(component.uid.clone());
                def.symbol = main.and_then(|main| self.tree.get(main)).map(|m| m.uid.clone());
                def.symbols = instances;
            }
            def.symbol_override = component.symbol_override.clone().filter(|o| !o.is_empty());
        }
        Some(def)
    }
}

// ---------------------------------------------------------------------------
// RecordMut
// ---------------------------------------------------------------------------

/// Write handle for one record, from [`Editor::record_mut`].
pub struct RecordMut<'a> {
    editor: &'a mut Editor,
    source: String,
    record: String,
}

impl RecordMut<'_> {
    pub fn id(&self) -> &str {
        &self.record
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.editor
            .data
            .get(&self.source)?
            .get_record(&self.record)?
            .get(key)
            .cloned()
    }

    /// Write a field (or a path below the record) and notify listeners.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.editor
            .set_record_value(&self.source, &self.record, key, value.into())
    }
}
