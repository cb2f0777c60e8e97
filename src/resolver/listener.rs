//! ResolverListener: subscribes one update callback to every event that can
//! change a resolver's value.
//!
//! A listener moves `Unbound -> Bound -> Destroyed`. While bound it holds
//! one bus subscription per dependency topic. Each notification re-derives
//! the dependency set, so a record or source that appears after binding is
//! picked up, and the old subscriptions are dropped before new ones are
//! made.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use slotmap::new_key_type;

use super::props::{DataVariableProps, ResolverProps};
use super::variable::DataVariable;
use super::{Resolver, ResolverId};
use crate::collection::CollectionStateMap;
use crate::data::DataSources;
use crate::editor::Editor;
use crate::error::{ConditionError, ResolverError};
use crate::event::{EventKind, ResolverField, SubscriptionId, Topic};
use crate::logging::{targets, Channel};

new_key_type! {
    /// Identifies a resolver listener.
    pub struct ListenerId;
}

/// Callback receiving the resolver's new value.
pub type UpdateFn = Rc<dyn Fn(&mut Editor, Value)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Unbound,
    Bound,
    Destroyed,
}

pub struct ResolverListener {
    resolver: ResolverId,
    owns_resolver: bool,
    topics: Vec<Topic>,
    subscriptions: Vec<SubscriptionId>,
    on_update: UpdateFn,
    state: ListenerState,
}

impl ResolverListener {
    pub fn resolver(&self) -> ResolverId {
        self.resolver
    }

    /// Whether destroying the listener also destroys its resolver.
    pub fn owns_resolver(&self) -> bool {
        self.owns_resolver
    }

    /// Topics currently subscribed.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }
}

impl fmt::Debug for ResolverListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverListener")
            .field("resolver", &self.resolver)
            .field("owns_resolver", &self.owns_resolver)
            .field("topics", &self.topics)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

const COLLECTION_EVENTS: [EventKind; 3] = [EventKind::Add, EventKind::Remove, EventKind::Reset];

fn variable_topics(props: &DataVariableProps, store: &DataSources, topics: &mut Vec<Topic>) {
    let (source, record) = store.from_path(&props.path);
    if let Some(source) = source {
        topics.extend(COLLECTION_EVENTS.map(|event| Topic::records(source.id(), event)));
        if let Some(record) = record {
            topics.push(Topic::record(source.id(), record.id.as_str()));
        }
    }
    topics.extend(COLLECTION_EVENTS.map(Topic::registry));
    topics.push(Topic::path(&props.path));
}

/// Topics whose events can change the value of resolver `id`.
pub fn dependencies(id: ResolverId, resolver: &Resolver, store: &DataSources) -> Vec<Topic> {
    let mut topics = Vec::new();
    match resolver {
        Resolver::Variable(variable) => {
            variable_topics(variable.props(), store, &mut topics);
            topics.push(Topic::resolver(id, ResolverField::Path));
            topics.push(Topic::resolver(id, ResolverField::DefaultValue));
        }
        Resolver::Condition(condition) => {
            for variable in condition.dependent_data_variables() {
                variable_topics(&variable, store, &mut topics);
            }
        }
        Resolver::CollectionVariable(_) => topics.push(Topic::resolver(id, ResolverField::Value)),
    }
    let mut seen = std::collections::HashSet::new();
    topics.retain(|topic| seen.insert(topic.clone()));
    topics
}

impl Editor {
    // ── Resolvers ────────────────────────────────────────────────────

    /// Create a live resolver from its definition.
    ///
    /// `scope` is the collection state visible to the resolver. A collection
    /// variable whose current item is record-backed gets an inner data
    /// variable so that record writes reach it.
    pub fn create_resolver(
        &mut self,
        props: ResolverProps,
        scope: Option<CollectionStateMap>,
    ) -> Result<ResolverId, ResolverError> {
        let resolver = Resolver::from_props(props, scope, &self.data, &self.log)?;
        let is_collection_variable = resolver.is_collection_variable();
        let id = self.resolvers.insert(resolver);
        if is_collection_variable {
            self.rebind_collection_inner(id);
        }
        tracing::trace!(target: targets::RESOLVER, ?id, "resolver created");
        Ok(id)
    }

    /// Drop a resolver. Listeners still pointing at it see `Null`.
    pub fn destroy_resolver(&mut self, id: ResolverId) {
        let Some(resolver) = self.resolvers.remove(id) else {
            return;
        };
        if let Resolver::CollectionVariable(variable) = resolver {
            if let Some(inner) = variable.inner {
                self.destroy_listener(inner);
            }
        }
    }

    pub fn resolver(&self, id: ResolverId) -> Option<&Resolver> {
        self.resolvers.get(id)
    }

    /// Current value of a resolver; `Null` when it no longer exists.
    pub fn resolver_value(&self, id: ResolverId) -> Value {
        self.resolvers
            .get(id)
            .map(|resolver| resolver.get_data_value(&self.data))
            .unwrap_or(Value::Null)
    }

    /// Re-run a condition resolver's evaluation. `Ok(None)` for other
    /// resolver kinds.
    pub fn reevaluate(&mut self, id: ResolverId) -> Result<Option<bool>, ConditionError> {
        match self.resolvers.get_mut(id) {
            Some(Resolver::Condition(condition)) => condition.reevaluate(&self.data).map(Some),
            _ => Ok(None),
        }
    }

    /// Point a data variable at a new path. Returns `false` if `id` is not
    /// a data variable.
    pub fn set_variable_path(&mut self, id: ResolverId, path: impl Into<String>) -> bool {
        let Some(Resolver::Variable(variable)) = self.resolvers.get_mut(id) else {
            return false;
        };
        variable.set_path(path.into());
        self.emit(Topic::resolver(id, ResolverField::Path));
        true
    }

    /// Change a data variable's default value.
    pub fn set_variable_default(&mut self, id: ResolverId, value: Option<Value>) -> bool {
        let Some(Resolver::Variable(variable)) = self.resolvers.get_mut(id) else {
            return false;
        };
        variable.set_default_value(value);
        self.emit(Topic::resolver(id, ResolverField::DefaultValue));
        true
    }

    /// Give a collection variable a new collection state. Listeners are
    /// notified when the resolution changed.
    pub fn update_collections_state_map(&mut self, id: ResolverId, state_map: CollectionStateMap) -> bool {
        let changed = match self.resolvers.get_mut(id) {
            Some(Resolver::CollectionVariable(variable)) => variable.update_collections_state_map(state_map, &self.log),
            _ => return false,
        };
        if changed {
            self.rebind_collection_inner(id);
            self.emit(Topic::resolver(id, ResolverField::Value));
        }
        changed
    }

    fn rebind_collection_inner(&mut self, id: ResolverId) {
        let (previous, variable) = match self.resolvers.get_mut(id) {
            Some(Resolver::CollectionVariable(cv)) => (cv.inner.take(), cv.data_variable().cloned()),
            _ => return,
        };
        if let Some(previous) = previous {
            self.destroy_listener(previous);
        }
        let Some(variable) = variable else {
            return;
        };
        let inner = self.resolvers.insert(Resolver::Variable(DataVariable::new(variable)));
        let listener = self.listen(
            inner,
            true,
            Rc::new(move |editor: &mut Editor, _| editor.emit(Topic::resolver(id, ResolverField::Value))),
        );
        if let Some(Resolver::CollectionVariable(cv)) = self.resolvers.get_mut(id) {
            cv.inner = Some(listener);
        }
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Call `on_update` with the new value whenever resolver `id` may have
    /// changed. The resolver outlives the listener.
    pub fn listen_resolver(&mut self, id: ResolverId, on_update: impl Fn(&mut Editor, Value) + 'static) -> ListenerId {
        self.listen(id, false, Rc::new(on_update))
    }

    pub(crate) fn listen(&mut self, resolver: ResolverId, owns_resolver: bool, on_update: UpdateFn) -> ListenerId {
        let id = self.listeners.insert(ResolverListener {
            resolver,
            owns_resolver,
            topics: Vec::new(),
            subscriptions: Vec::new(),
            on_update,
            state: ListenerState::Unbound,
        });
        let topics = self
            .resolvers
            .get(resolver)
            .map(|r| dependencies(resolver, r, &self.data))
            .unwrap_or_default();
        self.subscribe_topics(id, topics);
        id
    }

    pub fn listener(&self, id: ListenerId) -> Option<&ResolverListener> {
        self.listeners.get(id)
    }

    /// State of a listener. Destroyed listeners are gone from the arena.
    pub fn listener_state(&self, id: ListenerId) -> ListenerState {
        self.listeners
            .get(id)
            .map(|listener| listener.state)
            .unwrap_or(ListenerState::Destroyed)
    }

    /// Unsubscribe everything. Idempotent, and safe from inside the
    /// listener's own callback.
    pub fn destroy_listener(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.remove(id) else {
            return;
        };
        for subscription in listener.subscriptions {
            self.bus.unsubscribe(subscription);
        }
        if listener.owns_resolver {
            self.destroy_resolver(listener.resolver);
        }
        tracing::debug!(target: targets::RESOLVER, ?id, "listener destroyed");
    }

    fn subscribe_topics(&mut self, id: ListenerId, topics: Vec<Topic>) {
        let previous = match self.listeners.get_mut(id) {
            Some(listener) => std::mem::take(&mut listener.subscriptions),
            None => return,
        };
        for subscription in previous {
            self.bus.unsubscribe(subscription);
        }
        let subscriptions = topics
            .iter()
            .map(|topic| {
                self.bus
                    .subscribe(topic.clone(), Rc::new(move |editor: &mut Editor| editor.on_listener_change(id)))
            })
            .collect();
        tracing::trace!(target: targets::RESOLVER, ?id, topics = topics.len(), "listener bound");
        if let Some(listener) = self.listeners.get_mut(id) {
            listener.topics = topics;
            listener.subscriptions = subscriptions;
            listener.state = ListenerState::Bound;
        }
    }

    fn on_listener_change(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.get(id).filter(|l| l.state == ListenerState::Bound) else {
            return;
        };
        let resolver = listener.resolver;
        let on_update = Rc::clone(&listener.on_update);
        let current = listener.topics.clone();

        if let Some(Resolver::Condition(condition)) = self.resolvers.get_mut(resolver) {
            if let Err(err) = condition.reevaluate(&self.data) {
                self.log
                    .error(Channel::Resolver, format!("failed to reevaluate condition: {err}"));
            }
        }
        let topics = self
            .resolvers
            .get(resolver)
            .map(|r| dependencies(resolver, r, &self.data))
            .unwrap_or_default();
        if topics != current {
            self.subscribe_topics(id, topics);
        }
        let value = self.resolver_value(resolver);
        on_update(self, value);
    }
}
