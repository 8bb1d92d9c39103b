use std::collections::VecDeque;

use tracing::{trace, warn};

use super::{PlaceKind, Token, TransitionId};

pub type ExitCallback<V> = Box<dyn FnMut(V) + Send>;
pub type Constraint<V> = Box<dyn Fn(&V) -> bool + Send>;

/// Storage behind a place.
///
/// Implementations decide how arriving values accumulate and what a transition takes away. The
/// only requirement is that `count() == 0` means "no resource".
pub trait PlaceStorage<V>: Send {
    fn add_resource(&mut self, value: &V);

    /// Take resources away for a transition that received `arrived` from this place. The returned
    /// value is what the transition records for its reduction.
    fn consume(&mut self, arrived: &V) -> V;

    fn count(&self) -> u64;

    fn clear(&mut self);
}

/// Default storage: counts units.
#[derive(Default, Debug, Clone)]
pub struct CounterPlace {
    count: u64,
}

impl CounterPlace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumption policy of counting places: one unit per arrival, whatever quantity arrived.
    pub fn consume_one(&mut self) -> u64 {
        self.count = self.count.saturating_sub(1);
        1
    }
}

impl<V: Token> PlaceStorage<V> for CounterPlace {
    fn add_resource(&mut self, value: &V) {
        self.count = self.count.saturating_add(value.units());
    }

    fn consume(&mut self, arrived: &V) -> V {
        self.consume_one();
        arrived.clone()
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn clear(&mut self) {
        self.count = 0;
    }
}

/// Keeps every arrived value, oldest first. Consuming hands out the oldest token.
#[derive(Debug, Clone)]
pub struct QueuePlace<V> {
    tokens: VecDeque<V>,
}

impl<V> Default for QueuePlace<V> {
    fn default() -> Self {
        QueuePlace { tokens: VecDeque::new() }
    }
}

impl<V> QueuePlace<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &V> {
        self.tokens.iter()
    }
}

impl<V: Token> PlaceStorage<V> for QueuePlace<V> {
    fn add_resource(&mut self, value: &V) {
        self.tokens.push_back(value.clone());
    }

    fn consume(&mut self, arrived: &V) -> V {
        self.tokens.pop_front().unwrap_or_else(|| arrived.clone())
    }

    fn count(&self) -> u64 {
        self.tokens.len() as u64
    }

    fn clear(&mut self) {
        self.tokens.clear();
    }
}

/// What happened to a value handed to [`Place::forward`].
#[derive(Debug, PartialEq)]
pub enum Forwarded<V> {
    /// The node constraint refused the value.
    Rejected,
    /// The place is an exit, the value left the net.
    Exited,
    /// The value was stored and has to be broadcast to the subscribers.
    Stored(V),
}

pub struct Place<V> {
    name: String,
    kind: PlaceKind,
    inhibits: Option<String>,
    storage: Box<dyn PlaceStorage<V>>,
    exit_callback: Option<ExitCallback<V>>,
    constraint: Option<Constraint<V>>,
    subscribers: Vec<TransitionId>,
}

impl<V: Token> Place<V> {
    /// Place with the default counting storage.
    pub fn new(name: impl Into<String>, kind: PlaceKind) -> Self {
        Place::with_storage(name, kind, Box::new(CounterPlace::new()))
    }

    pub fn with_storage(
        name: impl Into<String>,
        kind: PlaceKind,
        storage: Box<dyn PlaceStorage<V>>,
    ) -> Self {
        Place {
            name: name.into(),
            kind,
            inhibits: None,
            storage,
            exit_callback: None,
            constraint: None,
            subscribers: Default::default(),
        }
    }

    /// Place of kind `inhibit` blocking transitions labelled `label` while it holds a resource.
    pub fn inhibitor(name: impl Into<String>, label: impl Into<String>) -> Self {
        let mut place = Place::new(name, PlaceKind::Inhibit);
        place.inhibits = Some(label.into());
        place
    }

    pub(crate) fn set_inhibits(&mut self, label: Option<String>) {
        self.inhibits = label;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PlaceKind {
        self.kind
    }

    /// Transition label this place inhibits, if any.
    pub fn inhibits(&self) -> Option<&str> {
        self.inhibits.as_deref()
    }

    /// True if this place takes the inhibitor role for transitions labelled `label`.
    pub fn inhibits_label(&self, label: &str) -> bool {
        self.inhibits.as_deref() == Some(label)
    }

    pub fn subscribers(&self) -> &[TransitionId] {
        &self.subscribers
    }

    pub fn has_exit_callback(&self) -> bool {
        self.exit_callback.is_some()
    }

    pub fn set_exit_callback(&mut self, cb: ExitCallback<V>) {
        self.exit_callback = Some(cb);
    }

    pub fn set_constraint(&mut self, constraint: Constraint<V>) {
        self.constraint = Some(constraint);
    }

    pub fn add_transition(&mut self, transition: TransitionId) {
        self.subscribers.push(transition);
    }

    pub fn count(&self) -> u64 {
        self.storage.count()
    }

    /// Presence check as seen by a transition labelled `label`.
    pub fn has_resource(&self, label: &str) -> bool {
        let marked = self.count() > 0;
        if self.inhibits_label(label) {
            !marked
        } else {
            marked
        }
    }

    pub fn consume(&mut self, arrived: &V) -> V {
        self.storage.consume(arrived)
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Accept a value. Broadcasting a stored value is up to the net, which owns the subscribers.
    pub fn forward(&mut self, value: V) -> Forwarded<V> {
        if let Some(constraint) = &self.constraint {
            if !constraint(&value) {
                trace!(place = self.name, ?value, "Value rejected by place constraint.");
                return Forwarded::Rejected;
            }
        }
        if self.kind == PlaceKind::Exit {
            match self.exit_callback.as_mut() {
                Some(cb) => cb(value),
                None => warn!(place = self.name, "Exit place has no callback, value dropped."),
            }
            return Forwarded::Exited;
        }
        self.storage.add_resource(&value);
        Forwarded::Stored(value)
    }
}
