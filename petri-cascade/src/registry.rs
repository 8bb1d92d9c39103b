use std::collections::HashMap;
use std::sync::Arc;

use crate::net::{
    CounterPlace, ExitCallback, PlaceStorage, QueuePlace, Reducer, Token, ValueCheck,
};

pub type PlaceConstructor<V> = Box<dyn Fn(&str) -> Box<dyn PlaceStorage<V>> + Send + Sync>;

/// Named place variants available to net definitions.
///
/// `counter` (the default) and `queue` are always registered.
pub struct PlaceRegistry<V> {
    constructors: HashMap<String, PlaceConstructor<V>>,
}

impl<V: Token> Default for PlaceRegistry<V> {
    fn default() -> Self {
        let mut registry = PlaceRegistry { constructors: HashMap::new() };
        registry.register("counter", |_| -> Box<dyn PlaceStorage<V>> {
            Box::new(CounterPlace::new())
        });
        registry.register("queue", |_| -> Box<dyn PlaceStorage<V>> {
            Box::new(QueuePlace::<V>::new())
        });
        registry
    }
}

impl<V: Token> PlaceRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variant. The constructor receives the id of the place it is created for.
    pub fn register<F>(&mut self, variant: &str, constructor: F)
    where
        F: Fn(&str) -> Box<dyn PlaceStorage<V>> + Send + Sync + 'static,
    {
        self.constructors.insert(variant.into(), Box::new(constructor));
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.constructors.contains_key(variant)
    }

    pub fn create(&self, variant: &str, place_id: &str) -> Option<Box<dyn PlaceStorage<V>>> {
        self.constructors.get(variant).map(|ctor| ctor(place_id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    Exit,
    Reduce,
}

pub enum Callback<V> {
    Exit(ExitCallback<V>),
    Reduce(Reducer<V>),
}

impl<V> Callback<V> {
    pub fn kind(&self) -> CallbackKind {
        match self {
            Callback::Exit(_) => CallbackKind::Exit,
            Callback::Reduce(_) => CallbackKind::Reduce,
        }
    }
}

/// Resolves exit callbacks (by place id) and reducers (by reducer name) while building a net.
pub trait CallbackFactory<V> {
    fn callback(&self, name: &str, kind: CallbackKind) -> Option<Callback<V>>;
}

impl<V, F> CallbackFactory<V> for F
where
    F: Fn(&str, CallbackKind) -> Option<Callback<V>>,
{
    fn callback(&self, name: &str, kind: CallbackKind) -> Option<Callback<V>> {
        self(name, kind)
    }
}

/// Resolves value checking predicates by name.
pub trait CheckerFactory<V> {
    fn checker(&self, name: &str) -> Option<ValueCheck<V>>;
}

impl<V, F> CheckerFactory<V> for F
where
    F: Fn(&str) -> Option<ValueCheck<V>>,
{
    fn checker(&self, name: &str) -> Option<ValueCheck<V>> {
        self(name)
    }
}

type ExitFactory<V> = Box<dyn Fn() -> ExitCallback<V> + Send + Sync>;

/// Name based implementation of both factories.
///
/// Exit callbacks are registered as constructors since every build needs a fresh callback.
pub struct FunctionRegistry<V> {
    exits: HashMap<String, ExitFactory<V>>,
    reducers: HashMap<String, Reducer<V>>,
    checkers: HashMap<String, ValueCheck<V>>,
}

impl<V> Default for FunctionRegistry<V> {
    fn default() -> Self {
        FunctionRegistry {
            exits: Default::default(),
            reducers: Default::default(),
            checkers: Default::default(),
        }
    }
}

impl<V: Token> FunctionRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_exit<F, C>(&mut self, place_id: &str, make_callback: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: FnMut(V) + Send + 'static,
    {
        let factory = move || -> ExitCallback<V> { Box::new(make_callback()) };
        self.exits.insert(place_id.into(), Box::new(factory));
    }

    pub fn register_reducer<F>(&mut self, name: &str, reducer: F)
    where
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        self.reducers.insert(name.into(), Arc::new(reducer));
    }

    pub fn register_checker<F>(&mut self, name: &str, checker: F)
    where
        F: Fn(&V, u64) -> bool + Send + Sync + 'static,
    {
        self.checkers.insert(name.into(), Arc::new(checker));
    }
}

impl<V: Token> CallbackFactory<V> for FunctionRegistry<V> {
    fn callback(&self, name: &str, kind: CallbackKind) -> Option<Callback<V>> {
        match kind {
            CallbackKind::Exit => self.exits.get(name).map(|make| Callback::Exit(make())),
            CallbackKind::Reduce => self.reducers.get(name).cloned().map(Callback::Reduce),
        }
    }
}

impl<V: Token> CheckerFactory<V> for FunctionRegistry<V> {
    fn checker(&self, name: &str) -> Option<ValueCheck<V>> {
        self.checkers.get(name).cloned()
    }
}
