use std::{collections::HashMap, fs, path::Path};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::NetConfig;
use crate::error::{PetriError, Result};
use crate::registry::{Callback, CallbackFactory, CallbackKind, CheckerFactory, PlaceRegistry};

use super::{
    NetDefinition, PetriNet, Place, PlaceDefinition, PlaceId, PlaceKind, PlaceStorage, Token,
    Transition, TransitionDefinition, TransitionId,
};

/// Collects place and transition definitions and turns them into a [`PetriNet`].
pub struct PetriNetBuilder<V> {
    definition: NetDefinition<V>,
    registry: PlaceRegistry<V>,
    config: NetConfig,
}

impl<V: Token> Default for PetriNetBuilder<V> {
    fn default() -> Self {
        PetriNetBuilder {
            definition: Default::default(),
            registry: Default::default(),
            config: Default::default(),
        }
    }
}

impl<V: Token> PetriNetBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definition(definition: NetDefinition<V>) -> Self {
        PetriNetBuilder { definition, ..Default::default() }
    }

    pub fn from_json(json: &str) -> Result<Self>
    where
        V: DeserializeOwned,
    {
        Ok(Self::from_definition(serde_json::from_str(json)?))
    }

    /// Read a JSON net definition from a file.
    pub fn load(path: &Path) -> Result<Self>
    where
        V: DeserializeOwned,
    {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write the current definition as JSON.
    pub fn save(&self, path: &Path) -> Result<()>
    where
        V: Serialize,
    {
        let json = serde_json::to_string_pretty(&self.definition)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn with_config(mut self, config: NetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn definition(&self) -> &NetDefinition<V> {
        &self.definition
    }

    pub fn is_empty(&self) -> bool {
        self.definition.places.is_empty() && self.definition.transitions.is_empty()
    }

    /// Make a place variant available to definitions under `variant`.
    pub fn register_place_variant<F>(&mut self, variant: &str, constructor: F)
    where
        F: Fn(&str) -> Box<dyn PlaceStorage<V>> + Send + Sync + 'static,
    {
        self.registry.register(variant, constructor);
    }

    pub fn insert_place(
        &mut self,
        id: impl Into<String>,
        kind: PlaceKind,
    ) -> &mut PlaceDefinition {
        self.insert_place_definition(PlaceDefinition::new(id, kind))
    }

    pub fn insert_inhibitor(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
    ) -> &mut PlaceDefinition {
        self.insert_place_definition(PlaceDefinition::inhibitor(id, label))
    }

    pub fn insert_place_definition(&mut self, place: PlaceDefinition) -> &mut PlaceDefinition {
        self.definition.places.push(place);
        let last = self.definition.places.len() - 1;
        &mut self.definition.places[last]
    }

    /// Insert a transition. Returns the definition so reduction and value checking can be added.
    pub fn insert_transition<I, O>(
        &mut self,
        label: &str,
        inputs: I,
        outputs: O,
    ) -> &mut TransitionDefinition<V>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        self.definition.transitions.push(TransitionDefinition::new(label, inputs, outputs));
        let last = self.definition.transitions.len() - 1;
        &mut self.definition.transitions[last]
    }

    /// Build the net.
    ///
    /// Exit callbacks are requested from `callbacks` with the place id and [`CallbackKind::Exit`],
    /// reducers with the reducer name and [`CallbackKind::Reduce`]. Value checking names are
    /// resolved through `checkers`.
    pub fn build(
        &self,
        callbacks: &dyn CallbackFactory<V>,
        checkers: Option<&dyn CheckerFactory<V>>,
    ) -> Result<PetriNet<V>> {
        if self.definition.places.is_empty() {
            return Err(PetriError::ConfigError("No places specified.".into()));
        }
        if self.definition.transitions.is_empty() {
            return Err(PetriError::ConfigError("No transitions specified.".into()));
        }
        let mut net = PetriNet {
            places: Vec::with_capacity(self.definition.places.len()),
            transitions: Vec::with_capacity(self.definition.transitions.len()),
            place_ids: HashMap::new(),
            sources: Vec::new(),
            exits: Vec::new(),
            config: self.config.clone(),
        };

        for pl_def in &self.definition.places {
            let pl_id = PlaceId(net.places.len());
            let place = self.create_place(pl_def, callbacks)?;
            if net.place_ids.insert(pl_def.id.clone(), pl_id).is_some() {
                return Err(PetriError::ConfigError(format!(
                    "Place '{}' defined more than once.",
                    pl_def.id
                )));
            }
            match place.kind() {
                PlaceKind::Source => net.sources.push(pl_id),
                PlaceKind::Exit => net.exits.push(pl_id),
                _ => {}
            }
            net.places.push(place);
        }

        // plain input place -> label of the transition that claimed it
        let mut claimed = HashMap::<PlaceId, &str>::new();
        for tr_def in &self.definition.transitions {
            let tr_id = TransitionId(net.transitions.len());
            let mut tr = Transition::new(tr_id, tr_def.label.as_str());
            for input in &tr_def.inputs {
                let pl_id = Self::lookup(&net, tr_def, input)?;
                let place = &mut net.places[pl_id.0];
                tr.add_pre_node(pl_id, place)?;
                if !place.inhibits_label(&tr_def.label) {
                    if let Some(owner) = claimed.insert(pl_id, &tr_def.label) {
                        return Err(PetriError::ConfigError(format!(
                            "{input} used more than once in transitions ('{owner}' and '{}').",
                            tr_def.label
                        )));
                    }
                }
                if place.kind() == PlaceKind::Exit {
                    warn!(
                        transition = %tr_def.label,
                        place = %input,
                        "Exit place used as input, the transition will never fire."
                    );
                }
            }
            for output in &tr_def.outputs {
                let pl_id = Self::lookup(&net, tr_def, output)?;
                tr.add_post_node(pl_id, &net.places[pl_id.0])?;
            }
            if let Some(reduction) = &tr_def.reduction {
                match callbacks.callback(&reduction.reducer, CallbackKind::Reduce) {
                    Some(Callback::Reduce(reducer)) => {
                        tr.set_special_reduction(reducer, reduction.init_accumulator.clone())
                    }
                    other => {
                        return Err(not_a_function(
                            format!(
                                "Reducer '{}' of transition '{}'",
                                reduction.reducer, tr_def.label
                            ),
                            other,
                        ))
                    }
                }
            }
            if !tr_def.value_checking.is_empty() {
                let checkers = checkers.ok_or_else(|| {
                    PetriError::ConfigError(format!(
                        "Transition '{}' uses value checking, but no checker factory was given. \
                         Filters are never skipped silently.",
                        tr_def.label
                    ))
                })?;
                for (place_name, checker_name) in &tr_def.value_checking {
                    let pl_id = Self::lookup(&net, tr_def, place_name)?;
                    let check = checkers.checker(checker_name).ok_or_else(|| {
                        PetriError::ConfigError(format!(
                            "Checker '{checker_name}' of transition '{}' is not a function.",
                            tr_def.label
                        ))
                    })?;
                    tr.add_custom_value_checking(pl_id, check)?;
                }
            }
            net.transitions.push(tr);
        }

        debug!(
            places = net.places.len(),
            transitions = net.transitions.len(),
            sources = net.sources.len(),
            exits = net.exits.len(),
            "Constructed net."
        );
        Ok(net)
    }

    fn create_place(
        &self,
        pl_def: &PlaceDefinition,
        callbacks: &dyn CallbackFactory<V>,
    ) -> Result<Place<V>> {
        match (pl_def.kind, &pl_def.inhibits) {
            (PlaceKind::Inhibit, None) => {
                return Err(PetriError::ConfigError(format!(
                    "Inhibit place '{}' needs the label of the transition it inhibits.",
                    pl_def.id
                )))
            }
            (kind, Some(_)) if kind != PlaceKind::Inhibit => {
                return Err(PetriError::ConfigError(format!(
                    "Place '{}' of kind {kind} cannot inhibit a transition.",
                    pl_def.id
                )))
            }
            _ => {}
        }
        let variant = pl_def.variant.as_deref().unwrap_or("counter");
        let storage = self.registry.create(variant, &pl_def.id).ok_or_else(|| {
            PetriError::ConfigError(format!(
                "Place '{}' uses unknown variant '{variant}'.",
                pl_def.id
            ))
        })?;
        let mut place = Place::with_storage(pl_def.id.as_str(), pl_def.kind, storage);
        place.set_inhibits(pl_def.inhibits.clone());
        if pl_def.kind == PlaceKind::Exit {
            match callbacks.callback(&pl_def.id, CallbackKind::Exit) {
                Some(Callback::Exit(cb)) => place.set_exit_callback(cb),
                other => {
                    return Err(not_a_function(
                        format!("{} exit value call back", pl_def.id),
                        other,
                    ))
                }
            }
        }
        Ok(place)
    }

    fn lookup(net: &PetriNet<V>, tr_def: &TransitionDefinition<V>, name: &str) -> Result<PlaceId> {
        net.place_id(name).ok_or_else(|| {
            PetriError::ConfigError(format!(
                "Transition '{}' refers to place '{name}', which does not exist.",
                tr_def.label
            ))
        })
    }
}

fn not_a_function<V>(what: String, resolved: Option<Callback<V>>) -> PetriError {
    match resolved {
        Some(callback) => PetriError::ConfigError(format!(
            "{what} is not a function, the factory returned a {:?} callback.",
            callback.kind()
        )),
        None => PetriError::ConfigError(format!("{what} is not a function.")),
    }
}
