use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::{Place, PlaceId, Token, TransitionId};
use crate::error::{PetriError, Result};
use crate::trace::{epoch_millis, TraceEvent, TraceSink};

pub type Reducer<V> = Arc<dyn Fn(V, V) -> V + Send + Sync>;
pub type ValueCheck<V> = Arc<dyn Fn(&V, u64) -> bool + Send + Sync>;

/// How the recorded input values of a transition are combined.
#[derive(Clone)]
pub enum Reduction<V> {
    /// [`Token::sum`] seeded with [`Token::zero`].
    Sum,
    Special { reducer: Reducer<V>, init: V },
}

impl<V> Default for Reduction<V> {
    fn default() -> Self {
        Reduction::Sum
    }
}

impl<V: Token> Reduction<V> {
    pub fn reduce(&self, values: impl IntoIterator<Item = V>) -> V {
        match self {
            Reduction::Sum => values.into_iter().fold(V::zero(), V::sum),
            Reduction::Special { reducer, init } => {
                values.into_iter().fold(init.clone(), |acc, v| reducer(acc, v))
            }
        }
    }
}

/// Values received per input since the last firing, one slot per input in registration order.
#[derive(Debug, Clone)]
pub struct EnablementRecord<V> {
    slots: Vec<Option<V>>,
}

impl<V> Default for EnablementRecord<V> {
    fn default() -> Self {
        EnablementRecord { slots: Vec::new() }
    }
}

impl<V: Clone> EnablementRecord<V> {
    fn push_slot(&mut self) {
        self.slots.push(None);
    }

    /// Store a value, replacing one that arrived earlier in the same window.
    pub fn record(&mut self, slot: usize, value: V) {
        self.slots[slot] = Some(value);
    }

    pub fn is_recorded(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(Option::is_some)
    }

    pub fn get(&self, slot: usize) -> Option<&V> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Empty every slot, returning the recorded values in slot order.
    pub fn take(&mut self) -> Vec<V> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRole {
    /// Consumed and recorded, must have arrived for the transition to fire.
    Plain,
    /// Read only, must be empty for the transition to fire.
    Inhibitor,
}

#[derive(Clone, Debug)]
pub struct Input {
    pub place: PlaceId,
    pub name: String,
    pub role: InputRole,
}

#[derive(Clone, Debug)]
pub struct Output {
    pub place: PlaceId,
    pub name: String,
}

/// Result of a firing: the reduction and where it goes.
pub struct Firing<V> {
    pub value: V,
    pub outputs: Vec<PlaceId>,
}

pub struct Transition<V> {
    id: TransitionId,
    label: String,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    record: EnablementRecord<V>,
    value_checks: HashMap<PlaceId, ValueCheck<V>>,
    reduction: Reduction<V>,
    trace_sink: Option<Arc<dyn TraceSink<V>>>,
}

impl<V: Token> Transition<V> {
    pub fn new(id: TransitionId, label: impl Into<String>) -> Self {
        Transition {
            id,
            label: label.into(),
            inputs: Default::default(),
            outputs: Default::default(),
            record: Default::default(),
            value_checks: Default::default(),
            reduction: Default::default(),
            trace_sink: None,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn record(&self) -> &EnablementRecord<V> {
        &self.record
    }

    pub fn reduction(&self) -> &Reduction<V> {
        &self.reduction
    }

    fn is_registered(&self, place_id: PlaceId) -> bool {
        self.inputs.iter().any(|i| i.place == place_id)
            || self.outputs.iter().any(|o| o.place == place_id)
    }

    fn input_slot(&self, place_id: PlaceId) -> Option<usize> {
        self.inputs.iter().position(|i| i.place == place_id)
    }

    /// Subscribe to `place`. The place takes the inhibitor role if it inhibits this label.
    pub fn add_pre_node(&mut self, place_id: PlaceId, place: &mut Place<V>) -> Result<()> {
        if self.is_registered(place_id) {
            return Err(PetriError::ConfigError(format!(
                "Place '{}' added to transition '{}' twice.",
                place.name(),
                self.label
            )));
        }
        let role = if place.inhibits_label(&self.label) {
            InputRole::Inhibitor
        } else {
            InputRole::Plain
        };
        self.inputs.push(Input { place: place_id, name: place.name().into(), role });
        self.record.push_slot();
        place.add_transition(self.id);
        Ok(())
    }

    pub fn add_post_node(&mut self, place_id: PlaceId, place: &Place<V>) -> Result<()> {
        if self.is_registered(place_id) {
            return Err(PetriError::ConfigError(format!(
                "Place '{}' added to transition '{}' twice.",
                place.name(),
                self.label
            )));
        }
        self.outputs.push(Output { place: place_id, name: place.name().into() });
        Ok(())
    }

    pub fn set_special_reduction(&mut self, reducer: Reducer<V>, init: V) {
        self.reduction = Reduction::Special { reducer, init };
    }

    /// Install a filter deciding whether an arrival from `place_id` is recorded.
    pub fn add_custom_value_checking(
        &mut self,
        place_id: PlaceId,
        check: ValueCheck<V>,
    ) -> Result<()> {
        match self.input_slot(place_id) {
            Some(_) => {
                self.value_checks.insert(place_id, check);
                Ok(())
            }
            None => Err(PetriError::ConfigError(format!(
                "Value checking for transition '{}' refers to place {} which is not an input.",
                self.label, place_id.0
            ))),
        }
    }

    pub fn set_trace_sink(&mut self, sink: Option<Arc<dyn TraceSink<V>>>) {
        self.trace_sink = sink;
    }

    pub fn clear(&mut self) {
        self.record.clear();
    }

    /// Handle a broadcast from an input place.
    ///
    /// Returns true if the arrival was consumed and recorded.
    pub fn on_arrival(&mut self, place_id: PlaceId, place: &mut Place<V>, value: &V) -> bool {
        let Some(slot) = self.input_slot(place_id) else {
            return false;
        };
        if self.inputs[slot].role == InputRole::Inhibitor {
            return false;
        }
        if let Some(check) = self.value_checks.get(&place_id) {
            if !check(value, place.count()) {
                trace!(
                    transition = %self.label,
                    place = %place.name(),
                    ?value,
                    "Arrival filtered."
                );
                return false;
            }
        }
        let taken = place.consume(value);
        trace!(
            transition = %self.label,
            place = %place.name(),
            value = ?taken,
            "Arrival recorded."
        );
        self.record.record(slot, taken);
        true
    }

    /// All plain inputs recorded and all inhibiting inputs empty.
    pub fn is_enabled(&self, places: &[Place<V>]) -> bool {
        self.inputs.iter().enumerate().all(|(slot, input)| match input.role {
            InputRole::Plain => self.record.is_recorded(slot),
            InputRole::Inhibitor => places[input.place.0].has_resource(&self.label),
        })
    }

    /// Reduce and clear the record, reporting to the trace sink around the reduction.
    pub fn fire(&mut self) -> Firing<V> {
        if let Some(sink) = &self.trace_sink {
            sink.publish(TraceEvent::Pre {
                label: self.label.clone(),
                record: self.snapshot(),
                epoch_millis: epoch_millis(),
            });
        }
        let value = self.reduction.reduce(self.record.take());
        if let Some(sink) = &self.trace_sink {
            sink.publish(TraceEvent::Post {
                label: self.label.clone(),
                outputs: self.outputs.iter().map(|o| o.name.clone()).collect(),
                epoch_millis: epoch_millis(),
            });
        }
        Firing { value, outputs: self.outputs.iter().map(|o| o.place).collect() }
    }

    /// Recorded values keyed by place name, in registration order.
    pub fn snapshot(&self) -> Vec<(String, V)> {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(slot, input)| {
                self.record.get(slot).map(|v| (input.name.clone(), v.clone()))
            })
            .collect()
    }
}
