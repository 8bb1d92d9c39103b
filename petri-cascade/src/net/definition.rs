use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PlaceKind;

/// Declarative description of a net, as read from JSON.
///
/// ```json
/// {
///   "places": [
///     { "id": "a", "kind": "source" },
///     { "id": "b", "kind": "source" },
///     { "id": "out", "kind": "exit" }
///   ],
///   "transitions": [
///     { "label": "t", "inputs": ["a", "b"], "outputs": ["out"],
///       "reduction": { "reducer": "max", "init_accumulator": 0 },
///       "value_checking": { "a": "positive" } }
///   ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetDefinition<V> {
    #[serde(alias = "nodes")]
    pub places: Vec<PlaceDefinition>,
    pub transitions: Vec<TransitionDefinition<V>>,
}

impl<V> Default for NetDefinition<V> {
    fn default() -> Self {
        NetDefinition { places: Vec::new(), transitions: Vec::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDefinition {
    pub id: String,
    #[serde(default, alias = "type")]
    pub kind: PlaceKind,
    /// Transition label inhibited by this place, only for `inhibit` places.
    #[serde(default, alias = "transition", skip_serializing_if = "Option::is_none")]
    pub inhibits: Option<String>,
    /// Name of a registered place variant, `counter` if missing.
    #[serde(default, alias = "class", skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl PlaceDefinition {
    pub fn new(id: impl Into<String>, kind: PlaceKind) -> Self {
        PlaceDefinition { id: id.into(), kind, inhibits: None, variant: None }
    }

    pub fn inhibitor(id: impl Into<String>, label: impl Into<String>) -> Self {
        PlaceDefinition {
            id: id.into(),
            kind: PlaceKind::Inhibit,
            inhibits: Some(label.into()),
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionDefinition<V> {
    pub label: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction: Option<ReductionDefinition<V>>,
    /// Input place id -> checker name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_checking: BTreeMap<String, String>,
}

impl<V> TransitionDefinition<V> {
    pub fn new<I, O>(label: impl Into<String>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        TransitionDefinition {
            label: label.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            reduction: None,
            value_checking: Default::default(),
        }
    }

    pub fn with_reduction(
        &mut self,
        reducer: impl Into<String>,
        init_accumulator: V,
    ) -> &mut Self {
        self.reduction = Some(ReductionDefinition { reducer: reducer.into(), init_accumulator });
        self
    }

    pub fn with_value_checking(
        &mut self,
        place: impl Into<String>,
        checker: impl Into<String>,
    ) -> &mut Self {
        self.value_checking.insert(place.into(), checker.into());
        self
    }
}

/// Named reducer and its seed. Both are required, a zero seed is a valid seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReductionDefinition<V> {
    pub reducer: String,
    #[serde(alias = "initAccumulator")]
    pub init_accumulator: V,
}
