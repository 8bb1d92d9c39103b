mod builder;
mod common;
mod definition;
mod net_state;
mod place;
mod transition;

pub use builder::PetriNetBuilder;
pub use common::{PlaceId, PlaceKind, Token, TransitionId};
pub use definition::{NetDefinition, PlaceDefinition, ReductionDefinition, TransitionDefinition};
pub use net_state::PetriNet;
pub use place::{
    Constraint, CounterPlace, ExitCallback, Forwarded, Place, PlaceStorage, QueuePlace,
};
pub use transition::{
    EnablementRecord, Firing, Input, InputRole, Output, Reducer, Reduction, Transition, ValueCheck,
};
