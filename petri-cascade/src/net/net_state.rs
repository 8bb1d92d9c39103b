use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{ExitCallback, Forwarded, Place, PlaceId, PlaceKind, Token, Transition, TransitionId};
use crate::config::NetConfig;
use crate::error::{PetriError, Result};
use crate::trace::TraceSink;

/// A built net, ready to receive values at its sources.
///
/// Everything runs on the caller's stack: [`PetriNet::inject`] returns once the cascade it started
/// has come to rest.
pub struct PetriNet<V> {
    pub(super) places: Vec<Place<V>>,
    pub(super) transitions: Vec<Transition<V>>,
    pub(super) place_ids: HashMap<String, PlaceId>,
    pub(super) sources: Vec<PlaceId>,
    pub(super) exits: Vec<PlaceId>,
    pub(super) config: NetConfig,
}

impl<V: Token> PetriNet<V> {
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        self.place_ids.get(name).copied()
    }

    pub fn place(&self, name: &str) -> Option<&Place<V>> {
        self.place_id(name).map(|pl_id| &self.places[pl_id.0])
    }

    pub fn places(&self) -> impl Iterator<Item = (PlaceId, &Place<V>)> {
        self.places.iter().enumerate().map(|(idx, pl)| (PlaceId(idx), pl))
    }

    pub fn transition(&self, transition_id: TransitionId) -> Option<&Transition<V>> {
        self.transitions.get(transition_id.0)
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition<V>> {
        self.transitions.iter()
    }

    /// Names of all source places in declaration order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|pl_id| self.places[pl_id.0].name())
    }

    /// Names of all exit places in declaration order.
    pub fn exits(&self) -> impl Iterator<Item = &str> {
        self.exits.iter().map(|pl_id| self.places[pl_id.0].name())
    }

    /// Current count of every place.
    pub fn marking(&self) -> Vec<(String, u64)> {
        self.places.iter().map(|pl| (pl.name().to_string(), pl.count())).collect()
    }

    /// Inject a value into a source place and run the resulting cascade to completion.
    ///
    /// Unknown sources are ignored unless [`NetConfig::strict_injection`] is set. Returns whether
    /// the source accepted the value.
    #[tracing::instrument(level = "debug", skip(self, value))]
    pub fn inject(&mut self, source: &str, value: V) -> Result<bool> {
        let pl_id = match self.place_id(source) {
            Some(pl_id) if self.sources.contains(&pl_id) => pl_id,
            _ => {
                if self.config.strict_injection {
                    return Err(PetriError::UnknownSource(source.into()));
                }
                warn!(source, "Injection into unknown source ignored.");
                return Ok(false);
            }
        };
        self.forward(pl_id, value, 0)
    }

    /// Rebind the callback of an exit place.
    pub fn set_exit_callback(&mut self, place: &str, cb: ExitCallback<V>) -> Result<()> {
        let pl_id = self.place_id(place).ok_or_else(|| {
            PetriError::ConfigError(format!(
                "{place} exit value call back cannot be set, place does not exist."
            ))
        })?;
        let pl = &mut self.places[pl_id.0];
        if pl.kind() != PlaceKind::Exit {
            return Err(PetriError::ConfigError(format!(
                "{place} exit value call back cannot be set for a {} place.",
                pl.kind()
            )));
        }
        pl.set_exit_callback(cb);
        Ok(())
    }

    /// Restrict which values a place accepts.
    pub fn set_place_constraint<F>(&mut self, place: &str, constraint: F) -> Result<()>
    where
        F: Fn(&V) -> bool + Send + 'static,
    {
        let pl_id = self.place_id(place).ok_or_else(|| {
            PetriError::ConfigError(format!("Constraint for unknown place '{place}'."))
        })?;
        self.places[pl_id.0].set_constraint(Box::new(constraint));
        Ok(())
    }

    /// Attach a trace sink to every transition, or detach it with `None`.
    pub fn set_trace_sink(&mut self, sink: Option<Arc<dyn TraceSink<V>>>) {
        for tr in &mut self.transitions {
            tr.set_trace_sink(sink.clone());
        }
    }

    /// Empty every place and every enablement record.
    pub fn reset_all(&mut self) {
        self.places.iter_mut().for_each(|pl| pl.clear());
        self.transitions.iter_mut().for_each(|tr| tr.clear());
        debug!(places = self.places.len(), transitions = self.transitions.len(), "Net reset.");
    }

    fn forward(&mut self, pl_id: PlaceId, value: V, depth: usize) -> Result<bool> {
        if depth >= self.config.max_cascade_depth {
            return Err(PetriError::CascadeDepthExceeded(self.config.max_cascade_depth));
        }
        let value = match self.places[pl_id.0].forward(value) {
            Forwarded::Rejected => return Ok(false),
            Forwarded::Exited => return Ok(true),
            Forwarded::Stored(value) => value,
        };
        // Note: subscribers are fixed after building, the copy only releases the borrow
        let subscribers = self.places[pl_id.0].subscribers().to_vec();
        trace!(
            place = %self.places[pl_id.0].name(),
            ?value,
            subscribers = subscribers.len(),
            "Broadcasting."
        );
        for tr_id in subscribers {
            self.arrive(tr_id, pl_id, &value, depth)?;
        }
        Ok(true)
    }

    fn arrive(
        &mut self,
        tr_id: TransitionId,
        pl_id: PlaceId,
        value: &V,
        depth: usize,
    ) -> Result<()> {
        let tr = &mut self.transitions[tr_id.0];
        tr.on_arrival(pl_id, &mut self.places[pl_id.0], value);
        if !tr.is_enabled(&self.places) {
            return Ok(());
        }
        let firing = tr.fire();
        debug!(
            transition = %tr.label(),
            id = tr.id().0,
            value = ?firing.value,
            "Transition fired."
        );
        for out_id in firing.outputs {
            self.forward(out_id, firing.value.clone(), depth + 1)?;
        }
        Ok(())
    }
}
