//! Observation of transition firings.
//!
//! A transition with a sink publishes two events per firing: `place-trace-pre` as soon as it is
//! enabled (carrying the values it is about to reduce) and `place-trace-post` after the reduction,
//! right before the result is forwarded. Sinks only observe, they cannot influence the cascade.
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc};
use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent<V> {
    Pre { label: String, record: Vec<(String, V)>, epoch_millis: u64 },
    Post { label: String, outputs: Vec<String>, epoch_millis: u64 },
}

impl<V> TraceEvent<V> {
    pub fn name(&self) -> &'static str {
        match self {
            TraceEvent::Pre { .. } => "place-trace-pre",
            TraceEvent::Post { .. } => "place-trace-post",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TraceEvent::Pre { label, .. } | TraceEvent::Post { label, .. } => label,
        }
    }

    pub fn epoch_millis(&self) -> u64 {
        match self {
            TraceEvent::Pre { epoch_millis, .. } | TraceEvent::Post { epoch_millis, .. } => {
                *epoch_millis
            }
        }
    }
}

pub trait TraceSink<V>: Send + Sync {
    fn publish(&self, event: TraceEvent<V>);
}

impl<V, F> TraceSink<V> for F
where
    F: Fn(TraceEvent<V>) + Send + Sync,
{
    fn publish(&self, event: TraceEvent<V>) {
        self(event)
    }
}

impl<V: Send> TraceSink<V> for mpsc::UnboundedSender<TraceEvent<V>> {
    fn publish(&self, event: TraceEvent<V>) {
        if self.send(event).is_err() {
            trace!("Trace receiver dropped, event discarded.");
        }
    }
}

impl<V: Clone + Send> TraceSink<V> for broadcast::Sender<TraceEvent<V>> {
    fn publish(&self, event: TraceEvent<V>) {
        if self.send(event).is_err() {
            trace!("No trace subscribers, event discarded.");
        }
    }
}

pub(crate) fn epoch_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        let pre = TraceEvent::<i64>::Pre { label: "t".into(), record: vec![], epoch_millis: 1 };
        let post = TraceEvent::<i64>::Post { label: "t".into(), outputs: vec![], epoch_millis: 2 };
        assert_eq!(pre.name(), "place-trace-pre");
        assert_eq!(post.name(), "place-trace-post");
        assert_eq!(post.label(), "t");
        assert_eq!(post.epoch_millis(), 2);
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel::<TraceEvent<i64>>();
        drop(rx);
        tx.publish(TraceEvent::Post { label: "t".into(), outputs: vec![], epoch_millis: 0 });
    }

    #[test]
    fn epoch_millis_is_current() {
        // 2020-01-01
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
