use std::sync::{Arc, Mutex};

use petri_cascade::{
    net::{PetriNet, PetriNetBuilder, PlaceKind, Token},
    registry::FunctionRegistry,
    trace::{TraceEvent, TraceSink},
};
use tracing_subscriber::EnvFilter;

type Log<T> = Arc<Mutex<Vec<T>>>;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registry whose exit callbacks append `(exit id, value)` to `log`.
fn collecting<V: Token>(exits: &[&str], log: &Log<(String, V)>) -> FunctionRegistry<V> {
    let mut functions = FunctionRegistry::new();
    for &exit in exits {
        let log = Arc::clone(log);
        let name = exit.to_string();
        functions.register_exit(exit, move || {
            let log = Arc::clone(&log);
            let name = name.clone();
            move |v: V| log.lock().unwrap().push((name.clone(), v))
        });
    }
    functions.register_checker("positive", |v: &V, _| v.units() > 0);
    functions
}

fn values<V: Clone>(log: &Log<(String, V)>) -> Vec<V> {
    log.lock().unwrap().iter().map(|(_, v)| v.clone()).collect()
}

fn two_input_net(log: &Log<(String, i64)>) -> PetriNet<i64> {
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("a", PlaceKind::Source);
    builder.insert_place("b", PlaceKind::Source);
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_transition("t", ["a", "b"], ["exit"]);
    builder.build(&collecting(&["exit"], log), None).unwrap()
}

#[test]
fn single_injection_flows_to_exit() {
    init_logging();
    let log: Log<(String, i64)> = Default::default();
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("S", PlaceKind::Source);
    builder.insert_place("P", PlaceKind::Internal);
    builder.insert_place("Exit", PlaceKind::Exit);
    builder.insert_transition("T1", ["S"], ["P"]);
    builder.insert_transition("T2", ["P"], ["Exit"]);
    let mut net = builder.build(&collecting(&["Exit"], &log), None).unwrap();

    net.inject("S", 5).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![("Exit".to_string(), 5)]);
}

#[test]
fn fires_once_all_inputs_arrived() {
    init_logging();
    let log = Default::default();
    let mut net = two_input_net(&log);
    net.inject("a", 2).unwrap();
    assert!(values(&log).is_empty());
    net.inject("b", 3).unwrap();
    assert_eq!(values(&log), vec![5]);
}

#[test]
fn arrival_order_does_not_matter() {
    let log = Default::default();
    let mut net = two_input_net(&log);
    net.inject("b", 3).unwrap();
    net.inject("a", 2).unwrap();
    assert_eq!(values(&log), vec![5]);
}

#[test]
fn repeated_input_is_not_counted_twice() {
    let log = Default::default();
    let mut net = two_input_net(&log);
    net.inject("a", 2).unwrap();
    net.inject("a", 2).unwrap();
    net.inject("b", 3).unwrap();
    assert_eq!(values(&log), vec![5]);

    // the record was cleared, the next window starts empty
    net.inject("b", 3).unwrap();
    assert_eq!(values(&log), vec![5]);
    net.inject("a", 1).unwrap();
    assert_eq!(values(&log), vec![5, 4]);
}

#[test]
fn last_value_wins_before_firing() {
    let log = Default::default();
    let mut net = two_input_net(&log);
    net.inject("a", 2).unwrap();
    net.inject("a", 7).unwrap();
    net.inject("b", 3).unwrap();
    assert_eq!(values(&log), vec![10]);
}

#[test]
fn default_reduction_sums() {
    let log: Log<(String, i64)> = Default::default();
    let mut builder = PetriNetBuilder::new();
    for src in ["x", "y", "z"] {
        builder.insert_place(src, PlaceKind::Source);
    }
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_transition("sum", ["x", "y", "z"], ["exit"]);
    let mut net = builder.build(&collecting(&["exit"], &log), None).unwrap();
    net.inject("z", 4).unwrap();
    net.inject("x", 2).unwrap();
    net.inject("y", 3).unwrap();
    assert_eq!(values(&log), vec![9]);
}

#[test]
fn overflowing_sum_saturates() {
    let log = Default::default();
    let mut net = two_input_net(&log);
    net.inject("a", i64::MAX).unwrap();
    net.inject("b", 1).unwrap();
    assert_eq!(values(&log), vec![i64::MAX]);
}

#[test]
fn zero_seed_is_honoured() {
    let log: Log<(String, i64)> = Default::default();
    let mut functions = collecting(&["exit"], &log);
    functions.register_reducer("max", |a: i64, b: i64| a.max(b));
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("a", PlaceKind::Source);
    builder.insert_place("b", PlaceKind::Source);
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_transition("t", ["a", "b"], ["exit"]).with_reduction("max", 0);
    let mut net = builder.build(&functions, None).unwrap();
    net.inject("a", -3).unwrap();
    net.inject("b", -1).unwrap();
    assert_eq!(values(&log), vec![0]);
}

/// g -> fill -> i, where i inhibits 'L'; L reads a and i.
fn inhibited_net(log: &Log<(String, i64)>, with_drain: bool) -> PetriNet<i64> {
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("a", PlaceKind::Source);
    builder.insert_place("g", PlaceKind::Source);
    builder.insert_inhibitor("i", "L");
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_place("drained", PlaceKind::Exit);
    builder.insert_transition("fill", ["g"], ["i"]);
    builder.insert_transition("L", ["a", "i"], ["exit"]);
    if with_drain {
        builder.insert_transition("M", ["i"], ["drained"]);
    }
    builder.build(&collecting(&["exit", "drained"], log), None).unwrap()
}

#[test]
fn inhibitor_blocks_while_holding_a_resource() {
    init_logging();
    let log = Default::default();
    let mut net = inhibited_net(&log, false);

    net.inject("a", 1).unwrap();
    assert_eq!(values(&log), vec![1]);

    net.inject("g", 1).unwrap();
    assert_eq!(net.place("i").unwrap().count(), 1);
    net.inject("a", 2).unwrap();
    assert_eq!(values(&log), vec![1]);

    net.reset_all();
    net.inject("a", 3).unwrap();
    assert_eq!(values(&log), vec![1, 3]);
}

#[test]
fn other_labels_see_plain_presence() {
    let log = Default::default();
    let mut net = inhibited_net(&log, true);

    // M consumes from 'i' as a plain input, which empties it again
    net.inject("g", 1).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![("drained".to_string(), 1)]);
    assert_eq!(net.place("i").unwrap().count(), 0);
    assert!(net.place("i").unwrap().has_resource("L"));
    assert!(!net.place("i").unwrap().has_resource("M"));

    net.inject("a", 4).unwrap();
    assert_eq!(log.lock().unwrap().last(), Some(&("exit".to_string(), 4)));
}

#[test]
fn reset_allows_identical_replay() {
    let log: Log<(String, i64)> = Default::default();
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("a", PlaceKind::Source);
    builder.insert_place("b", PlaceKind::Source);
    builder.insert_place("ab", PlaceKind::Internal);
    builder.insert_place("c", PlaceKind::Source);
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_transition("join", ["a", "b"], ["ab"]);
    builder.insert_transition("final", ["ab", "c"], ["exit"]);
    let mut net = builder.build(&collecting(&["exit"], &log), None).unwrap();

    let sequence = [("a", 1), ("c", 10), ("b", 2), ("a", 5), ("b", 5), ("c", 1), ("a", 7)];
    let run = |net: &mut PetriNet<i64>| {
        for (source, value) in sequence {
            net.inject(source, value).unwrap();
        }
        net.marking()
    };

    let first_marking = run(&mut net);
    let first = values(&log);
    assert_eq!(first, vec![13, 11]);

    net.reset_all();
    log.lock().unwrap().clear();
    let second_marking = run(&mut net);
    assert_eq!(values(&log), first);
    assert_eq!(second_marking, first_marking);
}

#[test]
fn filtered_arrivals_are_dropped_silently() {
    let log: Log<(String, i64)> = Default::default();
    let functions = collecting(&["exit"], &log);
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("a", PlaceKind::Source);
    builder.insert_place("b", PlaceKind::Source);
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_transition("t", ["a", "b"], ["exit"]).with_value_checking("a", "positive");
    let mut net = builder.build(&functions, Some(&functions)).unwrap();

    net.inject("a", -1).unwrap();
    net.inject("b", 3).unwrap();
    assert!(values(&log).is_empty());
    net.inject("a", 2).unwrap();
    assert_eq!(values(&log), vec![5]);
}

#[test]
fn fan_out_follows_registration_order() {
    let log: Log<(String, i64)> = Default::default();
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("s", PlaceKind::Source);
    builder.insert_place("p1", PlaceKind::Internal);
    builder.insert_place("p2", PlaceKind::Internal);
    builder.insert_place("e1", PlaceKind::Exit);
    builder.insert_place("e2", PlaceKind::Exit);
    builder.insert_transition("split", ["s"], ["p2", "p1"]);
    builder.insert_transition("t1", ["p1"], ["e1"]);
    builder.insert_transition("t2", ["p2"], ["e2"]);
    let mut net = builder.build(&collecting(&["e1", "e2"], &log), None).unwrap();

    net.inject("s", 6).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![("e2".to_string(), 6), ("e1".to_string(), 6)]);
}

#[test]
fn trace_events_precede_forwarding() {
    let log: Log<String> = Default::default();
    let mut functions = FunctionRegistry::new();
    let exit_log = Arc::clone(&log);
    functions.register_exit("exit", move || {
        let log = Arc::clone(&exit_log);
        move |v: i64| log.lock().unwrap().push(format!("exit:{v}"))
    });
    let mut builder = PetriNetBuilder::new();
    builder.insert_place("s", PlaceKind::Source);
    builder.insert_place("p", PlaceKind::Internal);
    builder.insert_place("exit", PlaceKind::Exit);
    builder.insert_transition("t1", ["s"], ["p"]);
    builder.insert_transition("t2", ["p"], ["exit"]);
    let mut net = builder.build(&functions, None).unwrap();

    let sink_log = Arc::clone(&log);
    let sink: Arc<dyn TraceSink<i64>> = Arc::new(move |evt: TraceEvent<i64>| {
        sink_log.lock().unwrap().push(format!("{}:{}", evt.name(), evt.label()))
    });
    net.set_trace_sink(Some(sink));
    net.inject("s", 5).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "place-trace-pre:t1",
            "place-trace-post:t1",
            "place-trace-pre:t2",
            "place-trace-post:t2",
            "exit:5"
        ]
    );

    net.set_trace_sink(None);
    log.lock().unwrap().clear();
    net.inject("s", 1).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["exit:1"]);
}

#[tokio::test]
async fn traces_reach_an_async_consumer() {
    let log: Log<(String, i64)> = Default::default();
    let mut net = two_input_net(&log);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<TraceEvent<i64>>();
    net.set_trace_sink(Some(Arc::new(tx)));

    let consumer = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(evt) = rx.recv().await {
            events.push(evt);
        }
        events
    });

    net.inject("a", 2).unwrap();
    net.inject("b", 3).unwrap();
    drop(net);

    let events = consumer.await.unwrap();
    assert_eq!(events.len(), 2);
    match &events[0] {
        TraceEvent::Pre { label, record, epoch_millis } => {
            assert_eq!(label, "t");
            assert_eq!(record, &vec![("a".to_string(), 2), ("b".to_string(), 3)]);
            assert!(*epoch_millis > 0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[1] {
        TraceEvent::Post { outputs, .. } => assert_eq!(outputs, &vec!["exit".to_string()]),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(events[0].epoch_millis() <= events[1].epoch_millis());
}

#[derive(Clone, Debug, PartialEq)]
struct Order {
    ids: Vec<u32>,
    quantity: i64,
}

impl Token for Order {
    fn zero() -> Self {
        Order { ids: Vec::new(), quantity: 0 }
    }

    fn sum(mut self, other: Self) -> Self {
        self.ids.extend(other.ids);
        self.quantity += other.quantity;
        self
    }

    fn units(&self) -> u64 {
        1
    }
}

#[test]
fn structured_tokens_in_queues() {
    let log: Log<(String, Order)> = Default::default();
    let mut builder = PetriNetBuilder::<Order>::new();
    builder.insert_place("orders", PlaceKind::Source).variant = Some("queue".into());
    builder.insert_place("stock", PlaceKind::Source).variant = Some("queue".into());
    builder.insert_place("shipped", PlaceKind::Exit);
    builder.insert_transition("ship", ["orders", "stock"], ["shipped"]);
    let mut net = builder.build(&collecting(&["shipped"], &log), None).unwrap();

    net.inject("orders", Order { ids: vec![1], quantity: 3 }).unwrap();
    net.inject("stock", Order { ids: vec![9], quantity: -3 }).unwrap();
    assert_eq!(values(&log), vec![Order { ids: vec![1, 9], quantity: 0 }]);
    // the queues handed their tokens to the transition
    assert_eq!(net.place("orders").unwrap().count(), 0);
    assert_eq!(net.place("stock").unwrap().count(), 0);
}
