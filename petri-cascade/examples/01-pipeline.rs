use std::sync::Arc;

use petri_cascade::{
    error::Result as PetriResult,
    net::PetriNetBuilder,
    registry::FunctionRegistry,
    trace::TraceEvent,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Net used by this example:
///
///   orders ───┐
///   payments ─┼──► ship ──► shipped
///   blocked ──┘ (inhibits 'ship')
///      ▲
///   maintenance ──► lock
///
/// 'ship' fires once an order and a payment arrived, unless 'blocked' holds a token.
const NET: &str = r#"{
    "places": [
        { "id": "orders", "kind": "source" },
        { "id": "payments", "kind": "source" },
        { "id": "maintenance", "kind": "source" },
        { "id": "blocked", "kind": "inhibit", "inhibits": "ship" },
        { "id": "shipped", "kind": "exit" }
    ],
    "transitions": [
        { "label": "lock", "inputs": ["maintenance"], "outputs": ["blocked"] },
        { "label": "ship", "inputs": ["orders", "payments", "blocked"], "outputs": ["shipped"],
          "reduction": { "reducer": "max", "init_accumulator": 0 } }
    ]
}"#;

#[tracing::instrument(level = "info")]
async fn run() -> PetriResult<()> {
    // exit values and trace events are consumed by their own tasks
    let (shipped_tx, mut shipped_rx) = mpsc::unbounded_channel::<i64>();
    let shipped = tokio::spawn(async move {
        while let Some(value) = shipped_rx.recv().await {
            info!(value, "Shipped.");
        }
    });
    let (trace_tx, mut trace_rx) = broadcast::channel::<TraceEvent<i64>>(64);
    let traces = tokio::spawn(async move {
        while let Ok(evt) = trace_rx.recv().await {
            info!(event = evt.name(), transition = evt.label(), millis = evt.epoch_millis());
        }
    });

    let mut functions = FunctionRegistry::new();
    functions.register_exit("shipped", move || {
        let tx = shipped_tx.clone();
        move |value: i64| {
            if tx.send(value).is_err() {
                warn!(value, "Nobody receives shipped values.");
            }
        }
    });
    functions.register_reducer("max", |a: i64, b: i64| a.max(b));

    let mut net = PetriNetBuilder::from_json(NET)?.build(&functions, None)?;
    net.set_trace_sink(Some(Arc::new(trace_tx)));

    net.inject("orders", 3)?;
    net.inject("payments", 7)?;

    net.inject("maintenance", 1)?;
    net.inject("orders", 5)?;
    net.inject("payments", 2)?;
    info!(marking = ?net.marking(), "Blocked by maintenance.");

    net.reset_all();
    net.inject("orders", 4)?;
    net.inject("payments", 1)?;

    // closes both channels
    drop(net);
    drop(functions);
    let _ = tokio::join!(shipped, traces);

    info!("Bye.");
    Ok(())
}

#[tokio::main]
async fn main() -> PetriResult<()> {
    // set up logging
    tracing_subscriber::fmt()
        .with_span_events(
            tracing_subscriber::fmt::format::FmtSpan::CLOSE
                | tracing_subscriber::fmt::format::FmtSpan::NEW,
        )
        .compact()
        .with_env_filter(EnvFilter::try_new("info,petri_cascade=debug").unwrap())
        .init();

    return run().await;
}
