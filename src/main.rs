use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orchard_es::domain::orchard::{OrchardAggregate, OrchardCommandHandler, OrchardEvent};
use orchard_es::{AggregateRoot, InMemoryEventStore, Outcome};

// Minimal host wiring the in-memory store through the command handler and
// the replay engine. A real application brings its own backend behind the
// stream contracts.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,orchard_es=debug")),
        )
        .init();

    tracing::info!("🌳 orchard event sourcing demo");

    let store = Arc::new(InMemoryEventStore::<OrchardEvent>::new());
    let handler = OrchardCommandHandler::new(store);

    let (orchard_id, version) = handler.create("smith's orchard").await?;
    tracing::info!(%orchard_id, version, "orchard planted");

    for species in ["maple", "orange", "apple"] {
        let version = handler.add_tree(orchard_id, species).await?;
        tracing::info!(species, version, "tree added");
    }

    let orchard = handler.get(orchard_id).await?;
    tracing::info!(
        name = %orchard.name,
        trees = orchard.trees.len(),
        version = orchard.version(),
        "rehydrated from stream"
    );

    // Commands compose through Outcome; a blank species fails the chain
    // without unwinding and without buffering the later steps.
    let chained = OrchardAggregate::create("chained orchard")
        .then(|o| o.add_tree("maple"))
        .then(|o| o.add_tree(""))
        .then(|o| o.add_tree("apple"));
    match chained {
        Outcome::Success(_) => tracing::info!("chain succeeded"),
        Outcome::Failure(failure) => tracing::warn!(%failure, "command chain rejected"),
    }

    Ok(())
}
