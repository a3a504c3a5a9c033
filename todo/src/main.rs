//! Walkthrough of the listing and creation screens against in-memory storage.
//!
//! Timings come from `TODO_*` environment variables (see `todo::config`);
//! for a quick run try `TODO_SEARCH_DEBOUNCE_MS=200 TODO_SUBMIT_DELAY_MS=300`.

use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use todo::{
    CreationController, FailureSignal, InMemoryTodoRepository, ListingController, TodoConfig,
};
use todoshub_runtime::metrics::MetricsRecorder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_snapshot<T: Serialize>(label: &str, state: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(state).context("serializing snapshot")?;
    println!("{label}:\n{json}\n");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo=debug,todoshub_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let recorder = MetricsRecorder::install()?;
    let config = TodoConfig::from_env()?;

    println!("=== Todoshub ===\n");
    println!(
        "search debounce {:?}, submit delay {:?}\n",
        config.search_debounce, config.submit_delay
    );

    let repository = Arc::new(InMemoryTodoRepository::seeded([
        "Walk 10 mins",
        "Water the plants",
    ]));
    let failures = FailureSignal::new();

    // Listing screen
    let listing = ListingController::new(repository.clone(), &config);
    listing.fetch_all().await?.wait().await;
    print_snapshot("Listing after fetch", &listing.snapshot().await)?;

    // Only the last keystroke within the quiet period is applied
    listing.on_search_query_change("w").await?;
    listing.on_search_query_change("wa").await?;
    listing.on_search_query_change("walk").await?.wait().await;
    print_snapshot("Listing after searching \"walk\"", &listing.snapshot().await)?;
    listing.teardown().await?;

    // Creation screen: empty draft, then a real todo
    let creation = CreationController::new(repository.clone(), &config);
    let outcome = creation.submit(|| {}, failures.raiser()).await?;
    println!("Empty submit: {outcome:?}");
    print_snapshot("Creation after empty submit", &creation.snapshot().await)?;

    creation.on_todo_value_change("Buy milk").await?;
    let outcome = creation
        .submit(|| println!("Saved \"Buy milk\""), failures.raiser())
        .await?;
    println!("Submit: {outcome:?}\n");

    // The sentinel forces the failure path without touching storage
    creation.on_todo_value_change("ERROR").await?;
    let outcome = creation
        .submit(|| println!("unexpected success"), failures.raiser())
        .await?;
    println!("Sentinel submit: {outcome:?}\n");
    creation.teardown().await?;

    // Back on a fresh listing screen the failure shows up as a popup
    let listing = ListingController::new(repository.clone(), &config);
    let shown = failures.deliver_to(&listing).await?;
    println!("Error popup delivered: {shown}");
    listing.fetch_all().await?.wait().await;
    print_snapshot("Listing on return", &listing.snapshot().await)?;
    listing.dismiss_error_popup().await?;
    listing.teardown().await?;

    println!("Stored todos: {}", repository.records().len());

    if let Some(rendered) = recorder.render() {
        println!("\n=== Metrics ===\n{rendered}");
    }

    println!("=== Demo Complete ===");
    Ok(())
}
