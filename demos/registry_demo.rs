//! Registry example demonstrating per-endpoint breakers.
//!
//! This example shows how to:
//! - Route calls for several endpoints through one registry
//! - Give a single endpoint its own configuration
//! - Tell blocked calls apart from operation errors
//! - Watch a breaker recover through half-open probes
//! - Read per-endpoint stats and the health summary
//!
//! Run with: cargo run --example registry_demo

use faultgate::events::emit_health_summary;
use faultgate::prelude::*;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A dependency that fails its first `failures` calls.
struct FlakyService {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyService {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    async fn fetch(&self) -> Result<String, io::Error> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            Err(io::Error::new(io::ErrorKind::TimedOut, format!("call {n} timed out")))
        } else {
            Ok(format!("payload #{n}"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "faultgate=debug".into()),
        )
        .init();

    println!("=== Breaker Registry Example ===\n");

    let registry = Arc::new(
        BreakerRegistry::builder()
            .with_default_config(BreakerConfig::default())
            .build()?,
    );

    let fast_recovery = BreakerConfigOverride::new()
        .failure_threshold(3)
        .recovery_timeout(Duration::from_millis(500))
        .success_threshold(2)
        .half_open_max_calls(2);

    let inventory = FlakyService::new(3);
    let pricing = FlakyService::new(0);

    println!("Sending requests to trigger the inventory breaker...\n");

    for i in 1..=6 {
        let result = registry
            .execute_with_override("inventory", &fast_recovery, || inventory.fetch())
            .await;

        match result {
            Ok(body) => println!("Request #{i}: ok ({body})"),
            Err(CallError::Blocked(blocked)) => {
                println!("Request #{i}: blocked ({blocked}), retry in {:?}", blocked.retry_in())
            }
            Err(CallError::Operation(e)) => println!("Request #{i}: failed ({e})"),
        }

        let _ = registry.execute("pricing", || pricing.fetch()).await;
    }

    println!("\nWaiting for the recovery timeout...");
    tokio::time::sleep(Duration::from_millis(600)).await;

    if let Some(breaker) = registry.get("inventory") {
        // Still open: the timeout is only checked when a call arrives.
        println!("State before next call: {}", breaker.state());
    }

    println!("\n=== Demonstrating Recovery ===\n");

    for i in 1..=2 {
        let result = registry.execute("inventory", || inventory.fetch()).await;
        let state = registry
            .get("inventory")
            .map(|b| b.state())
            .unwrap_or(CircuitState::Closed);
        println!("Probe #{i}: {:?}, state now {state}", result.map_err(|e| e.to_string()));
    }

    println!("\n=== Stats ===\n");

    for (endpoint, stats) in registry.stats_for_all() {
        println!(
            "{endpoint}: state={} calls={} failures={} rejected={} availability={:.1}%",
            stats.state,
            stats.total_calls,
            stats.total_failures,
            stats.rejected_calls,
            stats.availability
        );
    }

    let summary = registry.health_summary();
    emit_health_summary(&summary);
    println!(
        "\nHealthy: {}, unhealthy: {}, overall availability: {:.1}%",
        summary.healthy, summary.unhealthy, summary.overall_availability
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
