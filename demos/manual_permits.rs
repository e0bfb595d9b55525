//! Guarding synchronous code with permits.
//!
//! Some call sites cannot wrap their work in a closure, for example when the
//! outcome is only known after several steps. `try_acquire` hands out a
//! permit that is settled explicitly.
//!
//! Run with: cargo run --example manual_permits

use faultgate::{Breaker, BreakerConfig, CircuitState, ManualClock};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let clock = ManualClock::new();
    let config = BreakerConfig::new()
        .with_failure_threshold(2)
        .with_recovery_timeout(Duration::from_secs(30))
        .with_success_threshold(1)
        .with_half_open_max_calls(1);
    let breaker = Breaker::with_clock("ledger-db", config, Arc::new(clock.clone()));

    for step in ["begin", "write", "commit"] {
        match breaker.try_acquire() {
            Ok(permit) => {
                println!("{step}: admitted, failing it");
                permit.record_failure();
            }
            Err(blocked) => println!("{step}: {blocked}"),
        }
    }

    println!("\nAdvancing the clock past the recovery timeout\n");
    clock.advance(Duration::from_secs(30));

    let probe = match breaker.try_acquire() {
        Ok(permit) => permit,
        Err(blocked) => {
            println!("unexpectedly blocked: {blocked}");
            return;
        }
    };
    println!("probe admitted, state {}", breaker.state());
    println!("second caller: {:?}", breaker.try_acquire().err());

    probe.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
    println!("probe succeeded, state {}", breaker.state());

    println!("\n{:#?}", breaker.stats());
}
