//! Test utilities for GraphLite Analytics integration tests
//!
//! - graph_fixture: small hand-built graphs and seeded random graphs

#![allow(dead_code)]

pub mod graph_fixture;

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
