// Shared helpers for the integration tests. Each aggregator pulls this
// in as a submodule, so not every fixture is used from every test crate.
#![allow(dead_code)]

pub mod fixtures;
