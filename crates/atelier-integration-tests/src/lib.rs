//! Integration test crate for the Atelier BYOK subsystem.
//!
//! The library part only carries shared test support; the actual tests
//! live in `tests/` and exercise end-to-end flows across the workspace
//! crates (vault round-trips, catalog refresh, job lifecycle).
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p atelier-integration-tests
//! ```

pub mod support;
