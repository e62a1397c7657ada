//! Test support shared by the unit tests.
//!
//! [`builder`] is also included by the integration tests and benches through `#[path]`, so it
//! must not depend on anything in this crate.
