//! Test doubles shared by unit and integration tests
//!
//! Compiled for this crate's own tests and behind the `test-utils` feature.

mod api;
mod host;

pub use api::{pod, pod_with_containers, ListCall, MockApi};
pub use host::TestHost;
