//! kubeplay - an interactive scripting shell for Kubernetes
//!
//! Cluster resources are exposed to an embedded [rhai] script engine as
//! classes generated from JSON descriptors: `pods.get("default")` lists pods,
//! `pods[0].logs` reads a pod's logs, and so on.
//!
//! - [`resource`] - resource descriptors and the API seam
//! - [`kube`] - live cluster client
//! - [`binding`] - script classes generated per resource kind
//! - [`script`] - the rhai engine adapter
//! - [`repl`] - the read-eval-print loop and its terminal host

pub mod binding;
pub mod config;
pub mod error;
pub mod kube;
pub mod repl;
pub mod resource;
pub mod script;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Version injected at compile time via KUBEPLAY_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("KUBEPLAY_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
