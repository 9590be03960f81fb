//! Resource abstraction layer
//!
//! This module provides a data-driven description of the Kubernetes kinds
//! exposed to scripts. Descriptors are loaded from JSON files at compile
//! time, so a new kind only needs a JSON entry.
//!
//! # Architecture
//!
//! - [`api`] - The [`ResourceApi`] seam the binding layer calls into
//! - [`registry`] - Loads and caches resource class descriptors
//! - [`fetcher`] - Standard list callback and dot-path field helpers
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `common.json` - Fields every kind exposes (name, labels, age, ...)
//! - `core.json` - Core group kinds (pods, services, nodes, ...)
//! - `apps.json` - `apps/v1` workloads (deployments, statefulsets, ...)

pub mod api;
mod fetcher;
mod registry;

pub use api::{
    is_all_namespaces, ApiResource, ItemIdentity, ListOptions, LogOptions, ResourceApi,
    ResourceList,
};
pub use fetcher::{assign_path, fetch_items, format_age, lookup_path};
pub use registry::*;
