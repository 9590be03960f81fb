//! Kubernetes API interaction module
//!
//! This module provides the live implementation of the resource API the
//! script bindings consume: cluster configuration, the HTTP transport and
//! the list/logs client.
//!
//! # Module Structure
//!
//! - [`auth`] - kubeconfig parsing and in-cluster service account
//! - [`http`] - HTTP utilities for REST API calls
//! - [`client`] - List with pagination, pod logs, blocking adapter
//!
//! # Example
//!
//! ```ignore
//! use kubeplay::kube::{ClusterConfig, KubeClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let cluster = ClusterConfig::discover(None, None)?;
//!     let client = KubeClient::new(cluster)?;
//!     let pods = kubeplay::resource::get_resource("pods").unwrap();
//!     let list = client.list(&pods.api, "default", &Default::default()).await?;
//!     println!("{} pods", list.items.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use auth::{Auth, ClusterConfig, Kubeconfig};
pub use client::{KubeApi, KubeClient};
