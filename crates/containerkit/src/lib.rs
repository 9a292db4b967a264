//! # containerkit
//!
//! Reconcile declaratively built container definitions against a
//! systemd-nspawn host.
//!
//! This crate provides functionality for:
//! - Loading container names from a built definition tree
//! - Classifying each container as unchanged, system-only changed or changed
//! - Installing changed definitions as symlinks with gc-root anchors
//! - Starting, live-updating and restarting running containers
//! - Destroying and listing installed containers
//!
//! ## Example
//!
//! ```no_run
//! use containerkit::backend::nixos::NixosContainer;
//! use containerkit::backend::systemd::SystemdBackend;
//! use containerkit::{
//!     Actions, Backends, CompareConfig, Controller, Layout, RetryConfig, ThreadSleeper,
//! };
//! use std::path::Path;
//!
//! let layout = Layout::default();
//! let compare = CompareConfig::default();
//! let systemd = SystemdBackend::new("systemctl", "machinectl", layout.definitions.clone());
//! let runtime = NixosContainer::new("nixos-container");
//! let backends = Backends {
//!     services: &systemd,
//!     machines: &systemd,
//!     runtime: &runtime,
//!     sleeper: &ThreadSleeper,
//! };
//!
//! let controller = Controller::new(&layout, &compare, RetryConfig::default(), backends);
//! let actions = Actions { update: true, ..Default::default() };
//! let report = controller
//!     .reconcile(Path::new("/nix/store/...-containers"), actions)
//!     .expect("reconcile failed");
//! println!("restarted: {:?}", report.plan.restart);
//! ```

pub mod backend;
pub mod compare;
pub mod conf;
pub mod destroy;
pub mod error;
pub mod install;
pub mod inventory;
pub mod layout;
pub mod lifecycle;
pub mod loader;
pub mod lock;
pub mod terminate;
pub mod types;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use compare::Comparison;
pub use conf::CompareConfig;
pub use error::{Error, ErrorCategory, Result};
pub use layout::{DefinitionLayout, HostLayout, Layout};
pub use lifecycle::{Backends, Controller, PassReport};
pub use lock::{HostLock, require_root};
pub use terminate::{Sleeper, ThreadSleeper};
pub use types::{
    Actions, ChangeClass, ContainerName, ReconciliationPlan, RetryConfig, RunStatus,
};
