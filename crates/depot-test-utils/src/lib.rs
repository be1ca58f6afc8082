//! Test utilities for Depot.
//!
//! This crate provides scripted stand-ins for native content providers so the
//! package and handle layers can be tested without real I/O.
//!
//! # Overview
//!
//! - [`MockBackend`] - An in-memory catalog or bundle provider that records
//!   every call and hands out controllable operations
//! - [`MockOperation`] / [`OpProbe`] - A native operation and the test-side
//!   switch that completes or fails it
//! - [`MockDownload`] / [`DownloadProbe`] - A download whose bytes arrive only
//!   when the test pumps them
//! - [`run_ticked`] - Drives a tick-polled future from a synchronous test
//!
//! # Example
//!
//! ```rust
//! use depot_assets::{AssetModule, CatalogOptions, InitOptions, ModuleConfig, Provider};
//! use depot_test_utils::{MockBackend, run_ticked};
//!
//! let mut module = AssetModule::new();
//! module.initialize(ModuleConfig::default());
//!
//! let backend = MockBackend::catalog().with_asset("hero.prefab", String::from("hero"));
//! let package = module
//!     .create_package("main", Provider::managed_catalog(backend.clone()))
//!     .unwrap();
//!
//! let options = InitOptions::ManagedCatalog(CatalogOptions::default());
//! assert!(run_ticked(module.context(), package.initialize_async(options)));
//!
//! let handle = package.load_asset_sync::<String>("hero.prefab").unwrap();
//! assert_eq!(handle.asset().as_deref().map(String::as_str), Some("hero"));
//! handle.dispose();
//! assert_eq!(backend.total_releases(), 2);
//! ```
//!
//! # Design Philosophy
//!
//! Mocks share their state with probes through `Arc`, so a test keeps control
//! of an operation after handing ownership of it to a handle. Every mock uses
//! interior mutability and records calls from `&self`.

pub mod backend;
pub mod download;
pub mod executor;
pub mod operation;

pub use backend::{BackendCall, MockBackend};
pub use download::{DownloadProbe, JobState, MockDownload, RemoteFile};
pub use executor::{MAX_TICKS, poll_now, run_ticked, run_ticked_with};
pub use operation::{MockInstance, MockOperation, MockScene, MockValue, OpProbe};
