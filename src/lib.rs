//! Fusion Control
//!
//! Declarative management of Pure Storage Fusion resources: converge a
//! storage service, tenant or tenant space to a desired state, wait for the
//! asynchronous operation each change starts, and gather read-only inventory.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         fusion-ctl CLI                       │
//! ├────────────────────────────┬─────────────────────────────────┤
//! │   Reconciler               │   Inventory Aggregator          │
//! │   read → plan → mutate     │   zones / tenants / spaces      │
//! │            │               │                                 │
//! │   Operation Poller         │                                 │
//! ├────────────┴───────────────┴─────────────────────────────────┤
//! │        ResourceApi  ·  OperationsApi  ·  InventoryApi        │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │    FusionClient (HTTP)       │    MemoryFusion (in-process)  │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`client`]: HTTP and in-memory implementations of the API ports
//! - [`declaration`]: YAML/JSON resource declarations
//! - [`domain`]: Resource categories, scopes, operations and API ports
//! - [`error`]: Error types and handling
//! - [`inventory`]: Inventory report subsets and aggregation
//! - [`reconcile`]: Desired-state reconciler and operation poller
//! - [`resources`]: Managed resource kinds

pub mod client;
pub mod declaration;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod reconcile;
pub mod resources;

// Re-export commonly used types
pub use client::{ClientConfig, FusionClient, MemoryFusion};

pub use declaration::ResourceDeclaration;

pub use domain::ports::{
    InventoryApi, Operation, OperationError, OperationStatus, OperationsApi, ResourceApi,
    ResourceCategory, Scope,
};

pub use error::{Error, Result};

pub use inventory::{Inventory, InventoryAggregator, Subset};

pub use reconcile::{
    Action, DesiredState, OperationPoller, PollerConfig, ReconcileOptions, ReconcileOutcome,
    Reconciler,
};

pub use resources::{
    HardwareType, ManagedResource, PatchSet, StorageServiceSpec, TenantSpaceSpec, TenantSpec,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
