//! Capacity-aware cluster rebalancing engine.
//!
//! Five cooperating components, leaves first: [`client`] (the injectable
//! ClusterClient capability), [`inventory`] (the Collector), [`model`] (the
//! Balance Model), [`planner`] (the Rebalance Planner), and [`supervisor`]
//! (the Migration Supervisor). See the crate's `SPEC_FULL.md` for the full
//! design.

pub mod client;
pub mod inventory;
pub mod model;
pub mod planner;
pub mod snapshot;
pub mod supervisor;

pub use client::ClusterClient;
pub use inventory::{CollectResult, CollectWarning, InventoryCollector};
pub use model::{BalanceModel, Classification};
pub use planner::{Migration, PassResult, RebalancePlanner, Summary};
pub use snapshot::ClusterSnapshot;
pub use supervisor::{MigrationOutcome, MigrationSupervisor};
