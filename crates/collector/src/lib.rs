//! vcevidence collector - read-only vCenter compliance evidence.
//!
//! A run opens a session through an [`provider::InventoryProvider`],
//! captures an [`snapshot::InventorySnapshot`], evaluates the
//! [`registry::Registry`] against it and returns the resulting ledger.

pub mod audit;
pub mod engine;
pub mod events;
pub mod export;
pub mod fixture;
pub mod health;
pub mod provider;
pub mod registry;
pub mod report;
pub mod session;
pub mod settings;
pub mod snapshot;

pub use audit::{run_audit, AuditRun};
pub use engine::{Cancellation, Engine, RunOutcome};
pub use fixture::FixtureProvider;
pub use health::{health_check, HealthReport};
pub use provider::{ConnectOptions, Credentials, InventoryProvider, SessionProvider};
pub use registry::Registry;
pub use settings::{AuditSettings, SettingsOverrides};
