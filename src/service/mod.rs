pub mod audit_log;
pub mod import;
pub mod pricing;
pub mod reconcile;
pub mod worker;

pub use reconcile::{ReconcileEngine, SyncEvent};
pub use worker::{spawn_sync, SyncHandle, SyncJob, SyncResult};
