//! Supplier sync pipeline: aggregation, image storage, and catalog
//! reconciliation driven by [`SyncOrchestrator`].

pub mod image;
pub mod orchestrator;
pub mod reconcile;
pub mod report;

pub use image::{extension_for, ImageError, ImageOutcome, ImageSink};
pub use orchestrator::{SyncError, SyncOrchestrator, SyncPreview, SyncSettings};
pub use reconcile::{CatalogAction, ReconcileError, Reconciled, Reconciler};
pub use report::{FailureKind, FailureScope, SyncFailure, SyncReport};
