//! tally-engine
//!
//! Orchestration of the submission lifecycle:
//!
//! - [`reconcile`] — sibling search + peer comparison, recording links or
//!   discrepancies through the store
//! - [`publish`] — precondition-checked atomic deployment of a matched pair
//! - [`process_new_submission`] — the fire-and-forget task triggered by
//!   "submission id created", wiring outcomes to a [`NotificationSink`]
//!
//! The engine holds no state of its own; every mutation goes through a
//! [`tally_store::SubmissionStore`], which owns the transactional
//! guarantees. A storage failure aborts the attempt with statuses
//! unchanged, so a retry sees a consistent starting state.

mod notify;
mod publish;
mod reconcile;
mod tasks;

pub use notify::{NotificationSink, TracingSink};
pub use publish::publish;
pub use reconcile::{reconcile, ReconcileOutcome};
pub use tasks::process_new_submission;
