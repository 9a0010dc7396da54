//! Shared runtime state for tally-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The store and sink
//! are held behind trait objects so the scenario tests can swap in the
//! in-memory store from tally-testkit.

use std::sync::Arc;

use tally_engine::NotificationSink;
use tally_store::SubmissionStore;

pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub sink: Arc<dyn NotificationSink>,
}

impl AppState {
    pub fn new(store: Arc<dyn SubmissionStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }
}
