use tally_schemas::Submission;

/// Outbound notification boundary.
///
/// One-way calls with infallible signatures: a sink that talks to an
/// external service must swallow (and log) its own failures — delivery
/// problems never affect submission state.
pub trait NotificationSink: Send + Sync {
    /// A submission arrived with nothing to compare against yet.
    fn no_siblings_found(&self, submission: &Submission);

    /// Reconciliation ran and every candidate disagreed.
    fn mismatch_found(&self, submission: &Submission, errors: &[String]);

    /// A matched pair was deployed.
    fn import_succeeded(&self, submission: &Submission);
}

/// Default sink: structured log events only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn no_siblings_found(&self, submission: &Submission) {
        tracing::info!(
            submission = %submission.id,
            owner = %submission.owner,
            region = %submission.region,
            date = %submission.report_date,
            "waiting for a second submission to compare against"
        );
    }

    fn mismatch_found(&self, submission: &Submission, errors: &[String]) {
        tracing::warn!(
            submission = %submission.id,
            owner = %submission.owner,
            region = %submission.region,
            discrepancies = errors.len(),
            "submission failed peer check"
        );
    }

    fn import_succeeded(&self, submission: &Submission) {
        tracing::info!(
            submission = %submission.id,
            owner = %submission.owner,
            region = %submission.region,
            date = %submission.report_date,
            "submission imported into canonical dataset"
        );
    }
}
