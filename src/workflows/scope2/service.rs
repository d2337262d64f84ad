use std::sync::Arc;

use tracing::warn;

use super::domain::{
    Submission, SubmissionForm, SubmissionId, SubmissionStatus, ValidationError,
};
use super::notify::{Notifier, NotifySettings};
use super::store::{StorageError, SubmissionStore};
use super::transport::MailTransport;

/// The approval workflow: intake, the PENDING → APPROVED | REJECTED state
/// machine, and the notification side effects tied to each transition.
pub struct Scope2AssessmentService<S, M> {
    store: Arc<S>,
    notifier: Notifier<M>,
}

impl<S, M> Scope2AssessmentService<S, M>
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(store: Arc<S>, transport: Arc<M>, settings: NotifySettings) -> Self {
        Self {
            store,
            notifier: Notifier::new(transport, settings),
        }
    }

    /// Accept a questionnaire payload: validate, persist as PENDING, then
    /// notify the admin. The admin notification is best-effort; a send
    /// failure is logged and the submission stays accepted.
    pub fn submit(&self, form: SubmissionForm) -> Result<Submission, Scope2ServiceError> {
        let fields = form.validate()?;
        let record = self.store.insert(Submission::pending(fields))?;

        if let Err(err) = self.notifier.admin_submitted(&record) {
            warn!(
                submission_id = %record.id,
                error = %err,
                "admin notification failed; submission remains accepted"
            );
        }

        Ok(record)
    }

    /// Drive one state-machine transition.
    ///
    /// The status change is authoritative once persisted: a storage error
    /// aborts before any notification, while a notification failure after
    /// the write is logged and swallowed.
    pub fn transition(
        &self,
        id: &SubmissionId,
        target: SubmissionStatus,
        reason: Option<String>,
    ) -> Result<Submission, Scope2ServiceError> {
        if !target.is_terminal() {
            return Err(Scope2ServiceError::IllegalTransition {
                from: SubmissionStatus::Pending,
                to: target,
            });
        }

        let current = self
            .store
            .fetch(id)?
            .ok_or_else(|| Scope2ServiceError::NotFound(id.clone()))?;

        // Terminal states accept no further transitions, including repeats
        // of the same target, so side effects fire exactly once.
        if current.status.is_terminal() {
            return Err(Scope2ServiceError::IllegalTransition {
                from: current.status,
                to: target,
            });
        }

        let updated = self.store.update_status(id, target, reason.clone())?;

        match updated.contact_email() {
            Some(email) => {
                let outcome = match target {
                    SubmissionStatus::Approved => self.notifier.approved(email, &updated),
                    SubmissionStatus::Rejected => {
                        self.notifier.rejected(email, &updated, reason.as_deref())
                    }
                    SubmissionStatus::Pending => unreachable!("guarded above"),
                };
                if let Err(err) = outcome {
                    warn!(
                        submission_id = %updated.id,
                        status = target.label(),
                        error = %err,
                        "transition notification failed; status change already persisted"
                    );
                }
            }
            None => {
                warn!(
                    submission_id = %updated.id,
                    status = target.label(),
                    "no contact email on submission; skipping transition notification"
                );
            }
        }

        Ok(updated)
    }

    pub fn get(&self, id: &SubmissionId) -> Result<Submission, Scope2ServiceError> {
        self.store
            .fetch(id)?
            .ok_or_else(|| Scope2ServiceError::NotFound(id.clone()))
    }

    /// Submissions awaiting review, oldest first.
    pub fn pending(&self, limit: usize) -> Result<Vec<Submission>, Scope2ServiceError> {
        Ok(self.store.pending(limit)?)
    }
}

/// Error raised by the assessment workflow.
#[derive(Debug, thiserror::Error)]
pub enum Scope2ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("submission '{0}' not found")]
    NotFound(SubmissionId),
    #[error("illegal transition from {} to {}", from.label(), to.label())]
    IllegalTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}
