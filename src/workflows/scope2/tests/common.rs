use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::scope2::domain::{Submission, SubmissionForm, SubmissionId, SubmissionStatus};
use crate::workflows::scope2::emissions::DEFAULT_GRID_EMISSION_FACTOR;
use crate::workflows::scope2::notify::NotifySettings;
use crate::workflows::scope2::store::{MemoryStore, StorageError, SubmissionStore};
use crate::workflows::scope2::transport::{MailTransport, NotificationError, OutboundEmail};
use crate::workflows::scope2::Scope2AssessmentService;

pub(super) const ADMIN_EMAIL: &str = "admin@sustally.com";

pub(super) fn settings() -> NotifySettings {
    NotifySettings {
        admin_email: ADMIN_EMAIL.to_string(),
        base_url: "http://localhost:3000".to_string(),
        grid_emission_factor: DEFAULT_GRID_EMISSION_FACTOR,
    }
}

pub(super) fn sample_form() -> SubmissionForm {
    SubmissionForm {
        facility_name: Some("Plant A".to_string()),
        state: Some("Karnataka".to_string()),
        user_email: Some("a@x.com".to_string()),
        reporting_year: Some("2025".to_string()),
        renewable_energy: Some(250.0),
        total_energy: Some(1000.0),
        scope_boundary_notes: None,
        evidence: Vec::new(),
    }
}

pub(super) fn form_without_email() -> SubmissionForm {
    SubmissionForm {
        user_email: None,
        ..sample_form()
    }
}

/// Recording transport so tests can assert on every outbound email.
#[derive(Default)]
pub(super) struct MemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn sent_to(&self, address: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == address)
            .collect()
    }
}

impl MailTransport for MemoryMailer {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(email.clone());
        Ok(())
    }
}

/// Transport that always fails, for the isolation guarantees.
pub(super) struct FailingMailer;

impl MailTransport for FailingMailer {
    fn deliver(&self, _email: &OutboundEmail) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("relay down".to_string()))
    }
}

/// Store whose status updates fail, for the abort-before-notify guarantee.
#[derive(Default)]
pub(super) struct BrokenUpdateStore {
    inner: MemoryStore,
}

impl SubmissionStore for BrokenUpdateStore {
    fn insert(&self, submission: Submission) -> Result<Submission, StorageError> {
        self.inner.insert(submission)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, StorageError> {
        self.inner.fetch(id)
    }

    fn update_status(
        &self,
        _id: &SubmissionId,
        _status: SubmissionStatus,
        _rejection_reason: Option<String>,
    ) -> Result<Submission, StorageError> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }

    fn pending(&self, limit: usize) -> Result<Vec<Submission>, StorageError> {
        self.inner.pending(limit)
    }
}

pub(super) type TestService = Scope2AssessmentService<MemoryStore, MemoryMailer>;

pub(super) fn build_service() -> (Arc<TestService>, Arc<MemoryStore>, Arc<MemoryMailer>) {
    let store = Arc::new(MemoryStore::default());
    let mailer = Arc::new(MemoryMailer::default());
    let service = Arc::new(Scope2AssessmentService::new(
        store.clone(),
        mailer.clone(),
        settings(),
    ));
    (service, store, mailer)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}
