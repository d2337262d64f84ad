//! Scope 2 self-assessment intake, approval workflow, and notification
//! side effects.
//!
//! Submissions enter PENDING through the public intake endpoint, an admin
//! actor moves them to APPROVED or REJECTED exactly once, and each
//! transition triggers a best-effort templated email. Approvals carry a
//! rendered certificate attachment. Storage failures abort the transition
//! before any notification is attempted; notification and render failures
//! never roll back a persisted status change.

pub mod certificate;
pub mod domain;
pub mod emissions;
pub mod notify;
pub mod router;
pub mod service;
pub mod store;
pub mod transport;

#[cfg(test)]
mod tests;

pub use certificate::{
    Certificate, CertificateFormat, CertificateInput, CertificateRenderer, RenderError,
};
pub use domain::{
    AssessmentFields, EvidenceRef, Submission, SubmissionForm, SubmissionId, SubmissionStatus,
    ValidationError,
};
pub use emissions::EmissionsSnapshot;
pub use notify::{Notifier, NotifySettings};
pub use router::scope2_router;
pub use service::{Scope2AssessmentService, Scope2ServiceError};
pub use store::{JsonFileStore, MemoryStore, StorageError, SubmissionStore};
pub use transport::{
    ConfiguredMailer, EmailAttachment, LogMailer, MailTransport, NotificationError, OutboundEmail,
    SmtpMailer,
};
