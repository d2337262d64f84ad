//! Email composition for workflow events.
//!
//! Delivery is best-effort: callers receive the transport error for
//! logging but the triggering transition is already durable and is never
//! rolled back.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::certificate::{CertificateFormat, CertificateInput, CertificateRenderer};
use super::domain::Submission;
use super::emissions::EmissionsSnapshot;
use super::transport::{EmailAttachment, MailTransport, NotificationError, OutboundEmail};
use crate::config::MailConfig;

/// Addressing and composition settings.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub admin_email: String,
    pub base_url: String,
    pub grid_emission_factor: f64,
}

impl NotifySettings {
    pub fn from_config(mail: &MailConfig, grid_emission_factor: f64) -> Self {
        Self {
            admin_email: mail.admin_email.clone(),
            base_url: mail.base_url.trim_end_matches('/').to_string(),
            grid_emission_factor,
        }
    }
}

/// Composes and delivers the three workflow emails.
pub struct Notifier<M> {
    transport: Arc<M>,
    settings: NotifySettings,
    renderer: CertificateRenderer,
}

impl<M> Notifier<M>
where
    M: MailTransport + 'static,
{
    pub fn new(transport: Arc<M>, settings: NotifySettings) -> Self {
        Self {
            transport,
            settings,
            renderer: CertificateRenderer,
        }
    }

    /// One email to the configured admin address with a summary and a link
    /// back to the review surface for this submission.
    pub fn admin_submitted(&self, submission: &Submission) -> Result<(), NotificationError> {
        let snapshot =
            EmissionsSnapshot::for_fields(&submission.fields, self.settings.grid_emission_factor);
        let review_link = format!("{}/admin/review/{}", self.settings.base_url, submission.id);

        let html_body = format!(
            "<h1>New Submission Received</h1>\
             <p>A new Scope 2 self-assessment has been submitted.</p>\
             <ul>\
             <li><strong>Facility:</strong> {facility}</li>\
             <li><strong>State/grid region:</strong> {state}</li>\
             <li><strong>Submitted at:</strong> {submitted_at}</li>\
             <li><strong>Renewable share:</strong> {percentage:.2}%</li>\
             </ul>\
             <p><a href=\"{review_link}\">Review submission</a></p>",
            facility = submission.fields.facility_name,
            state = submission.fields.state,
            submitted_at = submission.submitted_at.to_rfc3339(),
            percentage = snapshot.renewable_percentage,
            review_link = review_link,
        );

        self.transport.deliver(&OutboundEmail {
            to: self.settings.admin_email.clone(),
            subject: format!(
                "New Scope 2 Assessment Submission: {}",
                submission.fields.facility_name
            ),
            html_body,
            attachment: None,
        })
    }

    /// Approval email with the certificate attached. A render failure is
    /// logged and the email goes out without the attachment.
    pub fn approved(&self, email: &str, submission: &Submission) -> Result<(), NotificationError> {
        let snapshot =
            EmissionsSnapshot::for_fields(&submission.fields, self.settings.grid_emission_factor);
        let input = CertificateInput {
            certificate_id: format!("CERT-{}", submission.id),
            facility_name: submission.fields.facility_name.clone(),
            approved_on: Utc::now().date_naive(),
            renewable_percentage: snapshot.renewable_percentage,
        };

        let attachment = match self.renderer.render(&input, CertificateFormat::Pdf) {
            Ok(certificate) => Some(EmailAttachment {
                filename: certificate.filename.to_string(),
                content_type: certificate.content_type.to_string(),
                bytes: certificate.bytes,
            }),
            Err(err) => {
                warn!(
                    submission_id = %submission.id,
                    error = %err,
                    "certificate rendering failed; sending approval email without attachment"
                );
                None
            }
        };

        let html_body = format!(
            "<h1>Congratulations!</h1>\
             <p>Your Scope 2 self-assessment for <strong>{facility}</strong> has been approved.</p>\
             <p>Your reported renewable energy share is {percentage:.2}%.</p>\
             <p>Please find attached your compliance certificate.</p>\
             <p>Best regards,<br/>Sustally Team</p>",
            facility = submission.fields.facility_name,
            percentage = snapshot.renewable_percentage,
        );

        self.transport.deliver(&OutboundEmail {
            to: email.to_string(),
            subject: "Scope 2 Assessment Approved - Certificate Enclosed".to_string(),
            html_body,
            attachment,
        })
    }

    /// Rejection email, embedding the reason when one was recorded.
    pub fn rejected(
        &self,
        email: &str,
        submission: &Submission,
        reason: Option<&str>,
    ) -> Result<(), NotificationError> {
        let reason_block = reason
            .map(|text| format!("<p><strong>Reason:</strong> {text}</p>"))
            .unwrap_or_default();

        let html_body = format!(
            "<h1>Assessment Update Required</h1>\
             <p>Thank you for submitting your Scope 2 self-assessment for \
             <strong>{facility}</strong>.</p>\
             <p>After review, we have identified areas that need further clarification \
             or correction.</p>\
             {reason_block}\
             <p>Please log in to your dashboard to retry your assessment.</p>\
             <p>Best regards,<br/>Sustally Team</p>",
            facility = submission.fields.facility_name,
            reason_block = reason_block,
        );

        self.transport.deliver(&OutboundEmail {
            to: email.to_string(),
            subject: "Action Required: Scope 2 Assessment Update".to_string(),
            html_body,
            attachment: None,
        })
    }
}
