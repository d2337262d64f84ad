use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for stored submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review status tracked through the approval workflow.
///
/// `Pending` is the only non-terminal state; both terminal states are
/// reached through exactly one admin transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Approved => "APPROVED",
            SubmissionStatus::Rejected => "REJECTED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

/// Raw questionnaire payload as received over the wire.
///
/// Field names follow the public form contract; the contact address is
/// accepted under `userEmail` with `email` as a legacy alias. Validation
/// into [`AssessmentFields`] happens once at the submission boundary and
/// every downstream component consumes the validated struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionForm {
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "email")]
    pub user_email: Option<String>,
    #[serde(default)]
    pub reporting_year: Option<String>,
    #[serde(default)]
    pub renewable_energy: Option<f64>,
    #[serde(default)]
    pub total_energy: Option<f64>,
    #[serde(default)]
    pub scope_boundary_notes: Option<String>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRef>,
}

impl SubmissionForm {
    /// Validate the raw payload into the typed schema.
    ///
    /// Missing quantities default to zero; negative quantities are a
    /// caller error and are rejected rather than clamped.
    pub fn validate(self) -> Result<AssessmentFields, ValidationError> {
        let facility_name = require_text(self.facility_name, "facilityName")?;
        let state = require_text(self.state, "state")?;

        let renewable_energy_kwh = non_negative(self.renewable_energy, "renewableEnergy")?;
        let total_energy_kwh = non_negative(self.total_energy, "totalEnergy")?;

        let user_email = self
            .user_email
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());

        Ok(AssessmentFields {
            facility_name,
            state,
            user_email,
            reporting_year: self.reporting_year,
            renewable_energy_kwh,
            total_energy_kwh,
            scope_boundary_notes: self.scope_boundary_notes,
            evidence: self.evidence,
        })
    }
}

fn require_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(|raw| raw.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn non_negative(value: Option<f64>, field: &'static str) -> Result<f64, ValidationError> {
    let quantity = value.unwrap_or(0.0);
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(ValidationError::NegativeQuantity { field });
    }
    Ok(quantity)
}

/// Validated questionnaire answers consumed by the workflow, calculator,
/// notifier, and renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentFields {
    pub facility_name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_year: Option<String>,
    pub renewable_energy_kwh: f64,
    pub total_energy_kwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_boundary_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

/// Pointer to uploaded supporting evidence held by an external object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRef {
    pub name: String,
    pub storage_key: String,
}

/// A stored assessment submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub fields: AssessmentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl Submission {
    /// Build a fresh PENDING record for validated fields.
    pub fn pending(fields: AssessmentFields) -> Self {
        Self {
            id: SubmissionId::generate(),
            status: SubmissionStatus::Pending,
            submitted_at: Utc::now(),
            fields,
            rejection_reason: None,
        }
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.fields.user_email.as_deref()
    }
}

/// Boundary validation failures, surfaced with field-level detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field '{field}' is missing or empty")]
    MissingField { field: &'static str },
    #[error("field '{field}' must be a non-negative number")]
    NegativeQuantity { field: &'static str },
}
