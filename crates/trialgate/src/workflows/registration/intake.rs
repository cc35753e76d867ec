use chrono::NaiveDate;

use super::domain::{
    CandidateIdentity, ContactDetails, Document, DocumentType, DraftForm, Location, PhoneNumber,
    Pincode, PlayerApplication, TeamRef,
};
use super::policy::RegistrationPolicy;

/// Malformed or missing input; always recoverable by correcting the payload.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("required field missing: {0}")]
    MissingField(&'static str),
    #[error("date of birth must be in the past")]
    DateOfBirthNotPast,
    #[error("age {age} outside the admissible range [{min}, {max}]")]
    AgeOutOfRange { age: u32, min: u8, max: u8 },
    #[error("{field} must be a 10-digit Indian mobile number")]
    InvalidPhone { field: &'static str },
    #[error("pincode must be exactly 6 digits")]
    InvalidPincode,
    #[error("a non-empty reason is required")]
    ReasonRequired,
    #[error("file content is not valid base64")]
    InvalidFileEncoding,
}

/// State-machine guards raised while moving a draft toward submission.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("application has already been submitted")]
    AlreadySubmitted,
    #[error("registration is closed for this rejected application")]
    ResubmissionClosed,
    #[error("another candidate already registered with this name and date of birth")]
    DuplicateCandidate,
    #[error("application incomplete: missing {}", missing.join(", "))]
    IncompleteApplication { missing: Vec<String> },
}

/// Draft fields that passed validation, typed and ready to persist.
#[derive(Debug, Clone)]
pub struct ValidatedDraft {
    pub identity: CandidateIdentity,
    pub location: Location,
    pub contact: ContactDetails,
    pub preferred_teams: Vec<TeamRef>,
}

/// Guard validating draft payloads and submission readiness.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    policy: RegistrationPolicy,
}

impl IntakeGuard {
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self { policy }
    }

    /// Convert an inbound draft form into typed fields, rejecting on the
    /// first rule the payload breaks.
    pub fn validated_draft(
        &self,
        form: DraftForm,
        today: NaiveDate,
    ) -> Result<ValidatedDraft, ValidationError> {
        let full_name = required_text(form.full_name, "full_name")?;
        let date_of_birth = form
            .date_of_birth
            .ok_or(ValidationError::MissingField("date_of_birth"))?;
        let gender = required_text(form.gender, "gender")?;

        if date_of_birth >= today {
            return Err(ValidationError::DateOfBirthNotPast);
        }
        let age = today
            .years_since(date_of_birth)
            .ok_or(ValidationError::DateOfBirthNotPast)?;
        if age < u32::from(self.policy.minimum_age_years)
            || age > u32::from(self.policy.maximum_age_years)
        {
            return Err(ValidationError::AgeOutOfRange {
                age,
                min: self.policy.minimum_age_years,
                max: self.policy.maximum_age_years,
            });
        }

        let player_phone = required_phone(form.player_phone, "player_phone")?;
        let emergency_contact_name =
            required_text(form.emergency_contact_name, "emergency_contact_name")?;
        let emergency_contact_phone =
            required_phone(form.emergency_contact_phone, "emergency_contact_phone")?;

        let pincode = match form.pincode.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Pincode::parse(raw).ok_or(ValidationError::InvalidPincode)?),
        };

        Ok(ValidatedDraft {
            identity: CandidateIdentity {
                full_name,
                date_of_birth,
                gender,
                nationality: optional_text(form.nationality),
                sport: optional_text(form.sport),
                position: optional_text(form.position),
                dominant_side: optional_text(form.dominant_side),
            },
            location: Location {
                city: optional_text(form.city),
                state: optional_text(form.state),
                pincode,
            },
            contact: ContactDetails {
                player_phone,
                emergency_contact_name,
                emergency_contact_phone,
            },
            preferred_teams: form.preferred_teams,
        })
    }

    /// Everything still standing between this draft and submission; an empty
    /// list means the application is ready.
    pub fn submission_gaps(
        &self,
        application: &PlayerApplication,
        documents: &[Document],
    ) -> Vec<String> {
        let mut missing = Vec::new();

        if application.identity.nationality.is_none() {
            missing.push("nationality".to_string());
        }
        if application.location.pincode.is_none() {
            missing.push("pincode".to_string());
        }
        if application.preferred_teams.is_empty() {
            missing.push("preferred team selection".to_string());
        }
        if !documents
            .iter()
            .any(|document| document.document_type == DocumentType::IdProof)
        {
            missing.push("identity proof document".to_string());
        }

        missing
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_phone(
    value: Option<String>,
    field: &'static str,
) -> Result<PhoneNumber, ValidationError> {
    let raw = match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => return Err(ValidationError::MissingField(field)),
    };
    PhoneNumber::parse(&raw).ok_or(ValidationError::InvalidPhone { field })
}
