use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{
    Document, DocumentType, PlayerApplication, TeamRef, Trial, TrialOutcome, TrialStatus, UserId,
    VerificationStatus,
};

/// Derived, never-persisted triage flag for admin review lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFlag {
    DobProofNotVerified,
    MissingEmergencyContact,
    TrialNotRecommended,
    PendingDocuments,
}

impl RiskFlag {
    pub const fn label(self) -> &'static str {
        match self {
            RiskFlag::DobProofNotVerified => "DOB_PROOF_NOT_VERIFIED",
            RiskFlag::MissingEmergencyContact => "MISSING_EMERGENCY_CONTACT",
            RiskFlag::TrialNotRecommended => "TRIAL_NOT_RECOMMENDED",
            RiskFlag::PendingDocuments => "PENDING_DOCUMENTS",
        }
    }
}

/// Compute triage flags from the current aggregate state.
pub fn risk_flags(
    application: &PlayerApplication,
    trial: Option<&Trial>,
    documents: &[Document],
) -> Vec<RiskFlag> {
    let mut flags = Vec::new();

    let dob_proof_unverified = documents.iter().any(|document| {
        document.document_type == DocumentType::DobProof
            && document.verification_status != VerificationStatus::Verified
    });
    if dob_proof_unverified {
        flags.push(RiskFlag::DobProofNotVerified);
    }

    if application.contact.emergency_contact_name.trim().is_empty() {
        flags.push(RiskFlag::MissingEmergencyContact);
    }

    let recommended = trial
        .filter(|trial| trial.status == TrialStatus::Completed)
        .map(|trial| trial.outcome == Some(TrialOutcome::Recommended))
        .unwrap_or(false);
    if !recommended {
        flags.push(RiskFlag::TrialNotRecommended);
    }

    if documents
        .iter()
        .any(|document| document.verification_status == VerificationStatus::Pending)
    {
        flags.push(RiskFlag::PendingDocuments);
    }

    flags
}

/// Trial fields exposed through read-side snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct TrialSummaryView {
    pub trial_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_coach: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    pub medical_verified: bool,
}

impl TrialSummaryView {
    fn from_trial(trial: &Trial) -> Self {
        Self {
            trial_id: trial.id.0.clone(),
            status: trial.status.label(),
            outcome: trial.outcome.map(TrialOutcome::label),
            assigned_coach: trial.assigned_coach.clone(),
            scheduled_date: trial.scheduled_date,
            venue: trial.venue.clone(),
            medical_verified: trial.medical_verified,
        }
    }
}

/// Per-document verification line in the owner snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatusView {
    pub document_id: String,
    pub document_type: &'static str,
    pub verification_status: &'static str,
}

/// Owner-facing eligibility snapshot; read-only, no side effects.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshotView {
    pub application_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub preferred_teams: Vec<TeamRef>,
    pub preferred_team_names: BTreeMap<TeamRef, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial: Option<TrialSummaryView>,
    pub documents: Vec<DocumentStatusView>,
}

pub fn status_snapshot(
    application: &PlayerApplication,
    trial: Option<&Trial>,
    documents: &[Document],
    team_names: BTreeMap<TeamRef, String>,
) -> StatusSnapshotView {
    StatusSnapshotView {
        application_id: application.id.0.clone(),
        status: application.status.label(),
        trial_status: application.trial_status.map(TrialStatus::label),
        submitted_at: application.submitted_at,
        rejection_reason: application.rejection_reason.clone(),
        preferred_teams: application.preferred_teams.clone(),
        preferred_team_names: team_names,
        trial: trial.map(TrialSummaryView::from_trial),
        documents: documents
            .iter()
            .map(|document| DocumentStatusView {
                document_id: document.id.0.clone(),
                document_type: document.document_type.label(),
                verification_status: document.verification_status.label(),
            })
            .collect(),
    }
}

/// One row of the admin review queue, risk flags included.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewQueueEntryView {
    pub application_id: String,
    pub full_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_outcome: Option<&'static str>,
    pub risk_flags: Vec<&'static str>,
    pub preferred_team_names: Vec<String>,
}

pub fn queue_entry(
    application: &PlayerApplication,
    trial: Option<&Trial>,
    documents: &[Document],
    team_names: &BTreeMap<TeamRef, String>,
) -> ReviewQueueEntryView {
    ReviewQueueEntryView {
        application_id: application.id.0.clone(),
        full_name: application.identity.full_name.clone(),
        status: application.status.label(),
        submitted_at: application.submitted_at,
        trial_outcome: trial.and_then(|trial| trial.outcome).map(TrialOutcome::label),
        risk_flags: risk_flags(application, trial, documents)
            .into_iter()
            .map(RiskFlag::label)
            .collect(),
        preferred_team_names: application
            .preferred_teams
            .iter()
            .map(|team| {
                team_names
                    .get(team)
                    .cloned()
                    .unwrap_or_else(|| team.0.clone())
            })
            .collect(),
    }
}
