use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    ApplicationId, ApplicationStatus, Document, DocumentId, DocumentOwner, DocumentType, Player,
    PlayerId, TrialOutcome, UserId, VerificationStatus,
};
use super::intake::ValidationError;
use super::policy::RegistrationPolicy;
use super::repository::{
    emit_best_effort, Notification, NotificationEvent, Notifier, RegistrationRepository,
    RepositoryError,
};
use super::service::RegistrationError;

/// Named approval-gate failures, surfaced verbatim to the reviewing admin.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("application is already approved")]
    AlreadyApproved,
    #[error("no supporting documents on file")]
    EvidenceMissing,
    #[error("{pending} document(s) still await verification")]
    DocumentsUnverified { pending: usize },
    #[error("no trial is linked to this application")]
    TrialMissing,
    #[error("trial has not been completed")]
    TrialNotCompleted,
    #[error("trial outcome must be RECOMMENDED, found {found}")]
    TrialNotRecommended { found: String },
    #[error("an approved application can no longer be rejected")]
    CannotRejectApproved,
    #[error("draft applications are not open for review")]
    DraftNotReviewable,
}

static PLAYER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_player_id() -> PlayerId {
    let id = PLAYER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PlayerId(format!("PLR-{id:04}"))
}

/// Admin-facing gate that promotes, rejects, or parks applications.
pub struct ApprovalEngine<R, N> {
    store: Arc<R>,
    notifier: Arc<N>,
    policy: RegistrationPolicy,
}

impl<R, N> ApprovalEngine<R, N>
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    pub(crate) fn new(store: Arc<R>, notifier: Arc<N>, policy: RegistrationPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    /// Check every approval gate, then promote the application into a player
    /// record in one atomic repository unit.
    pub fn approve(
        &self,
        application_id: &ApplicationId,
        admin: &UserId,
    ) -> Result<Player, RegistrationError> {
        let mut application = self
            .store
            .application(application_id)?
            .ok_or(RepositoryError::NotFound)?;

        if application.status == ApplicationStatus::Approved {
            return Err(ApprovalError::AlreadyApproved.into());
        }

        let owner = DocumentOwner::Application(application.id.clone());
        let documents = self.store.documents_for_owner(&owner)?;
        if documents.is_empty() && self.policy.require_document_evidence {
            return Err(ApprovalError::EvidenceMissing.into());
        }
        let pending = documents
            .iter()
            .filter(|document| document.verification_status != VerificationStatus::Verified)
            .count();
        if pending > 0 {
            return Err(ApprovalError::DocumentsUnverified { pending }.into());
        }

        let trial_id = application
            .trial_id
            .clone()
            .ok_or(ApprovalError::TrialMissing)?;
        let trial = self
            .store
            .trial(&trial_id)?
            .ok_or(ApprovalError::TrialMissing)?;
        if !trial.is_completed() {
            return Err(ApprovalError::TrialNotCompleted.into());
        }
        match trial.outcome {
            Some(TrialOutcome::Recommended) => {}
            Some(other) => {
                return Err(ApprovalError::TrialNotRecommended {
                    found: other.label().to_string(),
                }
                .into())
            }
            None => {
                return Err(ApprovalError::TrialNotRecommended {
                    found: "none".to_string(),
                }
                .into())
            }
        }

        let now = Utc::now();
        application.status = ApplicationStatus::Approved;
        application.reviewed_at = Some(now);
        application.reviewed_by = Some(admin.clone());

        let player = Player {
            id: next_player_id(),
            user_id: application.user_id.clone(),
            identity: application.identity.clone(),
            contact: application.contact.clone(),
            preferred_teams: application.preferred_teams.clone(),
            profile_photo: profile_photo_pick(&documents),
            source_application: application.id.clone(),
            activated_by: admin.clone(),
            activated_at: now,
        };

        let recipient = application.user_id.clone();
        let player = self.store.promote(application, player)?;

        let mut details = BTreeMap::new();
        details.insert("player_id".to_string(), player.id.0.clone());
        emit_best_effort(
            self.notifier.as_ref(),
            Notification {
                recipient,
                event: NotificationEvent::ApplicationApproved,
                details,
            },
        );

        Ok(player)
    }

    /// Reject with a mandatory reason; bumps the resubmission counters so a
    /// later policy change can reopen the pathway.
    pub fn reject(
        &self,
        application_id: &ApplicationId,
        admin: &UserId,
        reason: &str,
    ) -> Result<(), RegistrationError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::ReasonRequired.into());
        }

        let mut application = self
            .store
            .application(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        if application.status == ApplicationStatus::Approved {
            return Err(ApprovalError::CannotRejectApproved.into());
        }
        if application.status == ApplicationStatus::Draft && !self.policy.allow_draft_rejection {
            return Err(ApprovalError::DraftNotReviewable.into());
        }

        let now = Utc::now();
        application.status = ApplicationStatus::Rejected;
        application.reviewed_at = Some(now);
        application.reviewed_by = Some(admin.clone());
        application.rejection_reason = Some(reason.to_string());
        application.resubmission_attempts += 1;
        application.last_resubmission_at = Some(now);
        let recipient = application.user_id.clone();
        self.store.update_application(application)?;

        let mut details = BTreeMap::new();
        details.insert("reason".to_string(), reason.to_string());
        emit_best_effort(
            self.notifier.as_ref(),
            Notification {
                recipient,
                event: NotificationEvent::ApplicationRejected,
                details,
            },
        );

        Ok(())
    }

    /// Park the application without deciding; the reason defaults when the
    /// admin does not supply one.
    pub fn hold(
        &self,
        application_id: &ApplicationId,
        admin: &UserId,
        reason: Option<String>,
    ) -> Result<(), RegistrationError> {
        let mut application = self
            .store
            .application(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        if application.status == ApplicationStatus::Draft && !self.policy.allow_draft_rejection {
            return Err(ApprovalError::DraftNotReviewable.into());
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "Application placed on hold pending further review".to_string());

        application.status = ApplicationStatus::Hold;
        application.reviewed_at = Some(Utc::now());
        application.reviewed_by = Some(admin.clone());
        let recipient = application.user_id.clone();
        self.store.update_application(application)?;

        let mut details = BTreeMap::new();
        details.insert("reason".to_string(), reason);
        emit_best_effort(
            self.notifier.as_ref(),
            Notification {
                recipient,
                event: NotificationEvent::ApplicationOnHold,
                details,
            },
        );

        Ok(())
    }
}

/// Best-effort profile photo for the new player: first match in the
/// PHOTO, ID_PROOF, ID_CARD preference order.
fn profile_photo_pick(documents: &[Document]) -> Option<DocumentId> {
    for preferred in [
        DocumentType::Photo,
        DocumentType::IdProof,
        DocumentType::IdCard,
    ] {
        if let Some(document) = documents
            .iter()
            .find(|document| document.document_type == preferred)
        {
            return Some(document.id.clone());
        }
    }
    None
}
