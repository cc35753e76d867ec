use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    ActorRole, ApplicationId, CoachStatus, Document, DocumentId, DocumentOwner, Player,
    PlayerApplication, PlayerId, TeamRef, Trial, TrialId, UserId,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the application/trial/document aggregate plus the
/// actor directory, so the lifecycle engine can be exercised in isolation.
///
/// The aggregate is keyed by application id; implementations must make
/// [`RegistrationRepository::promote`] and
/// [`RegistrationRepository::claim_trial`] atomic with respect to concurrent
/// calls.
pub trait RegistrationRepository: Send + Sync {
    fn insert_application(
        &self,
        application: PlayerApplication,
    ) -> Result<PlayerApplication, RepositoryError>;
    fn update_application(&self, application: PlayerApplication) -> Result<(), RepositoryError>;
    fn application(&self, id: &ApplicationId)
        -> Result<Option<PlayerApplication>, RepositoryError>;
    fn application_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<PlayerApplication>, RepositoryError>;
    /// Duplicate-candidate guard: does another user hold a non-REJECTED
    /// application with this exact name and date of birth?
    fn duplicate_candidate_exists(
        &self,
        full_name: &str,
        date_of_birth: NaiveDate,
        exclude_user: &UserId,
    ) -> Result<bool, RepositoryError>;
    /// Applications awaiting admin attention, oldest submission first.
    fn applications_in_review(&self) -> Result<Vec<PlayerApplication>, RepositoryError>;

    fn insert_trial(&self, trial: Trial) -> Result<Trial, RepositoryError>;
    fn update_trial(&self, trial: Trial) -> Result<(), RepositoryError>;
    fn trial(&self, id: &TrialId) -> Result<Option<Trial>, RepositoryError>;
    /// Compare-and-set claim: assign `coach` only if the trial is currently
    /// unassigned, and return whoever holds the assignment afterwards.
    fn claim_trial(&self, id: &TrialId, coach: &UserId) -> Result<UserId, RepositoryError>;
    fn trials_for_coach(&self, coach: &UserId) -> Result<Vec<Trial>, RepositoryError>;
    fn unassigned_pending_trials(&self) -> Result<Vec<Trial>, RepositoryError>;

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError>;
    fn update_document(&self, document: Document) -> Result<(), RepositoryError>;
    fn delete_document(&self, id: &DocumentId) -> Result<(), RepositoryError>;
    fn document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    /// Documents for one owner, newest upload first.
    fn documents_for_owner(
        &self,
        owner: &DocumentOwner,
    ) -> Result<Vec<Document>, RepositoryError>;

    fn coach_status(&self, coach: &UserId) -> Result<Option<CoachStatus>, RepositoryError>;
    fn user_role(&self, user: &UserId) -> Result<Option<ActorRole>, RepositoryError>;
    fn player(&self, id: &PlayerId) -> Result<Option<Player>, RepositoryError>;
    fn player_for_user(&self, user: &UserId) -> Result<Option<Player>, RepositoryError>;

    /// Commit the approval as one atomic unit: persist the updated
    /// application, insert the player, and elevate the owning user's role to
    /// PLAYER. A failure must leave none of the three writes observable.
    fn promote(
        &self,
        application: PlayerApplication,
        player: Player,
    ) -> Result<Player, RepositoryError>;
}

/// Write/sign boundary over the external binary store; the core never reads
/// file contents back.
pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StorageError>;
    fn sign(&self, key: &str, ttl_secs: u32) -> Result<String, StorageError>;
}

/// Object storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored object missing for key {0}")]
    MissingObject(String),
}

/// Fire-and-forget event published to the owning user; delivery is
/// best-effort and a failed emit never fails the triggering operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub event: NotificationEvent,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    ApplicationSubmitted,
    TrialAssigned,
    ApplicationApproved,
    ApplicationRejected,
    ApplicationOnHold,
    DocumentVerified,
    DocumentRejected,
}

impl NotificationEvent {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationEvent::ApplicationSubmitted => "APPLICATION_SUBMITTED",
            NotificationEvent::TrialAssigned => "TRIAL_ASSIGNED",
            NotificationEvent::ApplicationApproved => "APPLICATION_APPROVED",
            NotificationEvent::ApplicationRejected => "APPLICATION_REJECTED",
            NotificationEvent::ApplicationOnHold => "APPLICATION_ON_HOLD",
            NotificationEvent::DocumentVerified => "DOCUMENT_VERIFIED",
            NotificationEvent::DocumentRejected => "DOCUMENT_REJECTED",
        }
    }
}

/// Trait describing the outbound notification hook (SMS/push adapters).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Read-side resolver from team references to display names; never consulted
/// on the write path.
pub trait TeamDirectory: Send + Sync {
    fn resolve_names(&self, refs: &[TeamRef]) -> BTreeMap<TeamRef, String>;
}

/// Dispatch a notification, swallowing (but logging) transport failures.
pub(crate) fn emit_best_effort<N: Notifier + ?Sized>(notifier: &N, notification: Notification) {
    let event = notification.event.label();
    if let Err(err) = notifier.notify(notification) {
        tracing::warn!(%err, event, "notification dispatch failed");
    }
}
