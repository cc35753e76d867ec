use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::approval::{ApprovalEngine, ApprovalError};
use super::auth::Actor;
use super::documents::{DocumentError, DocumentRegistry, FileUpload};
use super::domain::{
    ActorRole, ApplicationId, ApplicationStatus, Document, DocumentId, DocumentOwner,
    DocumentType, DraftForm, PlayerApplication, Trial, TrialId, TrialStatus, UserId,
};
use super::intake::{IntakeError, IntakeGuard, ValidationError};
use super::policy::{RegistrationPolicy, ResubmissionPolicy};
use super::report::{queue_entry, status_snapshot, ReviewQueueEntryView, StatusSnapshotView};
use super::repository::{
    emit_best_effort, Notification, NotificationEvent, Notifier, ObjectStore,
    RegistrationRepository, RepositoryError, StorageError, TeamDirectory,
};
use super::trials::{TrialDesk, TrialError};

/// Error raised by any registration lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Trial(#[from] TrialError),
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Machine-checkable failure class carried next to the human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Precondition,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl RegistrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistrationError::Validation(_) => ErrorKind::Validation,
            RegistrationError::Intake(err) => match err {
                IntakeError::Validation(_) => ErrorKind::Validation,
                IntakeError::AlreadySubmitted
                | IntakeError::ResubmissionClosed
                | IntakeError::DuplicateCandidate => ErrorKind::Conflict,
                IntakeError::IncompleteApplication { .. } => ErrorKind::Precondition,
            },
            RegistrationError::Document(err) => match err {
                DocumentError::OwnerNotFound => ErrorKind::NotFound,
                DocumentError::NotOwner => ErrorKind::Forbidden,
            },
            RegistrationError::Trial(err) => match err {
                TrialError::NotPending | TrialError::CoachNotActive => ErrorKind::Precondition,
                TrialError::UnverifiedChecklist => ErrorKind::Validation,
                TrialError::ForbiddenCoach => ErrorKind::Forbidden,
                TrialError::AlreadyEvaluated => ErrorKind::Conflict,
            },
            RegistrationError::Approval(err) => match err {
                ApprovalError::CannotRejectApproved => ErrorKind::Conflict,
                _ => ErrorKind::Precondition,
            },
            RegistrationError::Repository(err) => match err {
                RepositoryError::Conflict => ErrorKind::Conflict,
                RepositoryError::NotFound => ErrorKind::NotFound,
                RepositoryError::Unavailable(_) => ErrorKind::Internal,
            },
            RegistrationError::Storage(_) => ErrorKind::Internal,
        }
    }
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TRIAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("APP-{id:06}"))
}

fn next_trial_id() -> TrialId {
    let id = TRIAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TrialId(format!("TRL-{id:06}"))
}

/// Facade composing the intake guard, document registry, trial desk, and
/// approval engine over one aggregate store.
pub struct RegistrationService<R, S, N, T> {
    store: Arc<R>,
    notifier: Arc<N>,
    teams: Arc<T>,
    policy: RegistrationPolicy,
    intake: IntakeGuard,
    documents: DocumentRegistry<R, S, N>,
    trials: TrialDesk<R, S, N>,
    approvals: ApprovalEngine<R, N>,
}

impl<R, S, N, T> RegistrationService<R, S, N, T>
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    pub fn new(
        store: Arc<R>,
        objects: Arc<S>,
        notifier: Arc<N>,
        teams: Arc<T>,
        policy: RegistrationPolicy,
    ) -> Self {
        let documents = DocumentRegistry::new(
            store.clone(),
            objects.clone(),
            notifier.clone(),
            policy.clone(),
        );
        let trial_documents =
            DocumentRegistry::new(store.clone(), objects, notifier.clone(), policy.clone());
        let trials = TrialDesk::new(store.clone(), notifier.clone(), trial_documents);
        let approvals = ApprovalEngine::new(store.clone(), notifier.clone(), policy.clone());

        Self {
            store,
            notifier,
            teams,
            intake: IntakeGuard::new(policy.clone()),
            policy,
            documents,
            trials,
            approvals,
        }
    }

    pub fn policy(&self) -> &RegistrationPolicy {
        &self.policy
    }

    pub fn documents(&self) -> &DocumentRegistry<R, S, N> {
        &self.documents
    }

    pub fn trials(&self) -> &TrialDesk<R, S, N> {
        &self.trials
    }

    pub fn approvals(&self) -> &ApprovalEngine<R, N> {
        &self.approvals
    }

    /// Create the user's draft or update it in place. Identity and contact
    /// fields are owner-writable only while the application stays DRAFT.
    pub fn create_or_update_draft(
        &self,
        user: &UserId,
        form: DraftForm,
    ) -> Result<PlayerApplication, RegistrationError> {
        let existing = self.store.application_for_user(user)?;
        let reopening = match &existing {
            None => false,
            Some(application) => match application.status {
                ApplicationStatus::Draft => false,
                ApplicationStatus::Rejected => match self.policy.resubmission {
                    ResubmissionPolicy::ReopenToDraft => true,
                    ResubmissionPolicy::OneShot => {
                        return Err(IntakeError::ResubmissionClosed.into())
                    }
                },
                _ => return Err(IntakeError::AlreadySubmitted.into()),
            },
        };

        let validated = self
            .intake
            .validated_draft(form, Utc::now().date_naive())?;
        if self.store.duplicate_candidate_exists(
            &validated.identity.full_name,
            validated.identity.date_of_birth,
            user,
        )? {
            return Err(IntakeError::DuplicateCandidate.into());
        }

        match existing {
            None => {
                let application = PlayerApplication {
                    id: next_application_id(),
                    user_id: user.clone(),
                    identity: validated.identity,
                    location: validated.location,
                    contact: validated.contact,
                    preferred_teams: validated.preferred_teams,
                    status: ApplicationStatus::Draft,
                    trial_status: None,
                    trial_id: None,
                    submitted_at: None,
                    reviewed_at: None,
                    reviewed_by: None,
                    rejection_reason: None,
                    resubmission_attempts: 0,
                    last_resubmission_at: None,
                };
                Ok(self.store.insert_application(application)?)
            }
            Some(mut application) => {
                application.identity = validated.identity;
                application.location = validated.location;
                application.contact = validated.contact;
                application.preferred_teams = validated.preferred_teams;
                if reopening {
                    application.status = ApplicationStatus::Draft;
                }
                self.store.update_application(application.clone())?;
                Ok(application)
            }
        }
    }

    /// Freeze the draft, spawn its trial, and notify the owner. Double
    /// submission is rejected by the DRAFT-only precondition.
    pub fn submit(&self, user: &UserId) -> Result<(PlayerApplication, Trial), RegistrationError> {
        let mut application = self
            .store
            .application_for_user(user)?
            .ok_or(RepositoryError::NotFound)?;
        if application.status != ApplicationStatus::Draft {
            return Err(IntakeError::AlreadySubmitted.into());
        }

        let owner = DocumentOwner::Application(application.id.clone());
        let documents = self.store.documents_for_owner(&owner)?;
        let missing = self.intake.submission_gaps(&application, &documents);
        if !missing.is_empty() {
            return Err(IntakeError::IncompleteApplication { missing }.into());
        }

        let now = Utc::now();
        let trial = Trial {
            id: next_trial_id(),
            application_id: application.id.clone(),
            status: TrialStatus::Pending,
            assigned_coach: None,
            scheduled_date: None,
            scheduled_time: None,
            venue: None,
            outcome: None,
            notes: None,
            evaluated_at: None,
            medical_checklist: None,
            medical_verified: false,
            medical_report_document: None,
            aadhaar_verified: false,
            created_at: now,
        };
        let trial = self.store.insert_trial(trial)?;

        application.status = ApplicationStatus::Submitted;
        application.submitted_at = Some(now);
        application.trial_status = Some(TrialStatus::Pending);
        application.trial_id = Some(trial.id.clone());
        self.store.update_application(application.clone())?;

        let mut details = BTreeMap::new();
        details.insert("application_id".to_string(), application.id.0.clone());
        emit_best_effort(
            self.notifier.as_ref(),
            Notification {
                recipient: user.clone(),
                event: NotificationEvent::ApplicationSubmitted,
                details,
            },
        );

        Ok((application, trial))
    }

    /// Read-only eligibility snapshot for the owning candidate.
    pub fn status(&self, user: &UserId) -> Result<StatusSnapshotView, RegistrationError> {
        let application = self
            .store
            .application_for_user(user)?
            .ok_or(RepositoryError::NotFound)?;
        let trial = match &application.trial_id {
            Some(id) => self.store.trial(id)?,
            None => None,
        };
        let owner = DocumentOwner::Application(application.id.clone());
        let documents = self.store.documents_for_owner(&owner)?;
        let team_names = self.teams.resolve_names(&application.preferred_teams);

        Ok(status_snapshot(
            &application,
            trial.as_ref(),
            &documents,
            team_names,
        ))
    }

    /// Admin triage list with derived risk flags, oldest submission first.
    pub fn review_queue(&self) -> Result<Vec<ReviewQueueEntryView>, RegistrationError> {
        let mut entries = Vec::new();
        for application in self.store.applications_in_review()? {
            let trial = match &application.trial_id {
                Some(id) => self.store.trial(id)?,
                None => None,
            };
            let owner = DocumentOwner::Application(application.id.clone());
            let documents = self.store.documents_for_owner(&owner)?;
            let team_names = self.teams.resolve_names(&application.preferred_teams);
            entries.push(queue_entry(
                &application,
                trial.as_ref(),
                &documents,
                &team_names,
            ));
        }
        Ok(entries)
    }

    /// Upload a document against the candidate's own application.
    pub fn upload_candidate_document(
        &self,
        user: &UserId,
        document_type: DocumentType,
        file: FileUpload,
    ) -> Result<Document, RegistrationError> {
        let application = self
            .store
            .application_for_user(user)?
            .ok_or(DocumentError::OwnerNotFound)?;
        self.documents.upload(
            DocumentOwner::Application(application.id),
            document_type,
            file,
            user,
        )
    }

    /// Mint a signed read URL after checking the actor may see the document.
    /// Admins see everything; owners see their own; a coach additionally sees
    /// documents of applications whose trial they hold.
    pub fn resolve_document_url(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
    ) -> Result<String, RegistrationError> {
        let document = self
            .store
            .document(document_id)?
            .ok_or(RepositoryError::NotFound)?;

        let authorized = match actor.role {
            ActorRole::Admin => true,
            ActorRole::Candidate | ActorRole::Player => match &document.owner {
                DocumentOwner::Application(id) => self
                    .store
                    .application(id)?
                    .map(|application| application.user_id == actor.id)
                    .unwrap_or(false),
                DocumentOwner::Player(id) => self
                    .store
                    .player(id)?
                    .map(|player| player.user_id == actor.id)
                    .unwrap_or(false),
                DocumentOwner::Coach(_) => false,
            },
            ActorRole::Coach => match &document.owner {
                DocumentOwner::Coach(id) => *id == actor.id,
                DocumentOwner::Application(id) => {
                    let mut held = false;
                    if let Some(application) = self.store.application(id)? {
                        if let Some(trial_id) = &application.trial_id {
                            if let Some(trial) = self.store.trial(trial_id)? {
                                held = trial.assigned_coach.as_ref() == Some(&actor.id);
                            }
                        }
                    }
                    held
                }
                DocumentOwner::Player(_) => false,
            },
        };
        if !authorized {
            return Err(DocumentError::NotOwner.into());
        }

        self.documents.resolve_read_url(&document)
    }
}
