use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::documents::{DocumentRegistry, FileUpload};
use super::domain::{
    ApplicationStatus, CoachStatus, MedicalChecklist, Trial, TrialId, TrialOutcome, TrialStatus,
    UserId,
};
use super::repository::{
    emit_best_effort, Notification, NotificationEvent, Notifier, ObjectStore,
    RegistrationRepository, RepositoryError,
};
use super::service::RegistrationError;

/// State-machine guards for trial operations.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error("trial is no longer pending")]
    NotPending,
    #[error("coach is not active")]
    CoachNotActive,
    #[error("medical checklist must be marked verified by the coach")]
    UnverifiedChecklist,
    #[error("trial is assigned to a different coach")]
    ForbiddenCoach,
    #[error("trial has already been evaluated")]
    AlreadyEvaluated,
}

/// Optional scheduling block an admin can attach while assigning.
#[derive(Debug, Clone, Default)]
pub struct TrialSchedule {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub venue: Option<String>,
}

/// Coach- and admin-facing operations over the trial state machine.
///
/// PENDING is the only non-terminal state; assignment is an orthogonal
/// sub-state. An unassigned trial is claimed by the first active coach that
/// writes to it. The claim is a repository-level compare-and-set, so two
/// racing coaches resolve to whichever write lands first.
pub struct TrialDesk<R, S, N> {
    store: Arc<R>,
    notifier: Arc<N>,
    documents: DocumentRegistry<R, S, N>,
}

impl<R, S, N> TrialDesk<R, S, N>
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
{
    pub(crate) fn new(
        store: Arc<R>,
        notifier: Arc<N>,
        documents: DocumentRegistry<R, S, N>,
    ) -> Self {
        Self {
            store,
            notifier,
            documents,
        }
    }

    /// Pre-assign a coach and optionally a schedule. Assignment alone never
    /// completes the trial.
    pub fn assign(
        &self,
        trial_id: &TrialId,
        coach: &UserId,
        schedule: TrialSchedule,
    ) -> Result<Trial, RegistrationError> {
        let mut trial = self.fetch(trial_id)?;
        if trial.is_completed() {
            return Err(TrialError::NotPending.into());
        }
        self.ensure_active_coach(coach)?;

        trial.assigned_coach = Some(coach.clone());
        if schedule.date.is_some() {
            trial.scheduled_date = schedule.date;
        }
        if schedule.time.is_some() {
            trial.scheduled_time = schedule.time;
        }
        if schedule.venue.is_some() {
            trial.venue = schedule.venue;
        }
        self.store.update_trial(trial.clone())?;

        if let Some(application) = self.store.application(&trial.application_id)? {
            let mut details = BTreeMap::new();
            details.insert("trial_id".to_string(), trial.id.0.clone());
            if let Some(date) = trial.scheduled_date {
                details.insert("scheduled_date".to_string(), date.to_string());
            }
            if let Some(venue) = &trial.venue {
                details.insert("venue".to_string(), venue.clone());
            }
            emit_best_effort(
                self.notifier.as_ref(),
                Notification {
                    recipient: application.user_id,
                    event: NotificationEvent::TrialAssigned,
                    details,
                },
            );
        }

        Ok(trial)
    }

    /// Record the medical checklist; may happen before or interleaved with
    /// evaluation. Claims the trial when unassigned.
    pub fn submit_medical_form(
        &self,
        trial_id: &TrialId,
        coach: &UserId,
        checklist: MedicalChecklist,
        verified: bool,
        report: Option<FileUpload>,
    ) -> Result<Trial, RegistrationError> {
        if !verified {
            return Err(TrialError::UnverifiedChecklist.into());
        }

        let mut trial = self.fetch(trial_id)?;
        self.authorize_or_claim(&mut trial, coach)?;

        trial.medical_checklist = Some(checklist);
        trial.medical_verified = true;
        if let Some(file) = report {
            let document =
                self.documents
                    .replace_or_create_medical_report(&trial.application_id, file, coach)?;
            trial.medical_report_document = Some(document.id);
        }
        self.store.update_trial(trial.clone())?;

        Ok(trial)
    }

    /// Document-only variant of the medical submission.
    pub fn upload_medical_report(
        &self,
        trial_id: &TrialId,
        coach: &UserId,
        file: FileUpload,
    ) -> Result<Trial, RegistrationError> {
        let mut trial = self.fetch(trial_id)?;
        self.authorize_or_claim(&mut trial, coach)?;

        let document =
            self.documents
                .replace_or_create_medical_report(&trial.application_id, file, coach)?;
        trial.medical_report_document = Some(document.id);
        self.store.update_trial(trial.clone())?;

        Ok(trial)
    }

    /// Record the outcome and complete the trial (terminal). On RECOMMENDED
    /// the linked application moves to UNDER_REVIEW; other outcomes leave the
    /// application status for the admin to decide.
    pub fn evaluate(
        &self,
        trial_id: &TrialId,
        coach: &UserId,
        outcome: TrialOutcome,
        notes: Option<String>,
        aadhaar_verified: Option<bool>,
    ) -> Result<Trial, RegistrationError> {
        let mut trial = self.fetch(trial_id)?;
        if let Some(assigned) = &trial.assigned_coach {
            if assigned != coach {
                return Err(TrialError::ForbiddenCoach.into());
            }
        }
        if trial.is_completed() {
            return Err(TrialError::AlreadyEvaluated.into());
        }
        self.authorize_or_claim(&mut trial, coach)?;

        trial.outcome = Some(outcome);
        if notes.is_some() {
            trial.notes = notes;
        }
        if let Some(flag) = aadhaar_verified {
            trial.aadhaar_verified = flag;
        }
        trial.evaluated_at = Some(Utc::now());
        trial.status = TrialStatus::Completed;
        self.store.update_trial(trial.clone())?;

        let mut application = self
            .store
            .application(&trial.application_id)?
            .ok_or(RepositoryError::NotFound)?;
        application.trial_status = Some(TrialStatus::Completed);
        if outcome == TrialOutcome::Recommended {
            application.status = ApplicationStatus::UnderReview;
        }
        self.store.update_application(application)?;

        Ok(trial)
    }

    /// Trials this coach can act on: their own assignments (optionally
    /// filtered by status) plus every unassigned PENDING trial.
    pub fn visible_to(
        &self,
        coach: &UserId,
        status_filter: Option<TrialStatus>,
    ) -> Result<Vec<Trial>, RegistrationError> {
        let mut trials = self.store.trials_for_coach(coach)?;
        trials.extend(self.store.unassigned_pending_trials()?);
        if let Some(filter) = status_filter {
            trials.retain(|trial| trial.status == filter);
        }
        Ok(trials)
    }

    fn fetch(&self, trial_id: &TrialId) -> Result<Trial, RegistrationError> {
        Ok(self
            .store
            .trial(trial_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn ensure_active_coach(&self, coach: &UserId) -> Result<(), RegistrationError> {
        match self.store.coach_status(coach)? {
            Some(CoachStatus::Active) => Ok(()),
            _ => Err(TrialError::CoachNotActive.into()),
        }
    }

    fn authorize_or_claim(
        &self,
        trial: &mut Trial,
        coach: &UserId,
    ) -> Result<(), RegistrationError> {
        match &trial.assigned_coach {
            Some(assigned) if assigned == coach => Ok(()),
            Some(_) => Err(TrialError::ForbiddenCoach.into()),
            None => {
                self.ensure_active_coach(coach)?;
                let assignee = self.store.claim_trial(&trial.id, coach)?;
                if assignee == *coach {
                    trial.assigned_coach = Some(assignee);
                    Ok(())
                } else {
                    Err(TrialError::ForbiddenCoach.into())
                }
            }
        }
    }
}
