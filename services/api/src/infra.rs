use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use sha2::{Digest, Sha256};
use trialgate::workflows::registration::{
    ActorRole, ApplicationId, ApplicationStatus, CoachStatus, Document, DocumentId, DocumentOwner,
    Notification, Notifier, NotifyError, ObjectStore, Player, PlayerApplication, PlayerId,
    RegistrationRepository, RepositoryError, StorageError, TeamDirectory, TeamRef, Trial, TrialId,
    UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    applications: HashMap<ApplicationId, PlayerApplication>,
    trials: HashMap<TrialId, Trial>,
    documents: Vec<Document>,
    players: HashMap<PlayerId, Player>,
    roles: HashMap<UserId, ActorRole>,
    coaches: HashMap<UserId, CoachStatus>,
}

/// Aggregate store backed by one mutex; the whole-state lock is what makes
/// `promote` and `claim_trial` atomic here.
#[derive(Default)]
pub(crate) struct InMemoryRegistrationStore {
    inner: Mutex<StoreState>,
}

impl InMemoryRegistrationStore {
    pub(crate) fn seed_coach(&self, coach: &UserId, status: CoachStatus) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state.roles.insert(coach.clone(), ActorRole::Coach);
        state.coaches.insert(coach.clone(), status);
    }

    pub(crate) fn seed_candidate(&self, user: &UserId) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state.roles.insert(user.clone(), ActorRole::Candidate);
    }
}

impl RegistrationRepository for InMemoryRegistrationStore {
    fn insert_application(
        &self,
        application: PlayerApplication,
    ) -> Result<PlayerApplication, RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if state.applications.contains_key(&application.id)
            || state
                .applications
                .values()
                .any(|existing| existing.user_id == application.user_id)
        {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: PlayerApplication) -> Result<(), RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if !state.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        state
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<PlayerApplication>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.applications.get(id).cloned())
    }

    fn application_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<PlayerApplication>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .values()
            .find(|application| application.user_id == *user)
            .cloned())
    }

    fn duplicate_candidate_exists(
        &self,
        full_name: &str,
        date_of_birth: NaiveDate,
        exclude_user: &UserId,
    ) -> Result<bool, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.applications.values().any(|application| {
            application.user_id != *exclude_user
                && application.status != ApplicationStatus::Rejected
                && application.identity.full_name == full_name
                && application.identity.date_of_birth == date_of_birth
        }))
    }

    fn applications_in_review(&self) -> Result<Vec<PlayerApplication>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let mut applications: Vec<PlayerApplication> = state
            .applications
            .values()
            .filter(|application| {
                matches!(
                    application.status,
                    ApplicationStatus::Submitted
                        | ApplicationStatus::UnderReview
                        | ApplicationStatus::Hold
                )
            })
            .cloned()
            .collect();
        applications.sort_by_key(|application| application.submitted_at);
        Ok(applications)
    }

    fn insert_trial(&self, trial: Trial) -> Result<Trial, RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if state.trials.contains_key(&trial.id) {
            return Err(RepositoryError::Conflict);
        }
        state.trials.insert(trial.id.clone(), trial.clone());
        Ok(trial)
    }

    fn update_trial(&self, trial: Trial) -> Result<(), RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if !state.trials.contains_key(&trial.id) {
            return Err(RepositoryError::NotFound);
        }
        state.trials.insert(trial.id.clone(), trial);
        Ok(())
    }

    fn trial(&self, id: &TrialId) -> Result<Option<Trial>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.trials.get(id).cloned())
    }

    fn claim_trial(&self, id: &TrialId, coach: &UserId) -> Result<UserId, RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let trial = state.trials.get_mut(id).ok_or(RepositoryError::NotFound)?;
        match &trial.assigned_coach {
            Some(assigned) => Ok(assigned.clone()),
            None => {
                trial.assigned_coach = Some(coach.clone());
                Ok(coach.clone())
            }
        }
    }

    fn trials_for_coach(&self, coach: &UserId) -> Result<Vec<Trial>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .trials
            .values()
            .filter(|trial| trial.assigned_coach.as_ref() == Some(coach))
            .cloned()
            .collect())
    }

    fn unassigned_pending_trials(&self) -> Result<Vec<Trial>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .trials
            .values()
            .filter(|trial| trial.assigned_coach.is_none() && !trial.is_completed())
            .cloned()
            .collect())
    }

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if state.documents.iter().any(|doc| doc.id == document.id) {
            return Err(RepositoryError::Conflict);
        }
        state.documents.push(document.clone());
        Ok(document)
    }

    fn update_document(&self, document: Document) -> Result<(), RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        match state.documents.iter_mut().find(|doc| doc.id == document.id) {
            Some(slot) => {
                *slot = document;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_document(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let before = state.documents.len();
        state.documents.retain(|doc| doc.id != *id);
        if state.documents.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.documents.iter().find(|doc| doc.id == *id).cloned())
    }

    fn documents_for_owner(
        &self,
        owner: &DocumentOwner,
    ) -> Result<Vec<Document>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .documents
            .iter()
            .rev()
            .filter(|doc| doc.owner == *owner)
            .cloned()
            .collect())
    }

    fn coach_status(&self, coach: &UserId) -> Result<Option<CoachStatus>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.coaches.get(coach).copied())
    }

    fn user_role(&self, user: &UserId) -> Result<Option<ActorRole>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.roles.get(user).copied())
    }

    fn player(&self, id: &PlayerId) -> Result<Option<Player>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.players.get(id).cloned())
    }

    fn player_for_user(&self, user: &UserId) -> Result<Option<Player>, RepositoryError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .players
            .values()
            .find(|player| player.user_id == *user)
            .cloned())
    }

    fn promote(
        &self,
        application: PlayerApplication,
        player: Player,
    ) -> Result<Player, RepositoryError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if !state.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        state
            .applications
            .insert(application.id.clone(), application);
        state.players.insert(player.id.clone(), player.clone());
        state
            .roles
            .insert(player.user_id.clone(), ActorRole::Player);
        Ok(player)
    }
}

/// In-process object store minting HMAC-style signed URLs: the signature is
/// SHA-256 over secret, key, and expiry, URL-safe base64 encoded.
pub(crate) struct SignedLocalObjectStore {
    secret: Vec<u8>,
    base_url: String,
    objects: Mutex<HashMap<String, (usize, String)>>,
}

impl SignedLocalObjectStore {
    pub(crate) fn new(secret: &[u8], base_url: &str) -> Self {
        Self {
            secret: secret.to_vec(),
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    fn signature(&self, key: &str, expires_ts: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(key.as_bytes());
        hasher.update(expires_ts.to_be_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl ObjectStore for SignedLocalObjectStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().expect("object mutex poisoned");
        objects.insert(key.to_string(), (bytes.len(), content_type.to_string()));
        Ok(key.to_string())
    }

    fn sign(&self, key: &str, ttl_secs: u32) -> Result<String, StorageError> {
        {
            let objects = self.objects.lock().expect("object mutex poisoned");
            if !objects.contains_key(key) {
                return Err(StorageError::MissingObject(key.to_string()));
            }
        }
        let expires = Utc::now() + Duration::seconds(i64::from(ttl_secs));
        let expires_ts = expires.timestamp();
        let signature = self.signature(key, expires_ts);
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url, key, expires_ts, signature
        ))
    }
}

/// Records every event and mirrors it onto the log; dispatch never fails.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient.0,
            event = notification.event.label(),
            "notification dispatched"
        );
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Static ref-to-name mapping standing in for the roster service.
pub(crate) struct StaticTeamDirectory {
    names: BTreeMap<TeamRef, String>,
}

impl StaticTeamDirectory {
    pub(crate) fn with_defaults() -> Self {
        let mut names = BTreeMap::new();
        names.insert(TeamRef("T-100".to_string()), "Pune Strikers".to_string());
        names.insert(TeamRef("T-200".to_string()), "Deccan United".to_string());
        names.insert(TeamRef("T-300".to_string()), "Konkan Rovers".to_string());
        Self { names }
    }
}

impl TeamDirectory for StaticTeamDirectory {
    fn resolve_names(&self, refs: &[TeamRef]) -> BTreeMap<TeamRef, String> {
        refs.iter()
            .filter_map(|team| {
                self.names
                    .get(team)
                    .map(|name| (team.clone(), name.clone()))
            })
            .collect()
    }
}
