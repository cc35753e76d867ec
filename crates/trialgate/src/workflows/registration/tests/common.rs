use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};

use crate::workflows::registration::documents::FileUpload;
use crate::workflows::registration::domain::{
    ActorRole, ApplicationId, ApplicationStatus, CoachStatus, Document, DocumentId, DocumentOwner,
    DocumentType, DraftForm, MedicalCheckItem, MedicalChecklist, Player, PlayerApplication,
    PlayerId, TeamRef, Trial, TrialId, UserId,
};
use crate::workflows::registration::policy::RegistrationPolicy;
use crate::workflows::registration::repository::{
    Notification, Notifier, NotifyError, ObjectStore, RegistrationRepository, RepositoryError,
    StorageError, TeamDirectory,
};
use crate::workflows::registration::service::RegistrationService;

pub(super) type TestService =
    RegistrationService<MemoryStore, MemoryObjects, MemoryNotifier, StaticTeams>;

#[derive(Default)]
struct MemoryState {
    applications: HashMap<ApplicationId, PlayerApplication>,
    trials: HashMap<TrialId, Trial>,
    documents: Vec<Document>,
    players: HashMap<PlayerId, Player>,
    roles: HashMap<UserId, ActorRole>,
    coaches: HashMap<UserId, CoachStatus>,
}

/// Single-mutex aggregate store; locking the whole state keeps `promote` and
/// `claim_trial` atomic the way a transactional backend would.
#[derive(Default)]
pub(super) struct MemoryStore {
    inner: Mutex<MemoryState>,
    pub(super) fail_promote_after_player_insert: AtomicBool,
}

impl MemoryStore {
    pub(super) fn seed_candidate(&self, user: &UserId) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state.roles.insert(user.clone(), ActorRole::Candidate);
    }

    pub(super) fn seed_coach(&self, coach: &UserId, status: CoachStatus) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state.roles.insert(coach.clone(), ActorRole::Coach);
        state.coaches.insert(coach.clone(), status);
    }

    pub(super) fn raw_insert_document(&self, document: Document) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state.documents.push(document);
    }

    pub(super) fn raw_application(&self, id: &ApplicationId) -> Option<PlayerApplication> {
        let state = self.inner.lock().expect("store mutex poisoned");
        state.applications.get(id).cloned()
    }

    pub(super) fn raw_trial(&self, id: &TrialId) -> Option<Trial> {
        let state = self.inner.lock().expect("store mutex poisoned");
        state.trials.get(id).cloned()
    }

    pub(super) fn player_count(&self) -> usize {
        let state = self.inner.lock().expect("store mutex poisoned");
        state.players.len()
    }
}

impl RegistrationRepository for MemoryStore {
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
        if self.fail_promote_after_player_insert.load(Ordering::Relaxed) {
            // The staged player row never commits; the whole unit rolls back.
            return Err(RepositoryError::Unavailable(
                "injected failure between player insert and role update".to_string(),
            ));
        }
        state
            .applications
            .insert(application.id.clone(), application);
        state.players.insert(player.id.clone(), player.clone());
        state.roles.insert(player.user_id.clone(), ActorRole::Player);
        Ok(player)
    }
}

/// Object store fake recording stored keys and minting deterministic URLs.
#[derive(Default)]
pub(super) struct MemoryObjects {
    objects: Mutex<HashMap<String, usize>>,
}

impl MemoryObjects {
    pub(super) fn object_count(&self) -> usize {
        self.objects.lock().expect("objects mutex poisoned").len()
    }
}

impl ObjectStore for MemoryObjects {
    fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().expect("objects mutex poisoned");
        objects.insert(key.to_string(), bytes.len());
        Ok(key.to_string())
    }

    fn sign(&self, key: &str, ttl_secs: u32) -> Result<String, StorageError> {
        Ok(format!("https://files.test/{key}?ttl={ttl_secs}"))
    }
}

/// Notification fake; flips to failing mode to prove emits are best-effort.
#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<Notification>>,
    pub(super) fail: AtomicBool,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(NotifyError::Transport("gateway offline".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Fixed-map team resolver; unknown refs simply stay unresolved.
#[derive(Default)]
pub(super) struct StaticTeams {
    names: BTreeMap<TeamRef, String>,
}

impl StaticTeams {
    pub(super) fn with_defaults() -> Self {
        let mut names = BTreeMap::new();
        names.insert(TeamRef("T-100".to_string()), "Pune Strikers".to_string());
        names.insert(TeamRef("T-200".to_string()), "Deccan United".to_string());
        Self { names }
    }
}

impl TeamDirectory for StaticTeams {
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

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryStore>,
    Arc<MemoryObjects>,
    Arc<MemoryNotifier>,
) {
    build_service_with_policy(RegistrationPolicy::default())
}

pub(super) fn build_service_with_policy(
    policy: RegistrationPolicy,
) -> (
    TestService,
    Arc<MemoryStore>,
    Arc<MemoryObjects>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let objects = Arc::new(MemoryObjects::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let teams = Arc::new(StaticTeams::with_defaults());
    let service = RegistrationService::new(
        store.clone(),
        objects.clone(),
        notifier.clone(),
        teams,
        policy,
    );
    (service, store, objects, notifier)
}

pub(super) fn draft_form() -> DraftForm {
    DraftForm {
        full_name: Some("Arjun Mehta".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2005, 3, 14),
        gender: Some("MALE".to_string()),
        nationality: Some("Indian".to_string()),
        sport: Some("FOOTBALL".to_string()),
        position: Some("MIDFIELDER".to_string()),
        dominant_side: Some("RIGHT".to_string()),
        city: Some("Pune".to_string()),
        state: Some("Maharashtra".to_string()),
        pincode: Some("411001".to_string()),
        player_phone: Some("+91 98765 43210".to_string()),
        emergency_contact_name: Some("Rohan Mehta".to_string()),
        emergency_contact_phone: Some("9123456780".to_string()),
        preferred_teams: vec![TeamRef("T-100".to_string()), TeamRef("T-200".to_string())],
    }
}

/// Same shape as [`draft_form`] with a distinct identity, so one store can
/// hold several candidates without tripping the duplicate guard.
pub(super) fn named_draft_form(full_name: &str, date_of_birth: NaiveDate) -> DraftForm {
    DraftForm {
        full_name: Some(full_name.to_string()),
        date_of_birth: Some(date_of_birth),
        ..draft_form()
    }
}

pub(super) fn id_proof_file() -> FileUpload {
    FileUpload {
        bytes: b"aadhaar-scan".to_vec(),
        file_name: "aadhaar.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
    }
}

pub(super) fn medical_report_file(marker: &str) -> FileUpload {
    FileUpload {
        bytes: format!("medical-report-{marker}").into_bytes(),
        file_name: format!("medical-{marker}.pdf"),
        mime_type: "application/pdf".to_string(),
    }
}

pub(super) fn cleared_checklist() -> MedicalChecklist {
    MedicalChecklist {
        items: vec![
            MedicalCheckItem {
                label: "Blood pressure".to_string(),
                cleared: true,
                remarks: None,
            },
            MedicalCheckItem {
                label: "Cardiac screening".to_string(),
                cleared: true,
                remarks: Some("Resting ECG normal".to_string()),
            },
        ],
    }
}

/// Draft + ID proof, ready to submit.
pub(super) fn ready_candidate(
    service: &TestService,
    store: &MemoryStore,
    user: &UserId,
) -> ApplicationId {
    store.seed_candidate(user);
    let application = service
        .create_or_update_draft(user, draft_form())
        .expect("draft persists");
    service
        .upload_candidate_document(user, DocumentType::IdProof, id_proof_file())
        .expect("id proof uploads");
    application.id
}

/// [`ready_candidate`] with a caller-chosen identity.
pub(super) fn ready_named_candidate(
    service: &TestService,
    store: &MemoryStore,
    user: &UserId,
    full_name: &str,
) -> ApplicationId {
    store.seed_candidate(user);
    let form = named_draft_form(full_name, NaiveDate::from_ymd_opt(2004, 7, 2).expect("valid"));
    let application = service
        .create_or_update_draft(user, form)
        .expect("draft persists");
    service
        .upload_candidate_document(user, DocumentType::IdProof, id_proof_file())
        .expect("id proof uploads");
    application.id
}

/// Draft + ID proof + submit, returning the spawned trial.
pub(super) fn submitted_candidate(
    service: &TestService,
    store: &MemoryStore,
    user: &UserId,
) -> (ApplicationId, TrialId) {
    let application_id = ready_candidate(service, store, user);
    let (application, trial) = service.submit(user).expect("submission succeeds");
    assert_eq!(application.id, application_id);
    (application_id, trial.id)
}

pub(super) fn candidate(suffix: &str) -> UserId {
    UserId(format!("user-{suffix}"))
}

pub(super) fn coach(suffix: &str) -> UserId {
    UserId(format!("coach-{suffix}"))
}

pub(super) fn admin() -> UserId {
    UserId("admin-1".to_string())
}

pub(super) fn unique_name(prefix: &str) -> String {
    use std::sync::atomic::AtomicU64;
    static NAME_SEQUENCE: AtomicU64 = AtomicU64::new(1);
    let id = NAME_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix} {id}")
}

pub(super) fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}
