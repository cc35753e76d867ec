use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier wrapper for the account that owns an application or acts on one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for a player application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for a trial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialId(pub String);

/// Identifier wrapper for an evidentiary document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Public identifier for an activated player, shaped `PLR-XXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

/// Opaque reference to a team roster; resolved to a display name read-side only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamRef(pub String);

/// Role attached to every authenticated call by the upstream identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Candidate,
    Coach,
    Admin,
    Player,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Candidate => "CANDIDATE",
            ActorRole::Coach => "COACH",
            ActorRole::Admin => "ADMIN",
            ActorRole::Player => "PLAYER",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CANDIDATE" => Some(ActorRole::Candidate),
            "COACH" => Some(ActorRole::Coach),
            "ADMIN" => Some(ActorRole::Admin),
            "PLAYER" => Some(ActorRole::Player),
            _ => None,
        }
    }
}

/// Whether a coach is currently eligible to run trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoachStatus {
    Active,
    Inactive,
}

/// Lifecycle states of a player application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Hold,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Hold => "HOLD",
        }
    }
}

/// Trial progression; COMPLETED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialStatus {
    Pending,
    Completed,
}

impl TrialStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TrialStatus::Pending => "PENDING",
            TrialStatus::Completed => "COMPLETED",
        }
    }
}

/// Coach verdict recorded when a trial completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialOutcome {
    Recommended,
    NotRecommended,
    NeedsRetest,
}

impl TrialOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            TrialOutcome::Recommended => "RECOMMENDED",
            TrialOutcome::NotRecommended => "NOT_RECOMMENDED",
            TrialOutcome::NeedsRetest => "NEEDS_RETEST",
        }
    }
}

/// Evidence categories accepted by the document registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    IdProof,
    IdCard,
    Photo,
    DobProof,
    AddressProof,
    MedicalReportFootball,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::IdProof => "ID_PROOF",
            DocumentType::IdCard => "ID_CARD",
            DocumentType::Photo => "PHOTO",
            DocumentType::DobProof => "DOB_PROOF",
            DocumentType::AddressProof => "ADDRESS_PROOF",
            DocumentType::MedicalReportFootball => "MEDICAL_REPORT_FOOTBALL",
        }
    }
}

/// Admin judgment on an individual document, independent of application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Rejected => "REJECTED",
        }
    }
}

/// Tagged owner of a document, so an invalid owner-type/id pairing cannot be
/// represented at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner_type", content = "owner_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentOwner {
    #[serde(rename = "PLAYER_APPLICATION")]
    Application(ApplicationId),
    Player(PlayerId),
    Coach(UserId),
}

impl DocumentOwner {
    pub fn kind_label(&self) -> &'static str {
        match self {
            DocumentOwner::Application(_) => "PLAYER_APPLICATION",
            DocumentOwner::Player(_) => "PLAYER",
            DocumentOwner::Coach(_) => "COACH",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            DocumentOwner::Application(id) => &id.0,
            DocumentOwner::Player(id) => &id.0,
            DocumentOwner::Coach(id) => &id.0,
        }
    }
}

/// Normalized 10-digit Indian mobile number (leading digit 6-9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Accepts optional `+91`/`91` prefixes and common separators.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
            .collect();
        let digits = compact.strip_prefix('+').unwrap_or(&compact);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let national = match digits.len() {
            10 => digits,
            12 if digits.starts_with("91") => &digits[2..],
            _ => return None,
        };

        match national.as_bytes().first() {
            Some(b'6'..=b'9') => Some(Self(national.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Six-digit Indian postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pincode(String);

impl Pincode {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity fields frozen into the application at submission and copied onto
/// the player record at approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub nationality: Option<String>,
    pub sport: Option<String>,
    pub position: Option<String>,
    pub dominant_side: Option<String>,
}

/// Candidate location; the pincode is optional until submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<Pincode>,
}

/// Contact block required from the first draft write onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub player_phone: PhoneNumber,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: PhoneNumber,
}

/// One application per user, owning the trial and document aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub identity: CandidateIdentity,
    pub location: Location,
    pub contact: ContactDetails,
    pub preferred_teams: Vec<TeamRef>,
    pub status: ApplicationStatus,
    pub trial_status: Option<TrialStatus>,
    pub trial_id: Option<TrialId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub resubmission_attempts: u32,
    pub last_resubmission_at: Option<DateTime<Utc>>,
}

/// The mandatory in-person evaluation gating approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: TrialId,
    pub application_id: ApplicationId,
    pub status: TrialStatus,
    pub assigned_coach: Option<UserId>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub venue: Option<String>,
    pub outcome: Option<TrialOutcome>,
    pub notes: Option<String>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub medical_checklist: Option<MedicalChecklist>,
    pub medical_verified: bool,
    pub medical_report_document: Option<DocumentId>,
    pub aadhaar_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Trial {
    pub fn is_completed(&self) -> bool {
        self.status == TrialStatus::Completed
    }
}

/// Structured medical screening captured by the coach during a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalChecklist {
    pub items: Vec<MedicalCheckItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalCheckItem {
    pub label: String,
    pub cleared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Evidentiary file metadata; the storage key never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner: DocumentOwner,
    pub document_type: DocumentType,
    pub storage_key: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub verification_status: VerificationStatus,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,
}

/// Materialized on first approval; a snapshot, never live-linked back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub user_id: UserId,
    pub identity: CandidateIdentity,
    pub contact: ContactDetails,
    pub preferred_teams: Vec<TeamRef>,
    pub profile_photo: Option<DocumentId>,
    pub source_application: ApplicationId,
    pub activated_by: UserId,
    pub activated_at: DateTime<Utc>,
}

/// Inbound draft payload; everything optional so partial drafts surface the
/// precise missing-field error instead of a serde failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftForm {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub dominant_side: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub player_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_team_refs")]
    pub preferred_teams: Vec<TeamRef>,
}

/// Decode a team list from the canonical JSON array or the legacy encodings
/// (JSON-in-string, comma-separated) still produced by older clients.
pub fn decode_team_list(raw: &str) -> Vec<TeamRef> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
            return normalize_team_refs(items);
        }
    }

    normalize_team_refs(trimmed.split(',').map(str::to_string).collect())
}

fn normalize_team_refs(items: Vec<String>) -> Vec<TeamRef> {
    let mut seen = std::collections::BTreeSet::new();
    let mut teams = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            teams.push(TeamRef(trimmed.to_string()));
        }
    }
    teams
}

fn deserialize_team_refs<'de, D>(deserializer: D) -> Result<Vec<TeamRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTeamList {
        List(Vec<String>),
        Encoded(String),
    }

    match Option::<RawTeamList>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(RawTeamList::List(items)) => Ok(normalize_team_refs(items)),
        Some(RawTeamList::Encoded(raw)) => Ok(decode_team_list(&raw)),
    }
}
