//! Athlete registration intake, trial, and approval lifecycle.
//!
//! Control flow: the intake guard produces a SUBMITTED application, which
//! spawns exactly one PENDING trial; the trial desk carries the evaluation
//! through assignment or first-writer claim; on a RECOMMENDED outcome the
//! approval engine may promote the application into a player record, inside
//! one atomic repository unit. The document registry gates approval and
//! feeds the read-side views in [`report`].

pub mod approval;
pub mod auth;
pub(crate) mod documents;
pub mod domain;
pub(crate) mod intake;
pub mod policy;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod trials;

#[cfg(test)]
mod tests;

pub use approval::{ApprovalEngine, ApprovalError};
pub use auth::{Actor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use documents::{DocumentError, DocumentRegistry, FileUpload, ReviewDecision};
pub use domain::{
    ActorRole, ApplicationId, ApplicationStatus, CandidateIdentity, CoachStatus, ContactDetails,
    Document, DocumentId, DocumentOwner, DocumentType, DraftForm, Location, MedicalCheckItem,
    MedicalChecklist, PhoneNumber, Pincode, Player, PlayerApplication, PlayerId, TeamRef, Trial,
    TrialId, TrialOutcome, TrialStatus, UserId, VerificationStatus,
};
pub use intake::{IntakeError, IntakeGuard, ValidationError};
pub use policy::{RegistrationPolicy, ResubmissionPolicy};
pub use report::{ReviewQueueEntryView, RiskFlag, StatusSnapshotView};
pub use repository::{
    Notification, NotificationEvent, Notifier, NotifyError, ObjectStore, RegistrationRepository,
    RepositoryError, StorageError, TeamDirectory,
};
pub use router::registration_router;
pub use service::{ErrorKind, RegistrationError, RegistrationService};
pub use trials::{TrialDesk, TrialError, TrialSchedule};
