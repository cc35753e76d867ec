use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    ApplicationId, Document, DocumentId, DocumentOwner, DocumentType, UserId, VerificationStatus,
};
use super::intake::ValidationError;
use super::policy::RegistrationPolicy;
use super::repository::{
    emit_best_effort, Notification, NotificationEvent, Notifier, ObjectStore,
    RegistrationRepository, RepositoryError,
};
use super::service::RegistrationError;

/// Failures specific to document ownership.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("declared owner was not found")]
    OwnerNotFound,
    #[error("document does not belong to the requesting actor")]
    NotOwner,
}

/// Inbound file payload after transport decoding.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Admin verdict on a document; PENDING cannot be re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Verified,
    Rejected,
}

static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("DOC-{id:06}"))
}

/// Tracks evidentiary files per owner and their verification state.
pub struct DocumentRegistry<R, S, N> {
    store: Arc<R>,
    objects: Arc<S>,
    notifier: Arc<N>,
    policy: RegistrationPolicy,
}

impl<R, S, N> DocumentRegistry<R, S, N>
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
{
    pub(crate) fn new(
        store: Arc<R>,
        objects: Arc<S>,
        notifier: Arc<N>,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            store,
            objects,
            notifier,
            policy,
        }
    }

    /// Store the bytes with the external collaborator, then persist the
    /// metadata row. Upload auto-verifies under current policy; the manual
    /// review path can still overturn the verdict later.
    pub fn upload(
        &self,
        owner: DocumentOwner,
        document_type: DocumentType,
        file: FileUpload,
        uploaded_by: &UserId,
    ) -> Result<Document, RegistrationError> {
        self.ensure_owner_exists(&owner)?;

        let id = next_document_id();
        let storage_key = self.store_bytes(&owner, &id, &file)?;

        let document = Document {
            id,
            owner,
            document_type,
            storage_key,
            file_name: file.file_name,
            file_size: file.bytes.len() as u64,
            mime_type: file.mime_type,
            verification_status: VerificationStatus::Verified,
            verified_by: None,
            verified_at: Some(Utc::now()),
            rejection_reason: None,
            notes: None,
            uploaded_by: uploaded_by.clone(),
            uploaded_at: Utc::now(),
        };

        Ok(self.store.insert_document(document)?)
    }

    /// Record an admin verdict. Rejection requires a non-empty reason; the
    /// owner is notified either way.
    pub fn review(
        &self,
        id: &DocumentId,
        decision: ReviewDecision,
        reason: Option<String>,
        reviewed_by: &UserId,
    ) -> Result<Document, RegistrationError> {
        let mut document = self.store.document(id)?.ok_or(RepositoryError::NotFound)?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if decision == ReviewDecision::Rejected && reason.is_none() {
            return Err(ValidationError::ReasonRequired.into());
        }

        document.verification_status = match decision {
            ReviewDecision::Verified => VerificationStatus::Verified,
            ReviewDecision::Rejected => VerificationStatus::Rejected,
        };
        document.verified_by = Some(reviewed_by.clone());
        document.verified_at = Some(Utc::now());
        document.rejection_reason = match decision {
            ReviewDecision::Verified => None,
            ReviewDecision::Rejected => reason.clone(),
        };
        self.store.update_document(document.clone())?;

        if let Some(recipient) = self.owner_recipient(&document.owner)? {
            let mut details = BTreeMap::new();
            details.insert(
                "document_type".to_string(),
                document.document_type.label().to_string(),
            );
            if let Some(reason) = reason {
                details.insert("reason".to_string(), reason);
            }
            let event = match decision {
                ReviewDecision::Verified => NotificationEvent::DocumentVerified,
                ReviewDecision::Rejected => NotificationEvent::DocumentRejected,
            };
            emit_best_effort(
                self.notifier.as_ref(),
                Notification {
                    recipient,
                    event,
                    details,
                },
            );
        }

        Ok(document)
    }

    /// Documents for one owner, newest upload first.
    pub fn list_for_owner(
        &self,
        owner: &DocumentOwner,
    ) -> Result<Vec<Document>, RegistrationError> {
        Ok(self.store.documents_for_owner(owner)?)
    }

    /// Exchange the opaque storage key for a short-lived signed URL. The URL
    /// is minted fresh on every call and never cached server-side.
    pub fn resolve_read_url(&self, document: &Document) -> Result<String, RegistrationError> {
        Ok(self
            .objects
            .sign(&document.storage_key, self.policy.signed_url_ttl_secs)?)
    }

    /// Medical reports are 1:1 per application: overwrite the canonical row
    /// (the one the trial references, else the newest) and delete any other
    /// MEDICAL_REPORT_FOOTBALL documents for the same owner.
    pub fn replace_or_create_medical_report(
        &self,
        application_id: &ApplicationId,
        file: FileUpload,
        uploaded_by: &UserId,
    ) -> Result<Document, RegistrationError> {
        let application = self
            .store
            .application(application_id)?
            .ok_or(DocumentError::OwnerNotFound)?;
        let owner = DocumentOwner::Application(application.id.clone());

        let existing: Vec<Document> = self
            .store
            .documents_for_owner(&owner)?
            .into_iter()
            .filter(|document| document.document_type == DocumentType::MedicalReportFootball)
            .collect();

        let mut referenced = None;
        if let Some(trial_id) = &application.trial_id {
            if let Some(trial) = self.store.trial(trial_id)? {
                referenced = trial.medical_report_document;
            }
        }

        let canonical = existing
            .iter()
            .find(|document| Some(&document.id) == referenced.as_ref())
            .or_else(|| existing.first())
            .cloned();

        let document = match canonical {
            Some(mut document) => {
                document.storage_key = self.store_bytes(&owner, &document.id, &file)?;
                document.file_name = file.file_name;
                document.file_size = file.bytes.len() as u64;
                document.mime_type = file.mime_type;
                document.verification_status = VerificationStatus::Verified;
                document.verified_at = Some(Utc::now());
                document.uploaded_by = uploaded_by.clone();
                document.uploaded_at = Utc::now();
                self.store.update_document(document.clone())?;
                document
            }
            None => self.upload(
                owner.clone(),
                DocumentType::MedicalReportFootball,
                file,
                uploaded_by,
            )?,
        };

        for duplicate in existing {
            if duplicate.id != document.id {
                self.store.delete_document(&duplicate.id)?;
            }
        }

        Ok(document)
    }

    fn store_bytes(
        &self,
        owner: &DocumentOwner,
        id: &DocumentId,
        file: &FileUpload,
    ) -> Result<String, RegistrationError> {
        let key = format!(
            "registration/{}/{}/{}-{}",
            owner.kind_label().to_ascii_lowercase(),
            owner.key(),
            id.0,
            file.file_name
        );
        Ok(self.objects.put(&key, &file.bytes, &file.mime_type)?)
    }

    fn ensure_owner_exists(&self, owner: &DocumentOwner) -> Result<(), RegistrationError> {
        let exists = match owner {
            DocumentOwner::Application(id) => self.store.application(id)?.is_some(),
            DocumentOwner::Player(id) => self.store.player(id)?.is_some(),
            DocumentOwner::Coach(id) => self.store.coach_status(id)?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(DocumentError::OwnerNotFound.into())
        }
    }

    fn owner_recipient(&self, owner: &DocumentOwner) -> Result<Option<UserId>, RepositoryError> {
        Ok(match owner {
            DocumentOwner::Application(id) => self
                .store
                .application(id)?
                .map(|application| application.user_id),
            DocumentOwner::Player(id) => self.store.player(id)?.map(|player| player.user_id),
            DocumentOwner::Coach(id) => Some(id.clone()),
        })
    }
}
