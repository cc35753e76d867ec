use super::common::*;
use crate::workflows::registration::auth::Actor;
use crate::workflows::registration::documents::{DocumentError, ReviewDecision};
use crate::workflows::registration::domain::{
    ActorRole, ApplicationId, CoachStatus, DocumentId, DocumentOwner, DocumentType,
    VerificationStatus,
};
use crate::workflows::registration::intake::ValidationError;
use crate::workflows::registration::repository::{NotificationEvent, RegistrationRepository};
use crate::workflows::registration::service::{ErrorKind, RegistrationError};

#[test]
fn upload_requires_an_existing_owner() {
    let (service, _, _, _) = build_service();
    let owner = DocumentOwner::Application(ApplicationId("APP-does-not-exist".to_string()));

    match service
        .documents()
        .upload(owner, DocumentType::Photo, id_proof_file(), &admin())
    {
        Err(err @ RegistrationError::Document(DocumentError::OwnerNotFound)) => {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
        other => panic!("expected owner not found, got {other:?}"),
    }
}

#[test]
fn upload_stores_bytes_then_metadata_and_auto_verifies() {
    let (service, store, objects, _) = build_service();
    let user = candidate("upload");
    store.seed_candidate(&user);
    let application = service
        .create_or_update_draft(&user, draft_form())
        .expect("draft persists");

    let document = service
        .upload_candidate_document(&user, DocumentType::IdProof, id_proof_file())
        .expect("upload succeeds");

    assert_eq!(document.verification_status, VerificationStatus::Verified);
    assert_eq!(document.file_size, id_proof_file().bytes.len() as u64);
    assert_eq!(objects.object_count(), 1);

    let listed = service
        .documents()
        .list_for_owner(&DocumentOwner::Application(application.id))
        .expect("listing succeeds");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, document.id);
}

#[test]
fn listing_orders_newest_first() {
    let (service, store, _, _) = build_service();
    let user = candidate("ordering");
    store.seed_candidate(&user);
    let application = service
        .create_or_update_draft(&user, draft_form())
        .expect("draft persists");

    let first = service
        .upload_candidate_document(&user, DocumentType::IdProof, id_proof_file())
        .expect("first upload");
    let second = service
        .upload_candidate_document(&user, DocumentType::Photo, medical_report_file("photo"))
        .expect("second upload");

    let listed = service
        .documents()
        .list_for_owner(&DocumentOwner::Application(application.id))
        .expect("listing succeeds");
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
}

#[test]
fn rejection_review_requires_a_reason() {
    let (service, store, _, notifier) = build_service();
    let user = candidate("review");
    store.seed_candidate(&user);
    service
        .create_or_update_draft(&user, draft_form())
        .expect("draft persists");
    let document = service
        .upload_candidate_document(&user, DocumentType::DobProof, id_proof_file())
        .expect("upload succeeds");

    match service
        .documents()
        .review(&document.id, ReviewDecision::Rejected, None, &admin())
    {
        Err(RegistrationError::Validation(ValidationError::ReasonRequired)) => {}
        other => panic!("expected reason required, got {other:?}"),
    }
    match service.documents().review(
        &document.id,
        ReviewDecision::Rejected,
        Some("   ".to_string()),
        &admin(),
    ) {
        Err(RegistrationError::Validation(ValidationError::ReasonRequired)) => {}
        other => panic!("expected reason required for blank reason, got {other:?}"),
    }

    let reviewed = service
        .documents()
        .review(
            &document.id,
            ReviewDecision::Rejected,
            Some("Scan is unreadable".to_string()),
            &admin(),
        )
        .expect("review succeeds");
    assert_eq!(reviewed.verification_status, VerificationStatus::Rejected);
    assert_eq!(reviewed.rejection_reason.as_deref(), Some("Scan is unreadable"));
    assert_eq!(reviewed.verified_by, Some(admin()));

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, NotificationEvent::DocumentRejected);
    assert_eq!(events[0].recipient, user);
    assert_eq!(
        events[0].details.get("reason").map(String::as_str),
        Some("Scan is unreadable")
    );
}

#[test]
fn medical_report_replace_or_create_keeps_exactly_one() {
    let (service, store, _, _) = build_service();
    let user = candidate("medical");
    let (application_id, _) = submitted_candidate(&service, &store, &user);
    let coach_id = coach("medical");
    store.seed_coach(&coach_id, CoachStatus::Active);

    let first = service
        .documents()
        .replace_or_create_medical_report(&application_id, medical_report_file("v1"), &coach_id)
        .expect("first report stored");
    let second = service
        .documents()
        .replace_or_create_medical_report(&application_id, medical_report_file("v2"), &coach_id)
        .expect("second report replaces");

    assert_eq!(first.id, second.id, "canonical row is overwritten in place");
    assert_eq!(second.file_name, "medical-v2.pdf");

    let owner = DocumentOwner::Application(application_id);
    let reports: Vec<_> = service
        .documents()
        .list_for_owner(&owner)
        .expect("listing succeeds")
        .into_iter()
        .filter(|document| document.document_type == DocumentType::MedicalReportFootball)
        .collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn replace_or_create_prefers_the_trial_referenced_row_and_deletes_strays() {
    let (service, store, _, _) = build_service();
    let user = candidate("strays");
    let (application_id, trial_id) = submitted_candidate(&service, &store, &user);
    let coach_id = coach("strays");
    store.seed_coach(&coach_id, CoachStatus::Active);

    let referenced = service
        .trials()
        .upload_medical_report(&trial_id, &coach_id, medical_report_file("linked"))
        .expect("linked report stored")
        .medical_report_document
        .expect("trial references the report");

    // A stray duplicate snuck in outside the replace path.
    let mut stray = store
        .document(&referenced)
        .expect("lookup succeeds")
        .expect("document present");
    stray.id = DocumentId("DOC-stray".to_string());
    store.raw_insert_document(stray);

    let replaced = service
        .documents()
        .replace_or_create_medical_report(&application_id, medical_report_file("v3"), &coach_id)
        .expect("replace succeeds");
    assert_eq!(replaced.id, referenced, "trial-referenced row wins");

    let owner = DocumentOwner::Application(application_id);
    let reports: Vec<_> = service
        .documents()
        .list_for_owner(&owner)
        .expect("listing succeeds")
        .into_iter()
        .filter(|document| document.document_type == DocumentType::MedicalReportFootball)
        .collect();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, referenced);
}

#[test]
fn signed_urls_carry_the_policy_ttl() {
    let (service, store, _, _) = build_service();
    let user = candidate("signed-url");
    store.seed_candidate(&user);
    service
        .create_or_update_draft(&user, draft_form())
        .expect("draft persists");
    let document = service
        .upload_candidate_document(&user, DocumentType::IdProof, id_proof_file())
        .expect("upload succeeds");

    let reviewer = Actor {
        id: admin(),
        role: ActorRole::Admin,
    };
    let url = service
        .resolve_document_url(&reviewer, &document.id)
        .expect("admin resolves any document");
    assert!(url.contains("ttl=300"), "default TTL flows through: {url}");
}

#[test]
fn candidates_cannot_read_foreign_documents() {
    let (service, store, _, _) = build_service();
    let owner_user = candidate("doc-owner");
    let other_user = candidate("doc-other");
    ready_candidate(&service, &store, &owner_user);
    ready_named_candidate(&service, &store, &other_user, "Kiran Rao");

    let snapshot = service.status(&owner_user).expect("snapshot builds");
    let document_id = DocumentId(snapshot.documents[0].document_id.clone());

    let intruder = Actor {
        id: other_user,
        role: ActorRole::Candidate,
    };
    match service.resolve_document_url(&intruder, &document_id) {
        Err(err @ RegistrationError::Document(DocumentError::NotOwner)) => {
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
        other => panic!("expected not-owner rejection, got {other:?}"),
    }
}
