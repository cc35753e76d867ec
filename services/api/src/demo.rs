use crate::infra::{
    InMemoryRegistrationStore, RecordingNotifier, SignedLocalObjectStore, StaticTeamDirectory,
};
use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;
use trialgate::error::AppError;
use trialgate::workflows::registration::{
    Actor, ActorRole, CoachStatus, DocumentType, DraftForm, FileUpload, MedicalCheckItem,
    MedicalChecklist, RegistrationPolicy, RegistrationService, TeamRef, TrialOutcome,
    TrialSchedule, UserId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Venue printed on the scheduled trial
    #[arg(long, default_value = "Balewadi Stadium, Pitch 2")]
    pub(crate) venue: String,
    /// Trial date (YYYY-MM-DD); unscheduled when omitted
    #[arg(long)]
    pub(crate) trial_date: Option<NaiveDate>,
    /// Stop after the trial evaluation, before the admin decision
    #[arg(long)]
    pub(crate) skip_approval: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        venue,
        trial_date,
        skip_approval,
    } = args;

    let store = Arc::new(InMemoryRegistrationStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let objects = Arc::new(SignedLocalObjectStore::new(
        b"trialgate-demo-secret",
        "https://files.trialgate.local",
    ));
    let service = RegistrationService::new(
        store.clone(),
        objects,
        notifier.clone(),
        Arc::new(StaticTeamDirectory::with_defaults()),
        RegistrationPolicy::default(),
    );

    let candidate = UserId("user-1001".to_string());
    let coach = UserId("coach-7".to_string());
    let admin = UserId("admin-1".to_string());
    store.seed_candidate(&candidate);
    store.seed_coach(&coach, CoachStatus::Active);

    println!("Registration lifecycle demo");

    let application = service
        .create_or_update_draft(&candidate, demo_draft())
        .map_err(AppError::from)?;
    println!(
        "- Draft {} created for {}",
        application.id.0, application.identity.full_name
    );

    let id_file = "aadhaar.pdf";
    let mime = mime_guess::from_path(id_file)
        .first_or_octet_stream()
        .to_string();
    let document = service
        .upload_candidate_document(
            &candidate,
            DocumentType::IdProof,
            FileUpload {
                bytes: b"demo-identity-scan".to_vec(),
                file_name: id_file.to_string(),
                mime_type: mime,
            },
        )
        .map_err(AppError::from)?;
    println!(
        "- Uploaded {} ({}) -> {}",
        document.file_name,
        document.document_type.label(),
        document.verification_status.label()
    );

    let (application, trial) = service.submit(&candidate).map_err(AppError::from)?;
    println!(
        "- Submitted -> application {} | trial {} {}",
        application.status.label(),
        trial.id.0,
        trial.status.label()
    );

    let trial = service
        .trials()
        .assign(
            &trial.id,
            &coach,
            TrialSchedule {
                date: trial_date,
                time: Some("07:30".to_string()),
                venue: Some(venue),
            },
        )
        .map_err(AppError::from)?;
    match trial.scheduled_date {
        Some(date) => println!(
            "- Assigned to {} for {} at {}",
            coach.0,
            date,
            trial.venue.as_deref().unwrap_or("TBD")
        ),
        None => println!(
            "- Assigned to {} at {} (date TBD)",
            coach.0,
            trial.venue.as_deref().unwrap_or("TBD")
        ),
    }

    let trial = service
        .trials()
        .submit_medical_form(
            &trial.id,
            &coach,
            demo_checklist(),
            true,
            Some(FileUpload {
                bytes: b"demo-medical-report".to_vec(),
                file_name: "medical.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
            }),
        )
        .map_err(AppError::from)?;
    println!(
        "- Medical form recorded (report document: {})",
        trial
            .medical_report_document
            .as_ref()
            .map(|id| id.0.as_str())
            .unwrap_or("none")
    );

    service
        .trials()
        .evaluate(
            &trial.id,
            &coach,
            TrialOutcome::Recommended,
            Some("Strong positioning, ready for the squad".to_string()),
            Some(true),
        )
        .map_err(AppError::from)?;
    println!("- Evaluated RECOMMENDED -> application moves to review");

    let queue = service.review_queue().map_err(AppError::from)?;
    for entry in &queue {
        println!(
            "- Review queue: {} ({}) flags {:?}",
            entry.application_id, entry.status, entry.risk_flags
        );
    }

    if skip_approval {
        println!("Stopping before the admin decision (--skip-approval)");
        return Ok(());
    }

    let player = service
        .approvals()
        .approve(&application.id, &admin)
        .map_err(AppError::from)?;
    println!(
        "- Approved -> player {} activated for {}",
        player.id.0, player.identity.full_name
    );

    let reviewer = Actor {
        id: admin,
        role: ActorRole::Admin,
    };
    let url = service
        .resolve_document_url(&reviewer, &document.id)
        .map_err(AppError::from)?;
    println!("- Evidence readable via signed URL: {url}");

    let snapshot = service.status(&candidate).map_err(AppError::from)?;
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("  Final status payload:\n{json}"),
        Err(err) => println!("  Status payload unavailable: {err}"),
    }

    println!("  Notifications dispatched:");
    for event in notifier.events() {
        println!("    - {} -> {}", event.event.label(), event.recipient.0);
    }

    Ok(())
}

fn demo_draft() -> DraftForm {
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
        player_phone: Some("+91 9876543210".to_string()),
        emergency_contact_name: Some("Rohan Mehta".to_string()),
        emergency_contact_phone: Some("9123456780".to_string()),
        preferred_teams: vec![TeamRef("T-100".to_string()), TeamRef("T-300".to_string())],
    }
}

fn demo_checklist() -> MedicalChecklist {
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
            MedicalCheckItem {
                label: "Vision".to_string(),
                cleared: true,
                remarks: None,
            },
        ],
    }
}
