use serde::{Deserialize, Serialize};

/// Operational dials for the registration lifecycle.
///
/// Defaults preserve the behavior of the system as shipped; the two review
/// dials (`require_document_evidence`, `allow_draft_rejection`) and the
/// resubmission policy exist so product can change course without a code
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPolicy {
    /// Youngest admissible candidate, inclusive.
    pub minimum_age_years: u8,
    /// Oldest admissible candidate, inclusive.
    pub maximum_age_years: u8,
    /// Lifetime of signed document read URLs.
    pub signed_url_ttl_secs: u32,
    /// When set, an application with zero uploaded documents fails the
    /// "all documents verified" approval gate instead of passing vacuously.
    pub require_document_evidence: bool,
    /// Whether admins may reject an application still in DRAFT.
    pub allow_draft_rejection: bool,
    /// What a REJECTED application may do next.
    pub resubmission: ResubmissionPolicy,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            minimum_age_years: 5,
            maximum_age_years: 100,
            signed_url_ttl_secs: 300,
            require_document_evidence: false,
            allow_draft_rejection: true,
            resubmission: ResubmissionPolicy::OneShot,
        }
    }
}

/// Post-rejection behavior for the owning candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResubmissionPolicy {
    /// A rejected application stays closed; registration is one-shot.
    OneShot,
    /// A rejected application reopens as a DRAFT on the next owner edit.
    ReopenToDraft,
}
