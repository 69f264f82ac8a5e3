mod config;
mod policy;
mod validation;

pub use config::EligibilityConfig;
pub use policy::{Eligibility, IneligibilityReason, SubmissionAcceptancePolicy};
pub use validation::{validate_draft, validate_link, ValidationError, MAX_ATTACHMENTS};
